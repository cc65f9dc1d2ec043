//! Capability-aware dispatch for self-describing actor processes.
//!
//! - **Matcher**: ordered strategies (exact action, domain pattern, lexical overlap)
//!   reduced to one handler by confidence, then declaration order.
//! - **Params**: free-text extraction by declared type, all-or-nothing validation.
//! - **Dispatch**: manifest resolution through the shared discovery cache, message
//!   construction, read/write routing under a timeout, uniform [`DispatchResult`].

mod config;
mod contracts;
mod dispatch;
mod matcher;
mod params;

pub use config::{
    DiscoverySettings, DispatchSettings, DispatcherConfig, MatcherSettings, RuntimeSettings,
    load_runtime_settings, load_runtime_settings_from_paths, runtime_settings_paths,
    set_config_home_override,
};
pub use contracts::{
    DispatchApproach, DispatchPlan, DispatchResult, MatchMethod, MatchOutcome, MatchResult,
    WireMessage,
};
pub use dispatch::{
    BODY_PARAMETER, DispatchError, DispatchRequest, Dispatcher, SelectedHandler, build_message,
    classify_operation, declared_operation, infer_operation, plan_dispatch,
};
pub use matcher::{
    Candidate, DEFAULT_MIN_CONFIDENCE, DomainPatternStrategy, ExactActionStrategy,
    HandlerMatcher, LexicalOverlapStrategy, MatchStrategy, Utterance, default_strategies,
};
pub use params::{ValidationError, ValidationReport, extract_parameters, validate_parameters};
