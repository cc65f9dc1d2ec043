mod dispatch;
mod matching;

pub use dispatch::{DispatchApproach, DispatchPlan, DispatchResult, WireMessage};
pub use matching::{MatchMethod, MatchOutcome, MatchResult};
