//! Config namespace: dispatcher config and YAML runtime settings.

mod dispatcher;
mod settings;

pub use dispatcher::DispatcherConfig;
pub use settings::{
    DiscoverySettings, DispatchSettings, MatcherSettings, RuntimeSettings, load_runtime_settings,
    load_runtime_settings_from_paths, runtime_settings_paths, set_config_home_override,
};
