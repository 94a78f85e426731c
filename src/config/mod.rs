pub mod toml_config;

pub use toml_config::{
    AgreementConfig, ApiConfig, DraftConfig, IntakeConfig, LogFormat, LoggingConfig, SearchConfig,
};
