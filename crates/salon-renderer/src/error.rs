use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Malformed optimizer settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
