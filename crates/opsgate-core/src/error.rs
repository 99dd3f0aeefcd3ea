use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpsgateError {
    #[error("not_found")]
    RequestNotFound(String),

    #[error("already_completed")]
    AlreadyCompleted(String),

    #[error("pipeline not found: {0}")]
    PipelineNotFound(String),

    #[error("pipeline record {name} is unreadable: {reason}")]
    InvalidPipeline { name: String, reason: String },

    #[error("record is locked by another operation: {0}")]
    Locked(String),

    #[error("home directory not found: set HOME or OPSGATE_HOME")]
    HomeNotFound,

    #[error("invalid config value for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error(transparent)]
    Gateway(#[from] model_gateway::GatewayError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OpsgateError>;
