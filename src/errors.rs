/// Failures while loading or saving `config.yaml`.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("config is malformed: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("invalid config: {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failures while loading a query description file.
#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("schema is malformed: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),
}
