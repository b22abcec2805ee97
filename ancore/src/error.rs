use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse light profile '{file}': {source}")]
    ProfileParse {
        source: toml::de::Error,
        file: String,
    },

    #[error("Unknown light '{0}'")]
    UnknownLight(String),
}

pub type AnResult<T> = Result<T, AnError>;
