#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("http error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("i/o failure: {0}")]
    Io(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TransformError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type TransformResult<T> = Result<T, TransformError>;
