use thiserror::Error;

#[derive(Error, Debug)]
pub enum MsgbackError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Remote store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Conversion error: {0}")]
    Convert(#[from] crate::convert::ConvertError),

    #[error("Batch aborted: {0}")]
    Batch(#[from] crate::saga::BatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MsgbackError>;
