use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("no generator update available")]
    NoUpdate,
    #[error("frame source disconnected")]
    Disconnected,
    #[error("device error: {0}")]
    Device(String),
}

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("depth sample {value} at pixel {index} is out of range")]
    DataRange { value: u16, index: usize },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

pub type Result<T, E = ViewerError> = std::result::Result<T, E>;
