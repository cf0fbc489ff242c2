use thiserror::Error;

pub type Result<T> = std::result::Result<T, HandlerError>;

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Invalid handler configuration: {0}")]
    InvalidConfig(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Detector error: {0}")]
    Detector(#[from] topic_detector::DetectorError),
}
