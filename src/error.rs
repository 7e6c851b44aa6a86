use thiserror::Error;

#[derive(Error, Debug)]
pub enum BanknoteError {
    #[error("Image loading error: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Gradient is empty (flat image), nothing to render")]
    EmptyGradient,

    #[error("Model not loaded: {0}")]
    ModelUnavailable(String),

    #[error("Model loading error: {0}")]
    ModelLoad(String),

    #[error("Invalid model output: {0}")]
    ModelOutput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BanknoteError>;
