use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("a {width}x{height} trail field is too large to allocate")]
    Resource { width: u32, height: u32 },
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Settings(#[from] config::ConfigError),
    #[error("{0}")]
    Image(#[from] image::ImageError),
}
