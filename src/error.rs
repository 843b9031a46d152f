use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Publisher(#[from] live_core::PublisherError),

    #[error(transparent)]
    AudioEncoder(#[from] live_core::AudioEncoderError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
