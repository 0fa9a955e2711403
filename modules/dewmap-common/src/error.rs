use thiserror::Error;

#[derive(Error, Debug)]
pub enum DewmapError {
    #[error("Configuration error: {0}")]
    Config(String),
}
