use crate::api::ApiError;
use crate::config::ConfigError;
use crate::session::SessionError;
use crate::telemetry::InitError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("logging initialization failed: {0}")]
    Logging(#[from] InitError),
    #[error("a PIN is four digits")]
    InvalidPin,
    #[error("provide content with --text or a file path")]
    MissingContent,
}
