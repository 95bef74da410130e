//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("comms error: {0}")]
    Comms(String),

    #[error("window error: {0}")]
    Window(String),

    #[error("speech error: {0}")]
    Speech(String),

    #[error("history error: {0}")]
    History(String),
}
