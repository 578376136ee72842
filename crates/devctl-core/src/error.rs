use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown pin action: {0}")]
    UnknownAction(String),

    #[error("Unknown status code: {0}")]
    UnknownStatus(u8),
}

pub type Result<T> = std::result::Result<T, Error>;
