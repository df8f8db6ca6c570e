use thiserror::Error;
use std::result;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IR verification failed in `{function}`: {message}")]
    Verify { function: String, message: String },
    #[error("Generic error: {0}")]
    Generic(eyre::Report),
}

pub type Result<T> = result::Result<T, Error>;

impl Error {
    pub fn verify(function: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Verify {
            function: function.into(),
            message: message.into(),
        }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Error::Generic(eyre::Report::msg(message.into()))
    }
}

// Convert from eyre::Report to our Error type
impl From<eyre::Report> for Error {
    fn from(err: eyre::Report) -> Self {
        Error::Generic(err)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::generic(s)
    }
}
