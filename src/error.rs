use std::{io, result};

use thiserror::Error;

use crate::types::ObjectRef;

#[derive(Error, Debug)]
pub enum Error {
    /// Raised by the store when a transaction attempt observed stale state.
    /// `Store::run_transaction` consumes it and re-runs the attempt.
    #[error("transaction conflict, restart needed")]
    Conflict,

    #[error("corrupted record: {0}")]
    Corruption(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unknown object {0}")]
    UnknownObject(ObjectRef),

    #[error("transaction gave up after {0} attempts")]
    RetriesExhausted(usize),

    #[error("format error")]
    FormatError {
        #[from]
        source: io::Error,
    },
}

impl Error {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict)
    }
}

pub type Result<T> = result::Result<T, Error>;
