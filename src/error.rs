use std::result;

use thiserror::Error;

use crate::env;

#[derive(Error, Debug)]
pub enum Error {
    #[error("key already exists")]
    AlreadyExist,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error")]
    IOError {
        #[from]
        source: env::IoError,
    },
}

pub type Result<T> = result::Result<T, Error>;
