use std::{error::Error, fmt};

use model::pharmacy::ValidationError;

pub mod admin;
pub mod auth;
pub mod client;
pub mod database;
pub mod listing;

#[derive(Debug)]
pub enum RequestError {
    NotFound,
    Invalid(ValidationError),
    Other(Box<dyn Error + Send + Sync>),
}

impl RequestError {
    pub fn other<T: Error + Send + Sync + 'static>(why: T) -> Self {
        Self::Other(Box::new(why))
    }
}

impl Error for RequestError {}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "the requested pharmacy does not exist"),
            Self::Invalid(why) => write!(f, "invalid pharmacy: {}", why),
            Self::Other(why) => write!(f, "{}", why),
        }
    }
}

impl From<database::DatabaseError> for RequestError {
    fn from(value: database::DatabaseError) -> Self {
        match value {
            database::DatabaseError::NotFound => Self::NotFound,
            database::DatabaseError::Other(why) => Self::Other(why),
        }
    }
}

impl From<ValidationError> for RequestError {
    fn from(value: ValidationError) -> Self {
        Self::Invalid(value)
    }
}

pub type RequestResult<O> = Result<O, RequestError>;
