use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{0} is required")]
    InputRequired(&'static str),

    #[error("roll number not found in system")]
    StudentNotFound,

    #[error("invalid token")]
    TokenNotFound,

    #[error("roll number already exists")]
    DuplicateRollNumber,

    #[error("student already has an active lunch pass")]
    ActivePassExists {
        token: String,
        student_name: String,
    },

    #[error("token already used")]
    AlreadyRedeemed {
        student_name: String,
        used_at: DateTime<Utc>,
    },

    #[error("pass token collision")]
    TokenCollision,

    #[error("student already holds an unused pass")]
    ActivePassConflict,

    #[error("not found")]
    NotFound,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("token expired")]
    TokenExpired,

    #[error("qr encoding failed: {0}")]
    QrEncode(String),
}

impl Error {
    /// True for expected business-rule rejections that are returned to the
    /// caller for display rather than logged as system errors.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InputRequired(_)
                | Error::StudentNotFound
                | Error::TokenNotFound
                | Error::DuplicateRollNumber
                | Error::ActivePassExists { .. }
                | Error::AlreadyRedeemed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
