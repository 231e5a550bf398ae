use std::fmt::{self, Display, Formatter};
use std::result;

/// Why an authentication attempt was rejected.
///
/// Every variant collapses to the same observable outcome (`401` plus a fresh
/// challenge); the distinction exists for logging and tests only.
#[derive(Debug, PartialEq)]
pub enum Error {
    /// No `Authorization` header (or no transmitted credentials) at all
    MissingCredentials,
    /// A required directive is absent from the header
    MissingRequired(&'static str, String),
    InvalidHeaderSyntax(String),
    /// The resolver has no secret for this account
    UnknownAccount(String),
    /// Basic: transmitted password differs from the stored secret
    PasswordMismatch,
    /// Digest: transmitted response differs from the computed hash
    HashMismatch,
}

pub type Result<T> = result::Result<T, Error>;

use Error::*;

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MissingCredentials => write!(f, "No credentials supplied"),
            MissingRequired(what, ctx) => write!(f, "Missing \"{}\" in header: {}", what, ctx),
            InvalidHeaderSyntax(ctx) => write!(f, "Invalid header syntax: {}", ctx),
            UnknownAccount(ctx) => write!(f, "No secret known for account: {}", ctx),
            PasswordMismatch => write!(f, "Password does not match"),
            HashMismatch => write!(f, "Response hash does not match"),
        }
    }
}

impl std::error::Error for Error {}
