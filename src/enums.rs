use std::fmt;
use std::fmt::{Display, Formatter};

use crate::basic::BasicChallenge;
use crate::digest::DigestChallenge;

/// HTTP method of the request under evaluation (it enters the HA2 hash)
#[derive(Debug, Clone, Copy)]
pub enum HttpMethod<'a> {
    GET,
    POST,
    HEAD,
    OTHER(&'a str),
}

impl<'a> Default for HttpMethod<'a> {
    fn default() -> Self {
        HttpMethod::GET
    }
}

impl<'a> Display for HttpMethod<'a> {
    /// Convert to uppercase string
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OTHER(s) => s,
        })
    }
}

/// Challenge to send back on a failed attempt, one variant per scheme.
///
/// Formats to the `WWW-Authenticate` header value; the status line is always
/// `401 Unauthorized`.
#[derive(Debug, PartialEq, Clone)]
pub enum Challenge {
    Basic(BasicChallenge),
    Digest(DigestChallenge),
}

impl Challenge {
    /// Status code the challenge must be sent with
    pub fn status(&self) -> u16 {
        401
    }

    /// Protection-space realm presented to the client
    pub fn realm(&self) -> &str {
        match self {
            Challenge::Basic(c) => &c.realm,
            Challenge::Digest(c) => &c.realm,
        }
    }
}

impl Display for Challenge {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Challenge::Basic(c) => c.fmt(f),
            Challenge::Digest(c) => c.fmt(f),
        }
    }
}

/// Verdict of one evaluation pass.
///
/// There are no partial states: either the request is in, or the caller must
/// emit the contained challenge and a `401`.
#[derive(Debug, PartialEq)]
pub enum AuthOutcome {
    Authenticated,
    Unauthenticated(Challenge),
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated)
    }

    /// Challenge headers to attach to the response, present on failure only
    pub fn challenge(&self) -> Option<&Challenge> {
        match self {
            AuthOutcome::Authenticated => None,
            AuthOutcome::Unauthenticated(challenge) => Some(challenge),
        }
    }
}
