//! Server-side HTTP authentication challenge/response handshakes for the
//! Basic and Digest schemes, as specified by IETF RFC 2617. This crate sits
//! in front of a request handler: it decides whether a request is
//! authenticated against a caller-supplied password lookup and, if not,
//! hands back the `WWW-Authenticate` value to send with a `401`.
//!
//! The crate never touches the transport. It consumes the request method and
//! the raw `Authorization` header, and produces an [`AuthOutcome`] — the
//! caller writes the status line and headers. There is no nonce registry and
//! no session state; every request is evaluated from scratch.
//!
//! # Examples
//!
//! Basic usage:
//!
//! ```
//! use www_auth::{DigestAuthenticator, HttpMethod};
//!
//! // The password lookup is yours: any `Fn(&str) -> Option<String>` works.
//! // Returning None (unknown account) is indistinguishable from a wrong
//! // password on the wire.
//! fn lookup(account: &str) -> Option<String> {
//!     if account == "foo" {
//!         Some("bar".to_string())
//!     } else {
//!         None
//!     }
//! }
//!
//! let auth = DigestAuthenticator::new("Secure Area");
//!
//! // The first request carries no Authorization header, so the client gets
//! // a 401 with a freshly generated nonce.
//! let outcome = auth.evaluate(HttpMethod::GET, None, &lookup);
//! assert!(!outcome.is_authenticated());
//! let challenge = outcome.challenge().unwrap();
//! assert_eq!(challenge.status(), 401);
//! assert!(challenge
//!     .to_string()
//!     .starts_with("Digest realm=\"Secure Area\",qop=\"auth\",nonce="));
//!
//! // The client answers the challenge with the RFC 2617 hash chain.
//! let answer = r#"Digest username="foo", realm="Secure Area",
//!     nonce="abcdef0123456789", uri="/index.html", qop=auth, nc=00000001,
//!     cnonce="0a4f113b", response="39cd0abc739d134f99f58a0ec66fb6c0",
//!     algorithm=MD5"#;
//!
//! let outcome = auth.evaluate(HttpMethod::GET, Some(answer), &lookup);
//! assert!(outcome.is_authenticated());
//! ```

mod basic;
mod digest;
mod enums;
mod error;
mod utils;

#[cfg(feature = "http")]
mod http;

pub use error::{Error, Result};

pub use crate::basic::{BasicAuthenticator, BasicChallenge};
pub use crate::digest::{
    expected_response, parse_header_map, AuthorizationHeader, DigestAuthenticator,
    DigestChallenge, NonceSource, RandomNonce,
};
pub use crate::enums::{AuthOutcome, Challenge, HttpMethod};
pub use crate::utils::QuoteForDigest;

/// Password-lookup capability supplied by the caller.
///
/// Maps an account identifier to its secret, or `None` for "unknown". The
/// authenticators never distinguish `None` from a wrong password in their
/// observable outcome. A resolver backed by fallible I/O should map its
/// failures to `None` at this boundary; retry and timeout policy belong to
/// the caller.
///
/// Any `Fn(&str) -> Option<String>` closure is a resolver.
pub trait CredentialResolver {
    fn resolve(&self, account: &str) -> Option<String>;
}

impl<F> CredentialResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, account: &str) -> Option<String> {
        self(account)
    }
}

/// Parse the `Authorization` header value of a Digest attempt.
/// It's just a convenience method to call [`AuthorizationHeader::parse()`](struct.AuthorizationHeader.html#method.parse).
pub fn parse(authorization: &str) -> Result<AuthorizationHeader> {
    AuthorizationHeader::parse(authorization)
}

#[test]
fn test_parse_and_reformat() {
    let src = r#"
    Digest
       username="hoge",
       realm="R",
       nonce="N",
       uri="/page",
       qop=auth,
       nc=00000001,
       cnonce="C",
       response="a08bfda1e5bbaa671af57fc186c53986"
    "#;

    let parsed = crate::parse(src).unwrap();
    assert_eq!(parsed.username, "hoge");
    assert_eq!(parsed.nc, "00000001");

    let reparsed = crate::parse(&parsed.to_string()).unwrap();
    assert_eq!(reparsed, parsed);
}
