use std::fmt::{self, Display, Formatter};

use log::debug;

use crate::enums::{AuthOutcome, Challenge};
use crate::error::{Error, Result};
use crate::utils::QuoteForDigest;
use crate::CredentialResolver;

/// `WWW-Authenticate` challenge of the Basic scheme
#[derive(Debug, PartialEq, Clone)]
pub struct BasicChallenge {
    pub realm: String,
}

impl Display for BasicChallenge {
    /// Format to the `WWW-Authenticate` header value
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Basic realm=\"{}\"", self.realm.quote_for_digest())
    }
}

/// Server-side Basic authenticator for one protection space.
///
/// Basic is a clear-text comparison by design; keeping the transmitted
/// password confidential is the transport's job. The username and password
/// arrive here already base64-decoded by the platform.
#[derive(Debug, Clone)]
pub struct BasicAuthenticator {
    realm: String,
}

impl BasicAuthenticator {
    pub fn new<R: Into<String>>(realm: R) -> Self {
        BasicAuthenticator {
            realm: realm.into(),
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn challenge(&self) -> BasicChallenge {
        BasicChallenge {
            realm: self.realm.clone(),
        }
    }

    /// Check one attempt, reporting the exact failure stage.
    ///
    /// The distinction between a missing secret and a wrong password is for
    /// logging only; [`evaluate()`](#method.evaluate) collapses it.
    pub fn verify<R>(
        &self,
        username: Option<&str>,
        password: Option<&str>,
        resolver: &R,
    ) -> Result<()>
    where
        R: CredentialResolver + ?Sized,
    {
        let username = username.ok_or(Error::MissingCredentials)?;
        let password = password.ok_or(Error::MissingCredentials)?;

        let secret = resolver
            .resolve(username)
            .ok_or_else(|| Error::UnknownAccount(username.to_owned()))?;

        if secret == password {
            Ok(())
        } else {
            Err(Error::PasswordMismatch)
        }
    }

    /// Evaluate one request: `Authenticated`, or a `401` challenge.
    ///
    /// Unknown account and wrong password produce byte-identical challenges,
    /// so the client cannot enumerate accounts.
    pub fn evaluate<R>(
        &self,
        username: Option<&str>,
        password: Option<&str>,
        resolver: &R,
    ) -> AuthOutcome
    where
        R: CredentialResolver + ?Sized,
    {
        match self.verify(username, password, resolver) {
            Ok(()) => AuthOutcome::Authenticated,
            Err(err) => {
                debug!("basic authentication failed: {}", err);
                AuthOutcome::Unauthenticated(Challenge::Basic(self.challenge()))
            }
        }
    }
}
