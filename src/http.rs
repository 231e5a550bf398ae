//! Adapters for the `http` crate, behind the `http` feature.
//!
//! These keep the decide/emit split intact: evaluation still returns an
//! [`AuthOutcome`], and the challenge converts to typed header and response
//! values for the caller to send.

use http::header::{HeaderValue, InvalidHeaderValue, AUTHORIZATION, WWW_AUTHENTICATE};
use http::{Method, Request, Response, StatusCode};

use crate::digest::DigestAuthenticator;
use crate::enums::{AuthOutcome, Challenge, HttpMethod};
use crate::CredentialResolver;

fn method_of(method: &Method) -> HttpMethod<'_> {
    match method.as_str() {
        "GET" => HttpMethod::GET,
        "POST" => HttpMethod::POST,
        "HEAD" => HttpMethod::HEAD,
        other => HttpMethod::OTHER(other),
    }
}

impl DigestAuthenticator {
    /// Evaluate a request, reading the method and `Authorization` header
    /// from the typed request. A header that is not valid UTF-8 counts as
    /// absent.
    pub fn evaluate_request<B, R>(&self, request: &Request<B>, resolver: &R) -> AuthOutcome
    where
        R: CredentialResolver + ?Sized,
    {
        let authorization = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        self.evaluate(method_of(request.method()), authorization, resolver)
    }
}

impl Challenge {
    /// The challenge as a typed `WWW-Authenticate` value.
    ///
    /// Fails only if the realm contains bytes that are not legal in a header
    /// value.
    pub fn header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.to_string())
    }

    /// A complete `401 Unauthorized` response carrying the challenge
    pub fn to_response<B: Default>(&self) -> Result<Response<B>, http::Error> {
        Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header(WWW_AUTHENTICATE, self.to_string())
            .body(B::default())
    }
}
