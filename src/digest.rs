use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use log::debug;
use rand::Rng;

use crate::enums::{AuthOutcome, Challenge, HttpMethod};
use crate::error::{Error, Result};
use crate::utils::{md5_hex, QuoteForDigest};
use crate::CredentialResolver;

//region header parsing

/// Parse the directive string of an `Authorization` header into a key-value
/// map.
///
/// Accepts `key="value"` and `key=value` pairs separated by commas. Keys run
/// from the first alphabetic character to the `=`; quoted values run to the
/// closing quote (no escape handling); unquoted values run to the next comma
/// or whitespace. Keys and values are trimmed, and the last occurrence of a
/// duplicate key wins.
pub fn parse_header_map(input: &str) -> Result<HashMap<String, String>> {
    #[derive(Debug)]
    enum ParserState {
        White,
        Name(usize),
        ValueBegin,
        ValueQuoted,
        ValuePlain,
    }

    let mut state = ParserState::White;

    let mut parsed = HashMap::<String, String>::new();
    let mut current_name = "";
    let mut current_value = String::new();

    for (byte_n, c) in input.char_indices() {
        match state {
            ParserState::White => {
                if c.is_alphabetic() {
                    state = ParserState::Name(byte_n);
                }
            }
            ParserState::Name(name_start) => {
                if c == '=' {
                    current_name = &input[name_start..byte_n];
                    state = ParserState::ValueBegin;
                }
            }
            ParserState::ValueBegin => {
                current_value.clear();
                state = match c {
                    '"' => ParserState::ValueQuoted,
                    _ => {
                        current_value.push(c);
                        ParserState::ValuePlain
                    }
                };
            }
            ParserState::ValueQuoted => {
                if c == '"' {
                    parsed.insert(
                        current_name.trim().to_string(),
                        current_value.trim().to_string(),
                    );
                    current_value.clear();
                    state = ParserState::White;
                } else {
                    current_value.push(c);
                }
            }
            ParserState::ValuePlain => {
                if c == ',' || c.is_ascii_whitespace() {
                    parsed.insert(
                        current_name.trim().to_string(),
                        current_value.trim().to_string(),
                    );
                    current_value.clear();
                    state = ParserState::White;
                } else {
                    current_value.push(c);
                }
            }
        }
    }

    match state {
        ParserState::ValuePlain => {
            parsed.insert(
                current_name.trim().to_string(),
                current_value.trim().to_string(),
            );
        }
        ParserState::White => {}
        _ => return Err(Error::InvalidHeaderSyntax(input.to_owned())),
    }

    Ok(parsed)
}

fn take_required(
    kv: &mut HashMap<String, String>,
    name: &'static str,
    ctx: &str,
) -> Result<String> {
    kv.remove(name)
        .ok_or_else(|| Error::MissingRequired(name, ctx.to_owned()))
}

/// `Authorization` header of the Digest scheme, parsed from the value a
/// client sent.
///
/// All directive values are kept verbatim — `nc` and `qop` included — because
/// the response hash must be recomputed over exactly the bytes the client
/// hashed.
#[derive(Debug, PartialEq, Clone)]
pub struct AuthorizationHeader {
    /// Account identifier to look up with the credential resolver
    pub username: String,
    /// Realm the client believes it is authenticating against
    pub realm: String,
    /// Server nonce echoed back by the client
    pub nonce: String,
    /// Requested URI as the client hashed it (no normalization applied)
    pub uri: String,
    /// Client-computed response hash, lowercase hex
    pub response: String,
    /// Quality of protection chosen by the client
    pub qop: String,
    /// Nonce use count, kept as the literal string from the wire
    pub nc: String,
    /// Client nonce
    pub cnonce: String,
    /// Server opaque token returned unchanged, if the client sent one
    pub opaque: Option<String>,
}

impl AuthorizationHeader {
    /// Construct from an `Authorization` header value.
    ///
    /// A leading `Digest` scheme token is tolerated and stripped.
    ///
    /// # Errors
    /// If the directive string is syntactically broken or any required
    /// directive (`username`, `realm`, `nonce`, `uri`, `response`, `qop`,
    /// `nc`, `cnonce`) is absent.
    pub fn parse(input: &str) -> Result<Self> {
        let mut input = input.trim();
        if input.starts_with("Digest") {
            input = &input["Digest".len()..];
        }

        let mut kv = parse_header_map(input)?;

        Ok(Self {
            username: take_required(&mut kv, "username", input)?,
            realm: take_required(&mut kv, "realm", input)?,
            nonce: take_required(&mut kv, "nonce", input)?,
            uri: take_required(&mut kv, "uri", input)?,
            response: take_required(&mut kv, "response", input)?,
            qop: take_required(&mut kv, "qop", input)?,
            nc: take_required(&mut kv, "nc", input)?,
            cnonce: take_required(&mut kv, "cnonce", input)?,
            opaque: kv.remove("opaque"),
        })
    }
}

impl FromStr for AuthorizationHeader {
    type Err = Error;

    /// Parse HTTP header
    fn from_str(input: &str) -> Result<Self> {
        Self::parse(input)
    }
}

impl Display for AuthorizationHeader {
    /// Format back to the wire form a client would send
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Digest ")?;

        write!(f, "username=\"{}\"", self.username.quote_for_digest())?;
        write!(f, ", realm=\"{}\"", self.realm.quote_for_digest())?;
        write!(f, ", nonce=\"{}\"", self.nonce.quote_for_digest())?;
        write!(f, ", uri=\"{}\"", self.uri)?;
        write!(
            f,
            ", qop={}, nc={}, cnonce=\"{}\"",
            self.qop,
            self.nc,
            self.cnonce.quote_for_digest()
        )?;
        write!(f, ", response=\"{}\"", self.response.quote_for_digest())?;

        if let Some(opaque) = &self.opaque {
            write!(f, ", opaque=\"{}\"", opaque.quote_for_digest())?;
        }

        write!(f, ", algorithm=MD5")
    }
}

//endregion

//region hash engine

/// Recompute the response hash the client must have produced, per RFC 2617.
///
/// `realm` is the server's effective realm and `secret` the resolved
/// password; everything else is taken verbatim from the parsed header. Each
/// segment joins with a literal colon, nothing is encoded or normalized.
pub fn expected_response(
    header: &AuthorizationHeader,
    realm: &str,
    method: &HttpMethod,
    secret: &str,
) -> String {
    let ha1 = md5_hex(&format!(
        "{name}:{realm}:{secret}",
        name = header.username,
        realm = realm,
        secret = secret
    ));
    let ha2 = md5_hex(&format!("{method}:{uri}", method = method, uri = header.uri));

    md5_hex(&format!(
        "{ha1}:{nonce}:{nc}:{cnonce}:{qop}:{ha2}",
        ha1 = ha1,
        nonce = header.nonce,
        nc = header.nc,
        cnonce = header.cnonce,
        qop = header.qop,
        ha2 = ha2
    ))
}

//endregion

//region challenge

/// Source of server nonces, injected so tests can make challenges
/// deterministic.
pub trait NonceSource {
    /// Produce one fresh token; consecutive calls must not collide
    fn generate(&self) -> String;
}

/// Default nonce source: 16 bytes from the thread RNG, hex-encoded
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNonce;

impl NonceSource for RandomNonce {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        let nonce_bytes: [u8; 16] = rng.gen();
        hex::encode(nonce_bytes)
    }
}

/// `WWW-Authenticate` challenge of the Digest scheme.
///
/// `opaque` is a deterministic hash of the realm — a correlation aid, not a
/// secret. Algorithm and qop are fixed on the wire (`MD5`, `auth`).
#[derive(Debug, PartialEq, Clone)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: String,
}

impl Display for DigestChallenge {
    /// Format to the `WWW-Authenticate` header value
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Digest realm=\"{}\",qop=\"auth\",nonce=\"{}\",opaque=\"{}\",algorithm=\"MD5\"",
            self.realm.quote_for_digest(),
            self.nonce.quote_for_digest(),
            self.opaque
        )
    }
}

//endregion

//region authenticator

/// Server-side Digest authenticator for one protection space.
///
/// Holds configuration only; each call to [`evaluate()`](#method.evaluate) is
/// an independent single pass over one request's headers. There is no nonce
/// registry: a previously issued nonce is never invalidated, so replayed
/// valid attempts keep authenticating.
pub struct DigestAuthenticator {
    realm: String,
    realm_suffix: Option<String>,
    nonce_source: Box<dyn NonceSource + Send + Sync>,
}

impl DigestAuthenticator {
    pub fn new<R: Into<String>>(realm: R) -> Self {
        DigestAuthenticator {
            realm: realm.into(),
            realm_suffix: None,
            nonce_source: Box::new(RandomNonce),
        }
    }

    /// Append a deployment-specific suffix to the realm, for multi-tenant
    /// setups where realm strings must not collide across processes.
    ///
    /// The suffixed realm is used for challenge emission, opaque derivation
    /// and the HA1 hash alike, so conforming clients keep working.
    pub fn with_realm_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.realm_suffix = Some(suffix.into());
        self
    }

    /// Replace the nonce source (tests inject a deterministic one)
    pub fn with_nonce_source<N>(mut self, source: N) -> Self
    where
        N: NonceSource + Send + Sync + 'static,
    {
        self.nonce_source = Box::new(source);
        self
    }

    /// The realm presented to clients, suffix included
    pub fn effective_realm(&self) -> String {
        match &self.realm_suffix {
            Some(suffix) => format!("{}-{}", self.realm, suffix),
            None => self.realm.clone(),
        }
    }

    /// Build a fresh challenge with a new nonce
    pub fn challenge(&self) -> DigestChallenge {
        let realm = self.effective_realm();
        DigestChallenge {
            nonce: self.nonce_source.generate(),
            opaque: md5_hex(&realm),
            realm,
        }
    }

    /// Check one attempt, reporting the exact failure stage.
    ///
    /// Walks parse → resolve → compute → compare and stops at the first
    /// failing stage. The caller must not surface the distinction to the
    /// client; [`evaluate()`](#method.evaluate) collapses it for you.
    pub fn verify<R>(
        &self,
        method: HttpMethod,
        authorization: Option<&str>,
        resolver: &R,
    ) -> Result<()>
    where
        R: CredentialResolver + ?Sized,
    {
        let raw = authorization.ok_or(Error::MissingCredentials)?;
        let header = AuthorizationHeader::parse(raw)?;

        let secret = resolver
            .resolve(&header.username)
            .ok_or_else(|| Error::UnknownAccount(header.username.clone()))?;

        let expected = expected_response(&header, &self.effective_realm(), &method, &secret);

        // hex digests are canonically lowercase, so exact equality is the
        // comparison the RFC asks for
        if expected == header.response {
            Ok(())
        } else {
            Err(Error::HashMismatch)
        }
    }

    /// Evaluate one request: `Authenticated`, or a `401` challenge.
    ///
    /// Every failure — absent header, malformed directives, unknown account,
    /// bad hash — yields the same freshly-nonced challenge, so the client
    /// cannot tell which stage rejected it.
    pub fn evaluate<R>(
        &self,
        method: HttpMethod,
        authorization: Option<&str>,
        resolver: &R,
    ) -> AuthOutcome
    where
        R: CredentialResolver + ?Sized,
    {
        match self.verify(method, authorization, resolver) {
            Ok(()) => AuthOutcome::Authenticated,
            Err(err) => {
                debug!("digest authentication failed: {}", err);
                AuthOutcome::Unauthenticated(Challenge::Digest(self.challenge()))
            }
        }
    }
}

impl fmt::Debug for DigestAuthenticator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestAuthenticator")
            .field("realm", &self.realm)
            .field("realm_suffix", &self.realm_suffix)
            .finish()
    }
}

//endregion

//region TESTS

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn lookup(account: &str) -> Option<String> {
        if account == "hoge" {
            Some("password".to_string())
        } else {
            None
        }
    }

    struct FixedNonce(&'static str);

    impl NonceSource for FixedNonce {
        fn generate(&self) -> String {
            self.0.to_string()
        }
    }

    /// Directive set matching the known MD5 chain for
    /// hoge / R / password / GET /page / N / 00000001 / C / auth
    fn sample_header() -> AuthorizationHeader {
        AuthorizationHeader {
            username: "hoge".to_string(),
            realm: "R".to_string(),
            nonce: "N".to_string(),
            uri: "/page".to_string(),
            response: "a08bfda1e5bbaa671af57fc186c53986".to_string(),
            qop: "auth".to_string(),
            nc: "00000001".to_string(),
            cnonce: "C".to_string(),
            opaque: None,
        }
    }

    #[test]
    fn test_parse_header_map() {
        {
            let src = r#"
               username="hoge",
               realm="R",
               uri=/page,
               qop=auth,
               nc=00000001,
               cnonce="C",
               response="a08bfda1e5bbaa671af57fc186c53986"
            "#;

            let map = parse_header_map(src).unwrap();

            assert_eq!(map.get("username").unwrap(), "hoge");
            assert_eq!(map.get("realm").unwrap(), "R");
            assert_eq!(map.get("uri").unwrap(), "/page");
            assert_eq!(map.get("qop").unwrap(), "auth");
            assert_eq!(map.get("nc").unwrap(), "00000001");
            assert_eq!(map.get("cnonce").unwrap(), "C");
            assert_eq!(
                map.get("response").unwrap(),
                "a08bfda1e5bbaa671af57fc186c53986"
            );
        }

        {
            let src = r#"realm="api@example.org""#;
            let map = parse_header_map(src).unwrap();
            assert_eq!(map.get("realm").unwrap(), "api@example.org");
        }

        {
            let src = r#"realm=api@example.org"#;
            let map = parse_header_map(src).unwrap();
            assert_eq!(map.get("realm").unwrap(), "api@example.org");
        }

        {
            let src = "";
            let map = parse_header_map(src).unwrap();
            assert_eq!(map.is_empty(), true);
        }
    }

    #[test]
    fn test_parse_header_map_duplicate_key_last_wins() {
        let map = parse_header_map(r#"nc=00000001, nc=00000002"#).unwrap();
        assert_eq!(map.get("nc").unwrap(), "00000002");
    }

    #[test]
    fn test_parse_header_map_trims_key_and_value() {
        let map = parse_header_map(r#"realm =" R ""#).unwrap();
        assert_eq!(map.get("realm").unwrap(), "R");
    }

    #[test]
    fn test_parse_header_map_unterminated_quote() {
        let err = parse_header_map(r#"realm="unterminated"#).unwrap_err();
        assert!(matches!(err, Error::InvalidHeaderSyntax(_)));
    }

    #[test]
    fn test_authorization_header_parse() {
        let src = r#"Digest username="hoge", realm="R", nonce="N", uri="/page",
            qop=auth, nc=00000001, cnonce="C",
            response="a08bfda1e5bbaa671af57fc186c53986", algorithm=MD5"#;

        let parsed = AuthorizationHeader::from_str(src).unwrap();
        assert_eq!(parsed, sample_header());
    }

    #[test]
    fn test_authorization_header_missing_directive() {
        // no response directive
        let src = r#"Digest username="hoge", realm="R", nonce="N", uri="/page",
            qop=auth, nc=00000001, cnonce="C""#;

        let err = AuthorizationHeader::parse(src).unwrap_err();
        assert!(matches!(err, Error::MissingRequired("response", _)));
    }

    #[test]
    fn test_authorization_header_display_round_trip() {
        let mut header = sample_header();
        header.opaque = Some("e1e1d3d40573127e9ee0480caf1283d6".to_string());

        let reparsed = AuthorizationHeader::parse(&header.to_string()).unwrap();
        assert_eq!(reparsed, header);
    }

    #[test]
    fn test_expected_response_known_vector() {
        let header = sample_header();

        // HA1 = md5("hoge:R:password")          = e24a0ea6db04be7910b74d71919e3176
        // HA2 = md5("GET:/page")                = 143425bfe9960b75eb8e96300dda74d8
        // md5("HA1:N:00000001:C:auth:HA2")      = a08bfda1e5bbaa671af57fc186c53986
        assert_eq!(
            expected_response(&header, "R", &HttpMethod::GET, "password"),
            "a08bfda1e5bbaa671af57fc186c53986"
        );
    }

    #[test]
    fn test_verify_rfc2617_reference() {
        // the example transaction from RFC 2617 section 3.5, replayed
        // against the verification path
        let header = AuthorizationHeader {
            username: "Mufasa".to_string(),
            realm: "testrealm@host.com".to_string(),
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".to_string(),
            uri: "/dir/index.html".to_string(),
            response: "6629fae49393a05397450978507c4ef1".to_string(),
            qop: "auth".to_string(),
            nc: "00000001".to_string(),
            cnonce: "0a4f113b".to_string(),
            opaque: Some("5ccc069c403ebaf9f0171e9517f40e41".to_string()),
        };

        let auth = DigestAuthenticator::new("testrealm@host.com");
        let resolver = |account: &str| -> Option<String> {
            if account == "Mufasa" {
                Some("Circle Of Life".to_string())
            } else {
                None
            }
        };

        assert_eq!(
            auth.verify(HttpMethod::GET, Some(&header.to_string()), &resolver),
            Ok(())
        );
    }

    #[test]
    fn test_round_trip_and_sensitivity() {
        let auth = DigestAuthenticator::new("R");

        let mut header = sample_header();
        header.response = expected_response(&header, "R", &HttpMethod::GET, "password");

        let outcome = auth.evaluate(HttpMethod::GET, Some(&header.to_string()), &lookup);
        assert!(outcome.is_authenticated());

        // the nonce count enters the hash chain: bumping it must invalidate
        // the transmitted response
        let mut tampered = header.clone();
        tampered.nc = "00000002".to_string();
        let outcome = auth.evaluate(HttpMethod::GET, Some(&tampered.to_string()), &lookup);
        assert!(!outcome.is_authenticated());

        // same for the client nonce
        let mut tampered = header.clone();
        tampered.cnonce = "D".to_string();
        assert_eq!(
            auth.verify(HttpMethod::GET, Some(&tampered.to_string()), &lookup),
            Err(Error::HashMismatch)
        );

        // and for the method
        assert_eq!(
            auth.verify(HttpMethod::POST, Some(&header.to_string()), &lookup),
            Err(Error::HashMismatch)
        );
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        // no nonce registry: the same valid attempt keeps authenticating
        let auth = DigestAuthenticator::new("R");
        let raw = sample_header().to_string();

        assert!(auth
            .evaluate(HttpMethod::GET, Some(&raw), &lookup)
            .is_authenticated());
        assert!(auth
            .evaluate(HttpMethod::GET, Some(&raw), &lookup)
            .is_authenticated());
    }

    #[test]
    fn test_missing_header_issues_challenge() {
        let auth = DigestAuthenticator::new("R").with_nonce_source(FixedNonce("N"));

        assert_eq!(
            auth.verify(HttpMethod::GET, None, &lookup),
            Err(Error::MissingCredentials)
        );

        let outcome = auth.evaluate(HttpMethod::GET, None, &lookup);
        let challenge = outcome.challenge().unwrap();
        assert_eq!(challenge.status(), 401);
        assert_eq!(
            challenge.to_string(),
            "Digest realm=\"R\",qop=\"auth\",nonce=\"N\",\
             opaque=\"e1e1d3d40573127e9ee0480caf1283d6\",algorithm=\"MD5\""
        );
    }

    #[test]
    fn test_malformed_header_issues_challenge() {
        let auth = DigestAuthenticator::new("R");

        // present but incomplete: no response directive
        let src = r#"Digest username="hoge", realm="R", nonce="N", uri="/page",
            qop=auth, nc=00000001, cnonce="C""#;

        let outcome = auth.evaluate(HttpMethod::GET, Some(src), &lookup);
        assert!(!outcome.is_authenticated());
        assert!(outcome.challenge().is_some());
    }

    #[test]
    fn test_unknown_account() {
        let auth = DigestAuthenticator::new("R");

        let mut header = sample_header();
        header.username = "nobody".to_string();
        header.response = expected_response(&header, "R", &HttpMethod::GET, "password");

        assert_eq!(
            auth.verify(HttpMethod::GET, Some(&header.to_string()), &lookup),
            Err(Error::UnknownAccount("nobody".to_string()))
        );
        assert!(!auth
            .evaluate(HttpMethod::GET, Some(&header.to_string()), &lookup)
            .is_authenticated());
    }

    #[test]
    fn test_realm_suffix_applies_to_both_paths() {
        let auth = DigestAuthenticator::new("R")
            .with_realm_suffix("42")
            .with_nonce_source(FixedNonce("N"));

        // challenge advertises the suffixed realm and derives opaque from it
        assert_eq!(
            auth.challenge().to_string(),
            "Digest realm=\"R-42\",qop=\"auth\",nonce=\"N\",\
             opaque=\"aec6a502c95f82f93c004142bbd40ca8\",algorithm=\"MD5\""
        );

        // a client hashing against the advertised realm authenticates
        let mut header = sample_header();
        header.realm = "R-42".to_string();
        header.response = "89cccf7944c79584049dac3a1c9465fe".to_string();
        assert_eq!(
            header.response,
            expected_response(&header, "R-42", &HttpMethod::GET, "password")
        );

        assert!(auth
            .evaluate(HttpMethod::GET, Some(&header.to_string()), &lookup)
            .is_authenticated());

        // while the unsuffixed chain no longer does
        let outcome = auth.evaluate(HttpMethod::GET, Some(&sample_header().to_string()), &lookup);
        assert!(!outcome.is_authenticated());
    }

    #[test]
    fn test_random_nonce_varies_per_challenge() {
        let auth = DigestAuthenticator::new("R");

        let first = auth.challenge();
        let second = auth.challenge();

        assert_eq!(first.nonce.len(), 32);
        assert_ne!(first.nonce, second.nonce);
        // opaque is a pure function of the realm and stays put
        assert_eq!(first.opaque, second.opaque);
    }
}

//endregion
