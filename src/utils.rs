use digest::Digest;
use md5::Md5;

/// slash quoting for digest strings
pub trait QuoteForDigest {
    fn quote_for_digest(&self) -> String;
}

impl QuoteForDigest for &str {
    fn quote_for_digest(&self) -> String {
        self.to_string().quote_for_digest()
    }
}

impl QuoteForDigest for String {
    fn quote_for_digest(&self) -> String {
        self.replace("\\", "\\\\").replace("\"", "\\\"")
    }
}

/// Lowercase hex MD5 of a string's bytes, the digest primitive for the whole
/// RFC 2617 chain and for the opaque derivation.
pub(crate) fn md5_hex(input: &str) -> String {
    let mut hash = Md5::new();
    hash.update(input.as_bytes());
    hex::encode(hash.finalize())
}
