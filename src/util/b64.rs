//! Base64 text carried as bytes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use std::borrow::Cow;
use std::fmt::Display;

/// Bytes that hold a base64 string.
///
/// Transaction payloads cross the wire base64-encoded. This wrapper keeps
/// the encoded form as bytes, borrowing where it can, and converts at the
/// edges.
///
/// ```rust
/// use x402_solana_pay::util::Base64Bytes;
///
/// let encoded = Base64Bytes::encode(b"hello world");
/// assert_eq!(encoded.to_string(), "aGVsbG8gd29ybGQ=");
/// assert_eq!(encoded.decode().unwrap(), b"hello world");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes<'a>(pub Cow<'a, [u8]>);

impl Base64Bytes<'_> {
    /// Encodes raw binary data into base64 string bytes.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Base64Bytes<'static> {
        Base64Bytes(Cow::Owned(b64.encode(input.as_ref()).into_bytes()))
    }

    /// Decodes back to raw binary data. Fails on anything that is not
    /// well-formed standard base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        b64.decode(&self.0)
    }
}

impl AsRef<[u8]> for Base64Bytes<'_> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<'a> From<&'a [u8]> for Base64Bytes<'a> {
    fn from(slice: &'a [u8]) -> Self {
        Base64Bytes(Cow::Borrowed(slice))
    }
}

impl<'a> From<&'a str> for Base64Bytes<'a> {
    fn from(s: &'a str) -> Self {
        Base64Bytes(Cow::Borrowed(s.as_bytes()))
    }
}

impl Display for Base64Bytes<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.0.as_ref()))
    }
}
