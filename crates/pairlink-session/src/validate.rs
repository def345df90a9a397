//! Format checks for session ids and keys.
//!
//! The relay doesn't decide what a "good" session id looks like; the
//! client SDKs do. [`SessionValidator`] is the seam: the handler asks it
//! two yes/no questions and rejects the request if either answer is no.
//!
//! [`HexValidator`] is the grammar the reference clients use: a 16-byte
//! id and a 32-byte key, both as lowercase hex.

/// Decides whether a session id or key is well-formed.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because one validator is shared by every
/// connection the server handles.
///
/// # Example
///
/// ```rust
/// use pairlink_session::SessionValidator;
///
/// /// Accepts any non-empty string. Handy for local testing.
/// struct NonEmpty;
///
/// impl SessionValidator for NonEmpty {
///     fn is_valid_id(&self, id: &str) -> bool {
///         !id.is_empty()
///     }
///
///     fn is_valid_key(&self, key: &str) -> bool {
///         !key.is_empty()
///     }
/// }
///
/// assert!(NonEmpty.is_valid_id("S1"));
/// assert!(!NonEmpty.is_valid_key(""));
/// ```
pub trait SessionValidator: Send + Sync + 'static {
    /// Returns `true` if `id` is an acceptable session id.
    fn is_valid_id(&self, id: &str) -> bool;

    /// Returns `true` if `key` is an acceptable session key.
    fn is_valid_key(&self, key: &str) -> bool;
}

/// The default grammar: fixed-length lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexValidator {
    /// Required id length in hex characters.
    pub id_len: usize,
    /// Required key length in hex characters.
    pub key_len: usize,
}

impl HexValidator {
    /// 32 hex chars (16 bytes) for ids, 64 (32 bytes) for keys.
    pub const fn new() -> Self {
        Self {
            id_len: 32,
            key_len: 64,
        }
    }
}

impl Default for HexValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionValidator for HexValidator {
    fn is_valid_id(&self, id: &str) -> bool {
        is_lower_hex(id, self.id_len)
    }

    fn is_valid_key(&self, key: &str) -> bool {
        is_lower_hex(key, self.key_len)
    }
}

fn is_lower_hex(s: &str, len: usize) -> bool {
    s.len() == len
        && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
