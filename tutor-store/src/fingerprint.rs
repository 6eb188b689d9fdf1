//! Deterministic cache-key fingerprinting.
//!
//! Every code path that touches the response cache derives its key from
//! [`fingerprint`] — normalization drift between call sites would silently
//! poison the cache, so the normalization rules live in exactly one
//! function and carry a version that is hashed into the key. Bump
//! [`FINGERPRINT_VERSION`] when the rules change and old entries become
//! unreachable instead of wrong.

use sha2::{Digest, Sha256};

/// Version of the normalization rules, hashed into every fingerprint.
pub const FINGERPRINT_VERSION: u32 = 1;

/// Normalize question text: lowercase, trim, collapse internal whitespace.
///
/// ```
/// use tutor_store::normalize_question;
///
/// assert_eq!(
///     normalize_question("  What   is\ta CNN? "),
///     normalize_question("what is a cnn?"),
/// );
/// ```
pub fn normalize_question(question: &str) -> String {
    question.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Compute the cache fingerprint for a question.
///
/// Identical normalized questions with the same selected text and chapter
/// scope always map to the same fingerprint. Selected text is hashed
/// verbatim (it is an exact highlight, not free-form phrasing) and scope
/// participates only when present, so scoped and unscoped questions never
/// collide.
pub fn fingerprint(
    question: &str,
    selected_text: Option<&str>,
    chapter_scope: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_VERSION.to_be_bytes());
    hasher.update([0x1f]);
    hasher.update(normalize_question(question).as_bytes());
    if let Some(selected) = selected_text.filter(|s| !s.trim().is_empty()) {
        hasher.update([0x1f]);
        hasher.update(Sha256::digest(selected.as_bytes()));
    }
    if let Some(scope) = chapter_scope.filter(|s| !s.trim().is_empty()) {
        hasher.update([0x1f]);
        hasher.update(scope.as_bytes());
    }
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
