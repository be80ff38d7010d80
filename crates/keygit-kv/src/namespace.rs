//! Repository key namespacing.
//!
//! A physical key is `repo || SEPARATOR || logical`. The separator is not
//! escaped: a logical key that itself contains `/` is kept literally, so a
//! repository id must never equal another id plus a path suffix that is also
//! a valid logical key. Ids produced by the HTTP router always have exactly
//! two components and cannot collide this way.

/// Byte placed between the repository id and the logical key.
pub const SEPARATOR: u8 = b'/';

/// Build the physical key for `logical` inside repository `repo`.
///
/// `format_key("/owner/repo", b"refs")` is `/owner/repo/refs`.
pub fn format_key(repo: &str, logical: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(repo.len() + 1 + logical.len());
    key.extend_from_slice(repo.as_bytes());
    key.push(SEPARATOR);
    key.extend_from_slice(logical);
    key
}

/// Remove the `repo || SEPARATOR` prefix from a physical key.
///
/// Keys that do not carry the prefix are returned unchanged; only call this
/// on keys obtained from a prefix scan under the same repository.
pub fn strip_key<'a>(repo: &str, physical: &'a [u8]) -> &'a [u8] {
    let repo = repo.as_bytes();
    match physical.strip_prefix(repo) {
        Some([sep, rest @ ..]) if *sep == SEPARATOR => rest,
        _ => physical,
    }
}
