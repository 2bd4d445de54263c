//! ID generation utilities.

/// Generate a short random ID (8 hex characters).
///
/// Used to mint per-requester consumer groups on the shared response
/// stream, so concurrent requesters never land in one group and
/// load-balance each other's responses away.
pub fn short_id() -> String {
    let bytes: [u8; 4] = rand::random();
    hex::encode(bytes)
}
