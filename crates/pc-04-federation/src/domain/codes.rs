//! Sentinel result codes of the bridge's vote-driven calls.
//!
//! Callers outside the node depend on the exact values.

/// Call succeeded or the vote was recorded.
pub const SUCCESS: i32 = 1;

/// Federation change: no pending federation, or one already exists.
/// Whitelist: entry already exists or was not found.
/// Fee vote: fee not positive.
pub const NOT_FOUND: i32 = -1;

/// Federation change: pending federation incomplete, key already added,
/// or a retiring federation is still live.
/// Whitelist: invalid value or delay already set.
/// Fee vote: fee above the maximum.
pub const INCOMPLETE: i32 = -2;

/// Commit hash does not match the pending federation.
pub const HASH_MISMATCH: i32 = -3;

/// Caller not authorized, or any other failure.
pub const GENERIC_ERROR: i32 = -10;

// Registration votes reuse the sentinel values above under their own names.

/// Registration: transaction already processed.
pub const ALREADY_PROCESSED: i32 = NOT_FOUND;

/// Registration: not deep enough in the external chain yet.
pub const NOT_CONFIRMED: i32 = INCOMPLETE;

/// Registration: malformed branch, unknown block or merkle root mismatch.
pub const BAD_PROOF: i32 = HASH_MISMATCH;

/// Registration: unclassified transaction or any other refusal.
pub const REGISTRATION_REFUSED: i32 = GENERIC_ERROR;
