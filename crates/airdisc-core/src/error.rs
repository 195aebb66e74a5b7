// ── Core error types ──
//
// "Not found" is never an error here: every lookup returns `Option`.
// What remains is store failure, passed through untouched, and values
// of the wrong shape sitting under a key the ledger owns.

use thiserror::Error;

use crate::store::StoreError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Store errors ─────────────────────────────────────────────────
    #[error(transparent)]
    Store(#[from] StoreError),

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Unexpected value under {key}: expected {expected}")]
    UnexpectedValue { key: String, expected: &'static str },
}
