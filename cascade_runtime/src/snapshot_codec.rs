//! Snapshot Codec — deterministic PhysiologicalState encoder/decoder.
//!
//! Pure codec layer. No side-effects, no timestamps, no envelope.
//!
//! - `encode_snapshot`:  state → JSON string
//! - `decode_snapshot`:  JSON string → state (strict, unknown fields rejected)
//! - `restore_snapshot`: decode + invariant validation
//! - `export_snapshot_to_file` / `import_snapshot_from_file`: file I/O
//! - `snapshot_hash`:    SHA-256 of the JSON encoding (lowercase hex)

use std::fs;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use cascade_engine::domain::PhysiologicalState;
use cascade_engine::invariants::try_validate_invariants;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// All possible snapshot codec failures.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// JSON serialization failed.
    #[error("SerializationError: {0}")]
    Serialization(String),
    /// JSON deserialization failed (malformed, missing fields, unknown fields).
    #[error("DeserializationError: {0}")]
    Deserialization(String),
    /// Loaded state violates kernel invariants.
    #[error("InvariantViolation: {0}")]
    InvariantViolation(String),
    /// File I/O error.
    #[error("IoError: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Encode a state to a JSON string.
///
/// Field order follows declaration order; organs are a fixed record,
/// so identical states always produce identical bytes.
pub fn encode_snapshot(state: &PhysiologicalState) -> Result<String, SnapshotError> {
    serde_json::to_string(state).map_err(|e| SnapshotError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Decode a JSON string into a state.
///
/// Strict: `deny_unknown_fields` on all types rejects unexpected fields,
/// missing required fields fail. No invariant validation; use
/// `restore_snapshot` for validated loading.
pub fn decode_snapshot(json: &str) -> Result<PhysiologicalState, SnapshotError> {
    serde_json::from_str::<PhysiologicalState>(json)
        .map_err(|e| SnapshotError::Deserialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Restore (decode + validate)
// ---------------------------------------------------------------------------

/// Decode a JSON string and validate invariants immediately.
/// The safe entry point for loading state from untrusted sources.
pub fn restore_snapshot(json: &str) -> Result<PhysiologicalState, SnapshotError> {
    let state = decode_snapshot(json)?;
    try_validate_invariants(&state).map_err(SnapshotError::InvariantViolation)?;
    Ok(state)
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Export a state to a file. Creates parent directories if needed.
pub fn export_snapshot_to_file(
    state: &PhysiologicalState,
    path: &Path,
) -> Result<(), SnapshotError> {
    let json = encode_snapshot(state)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, json.as_bytes())?;
    Ok(())
}

/// Import a state from a JSON file, validating invariants.
pub fn import_snapshot_from_file(path: &Path) -> Result<PhysiologicalState, SnapshotError> {
    let content = fs::read_to_string(path)?;
    restore_snapshot(&content)
}

// ---------------------------------------------------------------------------
// Hash
// ---------------------------------------------------------------------------

/// SHA-256 of the JSON encoding. Lowercase hex string.
///
/// NOTE: This hashes the plain encoding, NOT the canonical hash from
/// `cascade_engine::hashing` (which binds `engine_version`). It verifies
/// that a snapshot file has not been altered.
pub fn snapshot_hash(state: &PhysiologicalState) -> Result<String, SnapshotError> {
    let json = encode_snapshot(state)?;
    Ok(json_digest(&json))
}

/// SHA-256 of already-encoded snapshot JSON. Lowercase hex string.
pub fn json_digest(json: &str) -> String {
    let digest = Sha256::digest(json.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
