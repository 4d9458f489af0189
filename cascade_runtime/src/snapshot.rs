//! Snapshot files — periodic session state checkpoints.
//!
//! A snapshot carries the codec JSON of the state plus its SHA-256, so a
//! file can be checked on its own. No wall-clock timestamps in content.
//!
//! If a snapshot hash doesn't match replay, the log wins.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cascade_engine::domain::PhysiologicalState;
use cascade_engine::ENGINE_VERSION;

use crate::snapshot_codec::{encode_snapshot, json_digest, restore_snapshot, SnapshotError};

/// Snapshot on-disk format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    /// Command sequence number after which this snapshot was taken.
    pub step: u64,
    /// Codec JSON of the state (UTF-8).
    pub state_json: String,
    /// SHA-256 of `state_json`.
    pub hash: String,
    /// Engine version at snapshot time.
    pub engine_version: u32,
}

impl Snapshot {
    pub fn capture(step: u64, state: &PhysiologicalState) -> Result<Self, SnapshotError> {
        let state_json = encode_snapshot(state)?;
        let hash = json_digest(&state_json);
        Ok(Self {
            step,
            state_json,
            hash,
            engine_version: ENGINE_VERSION,
        })
    }

    /// True if `hash` matches the JSON content.
    pub fn verify_hash(&self) -> bool {
        json_digest(&self.state_json) == self.hash
    }

    /// Decode and validate the stored state.
    pub fn state(&self) -> Result<PhysiologicalState, SnapshotError> {
        restore_snapshot(&self.state_json)
    }
}

fn snapshot_path(dir: &Path, step: u64) -> PathBuf {
    dir.join(format!("snapshot_{:06}.json", step))
}

/// Save a snapshot of `state` taken after command `step`.
pub fn save_snapshot(
    dir: &Path,
    step: u64,
    state: &PhysiologicalState,
) -> Result<PathBuf, SnapshotError> {
    fs::create_dir_all(dir)?;

    let snap = Snapshot::capture(step, state)?;
    let content =
        serde_json::to_string(&snap).map_err(|e| SnapshotError::Serialization(e.to_string()))?;

    let path = snapshot_path(dir, step);
    let mut file = File::create(&path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    Ok(path)
}

/// Load the snapshot taken at `step`. `None` if there is none.
pub fn load_snapshot(dir: &Path, step: u64) -> Result<Option<Snapshot>, SnapshotError> {
    let path = snapshot_path(dir, step);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)?;
    let snap: Snapshot = serde_json::from_str(&content)
        .map_err(|e| SnapshotError::Deserialization(format!("Bad snapshot: {}", e)))?;
    Ok(Some(snap))
}

/// Load the snapshot with the highest step in `dir`.
pub fn load_latest_snapshot(dir: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut best: Option<u64> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let step = name
            .to_string_lossy()
            .strip_prefix("snapshot_")
            .and_then(|s| s.strip_suffix(".json"))
            .and_then(|s| s.parse::<u64>().ok());
        if let Some(step) = step {
            best = Some(best.map_or(step, |b| b.max(step)));
        }
    }

    match best {
        Some(step) => load_snapshot(dir, step),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_engine::scenarios::Preset;

    fn snap_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("cascade_snapshot_tests")
            .join(name);
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn save_then_load_latest() {
        let dir = snap_dir("latest");
        save_snapshot(&dir, 5, &Preset::EarlySepsis.build()).unwrap();
        save_snapshot(&dir, 12, &Preset::AdvancedSepsis.build()).unwrap();
        save_snapshot(&dir, 9, &Preset::Normal.build()).unwrap();

        let latest = load_latest_snapshot(&dir).unwrap().unwrap();
        assert_eq!(latest.step, 12);
        assert_eq!(latest.engine_version, ENGINE_VERSION);
        assert!(latest.verify_hash());
        assert_eq!(latest.state().unwrap(), Preset::AdvancedSepsis.build());

        assert!(load_snapshot(&dir, 6).unwrap().is_none());
    }

    #[test]
    fn missing_dir_has_no_snapshot() {
        assert!(load_latest_snapshot(&snap_dir("absent")).unwrap().is_none());
    }

    #[test]
    fn tampered_content_fails_hash() {
        let mut snap = Snapshot::capture(1, &Preset::Normal.build()).unwrap();
        assert!(snap.verify_hash());
        snap.state_json = snap.state_json.replace("37.0", "39.0");
        assert!(!snap.verify_hash());
    }
}
