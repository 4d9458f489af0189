//! Session command log — the authoritative record of a persistent session.
//!
//! File layout, repeated until EOF:
//!   [u32 LE length][ProtoCommandEnvelope]
//!
//! The log hands out sequence numbers itself (1, 2, 3, ...) and speaks
//! `SessionCommand` on both sides; protobuf never leaves this module and
//! `commands`.
//!
//! A frame cut short at the very end of the file is an interrupted
//! append. Opening the log drops it and truncates the file back to the
//! last whole frame. Damage anywhere else is reported as corruption.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use prost::Message;
use tracing::{debug, warn};

use crate::commands::{CommandError, SessionCommand};
use crate::proto_types::ProtoCommandEnvelope;

/// Frames above this size are treated as corruption.
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const LEN_PREFIX: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum CommandLogError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{}: corrupt frame at byte {}: {}", .path.display(), .offset, .reason)]
    Corrupt {
        path: PathBuf,
        offset: usize,
        reason: String,
    },

    #[error("command {sequence}: {source}")]
    Command {
        sequence: u64,
        #[source]
        source: CommandError,
    },
}

/// Append-only command log for one session.
#[derive(Debug)]
pub struct CommandLog {
    path: PathBuf,
    last_sequence: u64,
}

/// Whole frames found in a log file, and where the last one ends.
struct Scan {
    frames: Vec<ProtoCommandEnvelope>,
    intact_len: usize,
    file_len: usize,
}

impl CommandLog {
    /// Open or create the log at `path`, trimming an interrupted append.
    pub fn open(path: &Path) -> Result<Self, CommandLogError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let scan = scan(path)?;
        if scan.intact_len < scan.file_len {
            warn!(
                path = %path.display(),
                dropped_bytes = scan.file_len - scan.intact_len,
                "Dropping incomplete frame at end of command log"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(scan.intact_len as u64)?;
            file.sync_all()?;
        }

        let last_sequence = scan.frames.len() as u64;
        debug!(path = %path.display(), last_sequence, "Command log opened");

        Ok(Self {
            path: path.to_path_buf(),
            last_sequence,
        })
    }

    /// Write `command` as the next frame and fsync. Returns its sequence.
    pub fn append(&mut self, command: &SessionCommand) -> Result<u64, CommandLogError> {
        let sequence = self.last_sequence + 1;
        let body = command
            .to_proto(sequence)
            .map_err(|source| CommandLogError::Command { sequence, source })?
            .encode_to_vec();

        let mut frame = Vec::with_capacity(LEN_PREFIX + body.len());
        frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
        frame.extend_from_slice(&body);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&frame)?;
        file.sync_all()?;

        self.last_sequence = sequence;
        Ok(sequence)
    }

    /// Every logged command, in order.
    pub fn load_all(&self) -> Result<Vec<SessionCommand>, CommandLogError> {
        scan(&self.path)?
            .frames
            .iter()
            .map(|frame| {
                SessionCommand::from_proto(frame).map_err(|source| CommandLogError::Command {
                    sequence: frame.sequence,
                    source,
                })
            })
            .collect()
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn scan(path: &Path) -> Result<Scan, CommandLogError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    let corrupt = |offset: usize, reason: String| CommandLogError::Corrupt {
        path: path.to_path_buf(),
        offset,
        reason,
    };

    let mut frames: Vec<ProtoCommandEnvelope> = Vec::new();
    let mut offset = 0;
    while let Some(prefix) = bytes.get(offset..offset + LEN_PREFIX) {
        let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        if len == 0 || len > MAX_FRAME_LEN {
            return Err(corrupt(offset, format!("frame length {}", len)));
        }

        let body_start = offset + LEN_PREFIX;
        let Some(body) = bytes.get(body_start..body_start + len) else {
            break;
        };
        let frame =
            ProtoCommandEnvelope::decode(body).map_err(|e| corrupt(offset, e.to_string()))?;

        let expected = frames.len() as u64 + 1;
        if frame.sequence != expected {
            return Err(corrupt(
                offset,
                format!("sequence {} where {} was expected", frame.sequence, expected),
            ));
        }

        frames.push(frame);
        offset = body_start + len;
    }

    Ok(Scan {
        frames,
        intact_len: offset,
        file_len: bytes.len(),
    })
}
