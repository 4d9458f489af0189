#![forbid(unsafe_code)]

//! Cascade runtime — sessions on top of the propagation kernel.
//!
//! Adds caller-owned sessions, an append-only command log, replay,
//! snapshots and drift detection.
//!
//! No physiology lives here — every state transition and invariant
//! check is delegated to `cascade_engine`.

pub mod proto_types;
pub mod commands;
pub mod command_log;
pub mod replay;
pub mod snapshot;
pub mod snapshot_codec;
pub mod session;
pub mod drift;
