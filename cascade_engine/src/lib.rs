#![forbid(unsafe_code)]

/// Engine v1. Any change to step behaviour bumps this and moves every hash.
pub const ENGINE_VERSION: u32 = 1;

pub mod arithmetic;
pub mod parameters;
pub mod domain;
pub mod events;
pub mod state;
pub mod scenarios;
pub mod graph;
pub mod mechanisms;
pub mod transitions;
pub mod invariants;
pub mod hashing;
pub mod config;
pub mod engine;
