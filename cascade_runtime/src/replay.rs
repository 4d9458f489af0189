//! Replay orchestrator — rebuild state from a command sequence.
//!
//! Delegates all domain logic to the kernel. No shortcuts,
//! no cached state logic.

use cascade_engine::domain::PhysiologicalState;
use cascade_engine::engine::PhysiologyEngine;
use cascade_engine::hashing::canonical_hash;

use crate::commands::{CommandError, SessionCommand};

/// Rebuild a state from `initial` and `commands` with a default engine.
///
/// Returns `(final_state, canonical_hash)`. Deterministic by the
/// kernel's guarantee.
pub fn rebuild_state(
    initial: &PhysiologicalState,
    commands: &[SessionCommand],
) -> Result<(PhysiologicalState, String), CommandError> {
    let (state, _) = rebuild_with(PhysiologyEngine::new(), initial, commands)?;
    let hash = canonical_hash(&state);
    Ok((state, hash))
}

/// Rebuild starting from `engine`; returns the final state and the
/// engine with any rule toggles applied.
pub fn rebuild_with(
    mut engine: PhysiologyEngine,
    initial: &PhysiologicalState,
    commands: &[SessionCommand],
) -> Result<(PhysiologicalState, PhysiologyEngine), CommandError> {
    let mut state = initial.clone();
    for cmd in commands {
        state = cmd.apply(&mut engine, &state)?.state;
    }
    Ok((state, engine))
}

/// Rebuild and return only the canonical hash.
pub fn rebuild_hash(
    initial: &PhysiologicalState,
    commands: &[SessionCommand],
) -> Result<String, CommandError> {
    rebuild_state(initial, commands).map(|(_, hash)| hash)
}
