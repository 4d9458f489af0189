//! Session manager — caller-owned simulation context with optional persistence.
//!
//! A session holds the current state, the engine (rules + config), the
//! running flag and playback speed. Persistent sessions get their own
//! directory with a command log and snapshots:
//!
//!   <base_dir>/<session_id>/commands.log
//!   <base_dir>/<session_id>/snapshots/
//!
//! Apply-before-persist order:
//!   1. command applied to a copy of (engine, state)  — may fail
//!   2. command log append                            — only if step 1 succeeded
//!   3. copy committed as the session's engine and state
//!   4. snapshot if interval reached                  — failure is only logged
//!
//! The command log is authoritative. Snapshots are checkpoints that can be
//! checked against it; a missing or unwritable one never fails a command.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use cascade_engine::config::{ConfigError, EngineConfig};
use cascade_engine::domain::{OrganSystem, PhysiologicalState, PropagationRule, StepReport};
use cascade_engine::engine::PhysiologyEngine;
use cascade_engine::hashing::canonical_hash;
use cascade_engine::scenarios::Preset;
use cascade_engine::state::create_initial_state;

use crate::command_log::{CommandLog, CommandLogError};
use crate::commands::{CommandError, SessionCommand};
use crate::replay;
use crate::snapshot::{self, Snapshot};
use crate::snapshot_codec::SnapshotError;

pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 10.0;
pub const DEFAULT_SPEED: f64 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("command log: {0}")]
    Log(#[from] CommandLogError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("session {0} has no command log")]
    NotPersistent(String),
}

#[derive(Debug)]
struct Store {
    dir: PathBuf,
    log: CommandLog,
    snapshot_interval: u64,
}

impl Store {
    fn snapshot_dir(&self) -> PathBuf {
        self.dir.join("snapshots")
    }
}

/// An isolated simulation session.
#[derive(Debug)]
pub struct Session {
    session_id: String,
    engine: PhysiologyEngine,
    state: PhysiologicalState,
    running: bool,
    speed: f64,
    store: Option<Store>,
}

impl Session {
    /// In-memory session at the normal baseline.
    pub fn new(session_id: &str) -> Self {
        Self::with_engine(session_id, PhysiologyEngine::new())
    }

    pub fn with_engine(session_id: &str, engine: PhysiologyEngine) -> Self {
        Self {
            session_id: session_id.to_string(),
            engine,
            state: create_initial_state(),
            running: false,
            speed: DEFAULT_SPEED,
            store: None,
        }
    }

    /// Open or create a persistent session under `base_dir`, replaying any
    /// existing command log from the baseline.
    ///
    /// `snapshot_interval == 0` disables snapshots.
    pub fn open(
        base_dir: &Path,
        session_id: &str,
        snapshot_interval: u64,
    ) -> Result<Self, SessionError> {
        Self::open_with_config(base_dir, session_id, snapshot_interval, EngineConfig::default())
    }

    pub fn open_with_config(
        base_dir: &Path,
        session_id: &str,
        snapshot_interval: u64,
        config: EngineConfig,
    ) -> Result<Self, SessionError> {
        let dir = base_dir.join(session_id);
        let log = CommandLog::open(&dir.join("commands.log"))?;
        let commands = log.load_all()?;

        let initial = create_initial_state();
        let (state, engine) =
            replay::rebuild_with(PhysiologyEngine::with_config(config.clone())?, &initial, &commands)?;

        let store = Store {
            dir,
            log,
            snapshot_interval,
        };
        if let Err(e) = check_latest_snapshot(&store, &config, &initial, &commands) {
            warn!(session = session_id, error = %e, "Snapshot check failed; using the command log");
        }

        info!(
            session = session_id,
            commands = commands.len(),
            timestamp = state.timestamp,
            "Session opened"
        );

        Ok(Self {
            session_id: session_id.to_string(),
            engine,
            state,
            running: false,
            speed: DEFAULT_SPEED,
            store: Some(store),
        })
    }

    /// Apply, log, commit, then checkpoint. If applying or logging fails
    /// the session is unchanged.
    fn execute(&mut self, command: SessionCommand) -> Result<Option<StepReport>, SessionError> {
        let mut engine = self.engine.clone();
        let applied = command.apply(&mut engine, &self.state)?;

        let sequence = match self.store.as_mut() {
            Some(store) => Some(store.log.append(&command)?),
            None => None,
        };

        self.engine = engine;
        self.state = applied.state;

        if let (Some(store), Some(sequence)) = (self.store.as_ref(), sequence) {
            if store.snapshot_interval > 0 && sequence % store.snapshot_interval == 0 {
                match snapshot::save_snapshot(&store.snapshot_dir(), sequence, &self.state) {
                    Ok(path) => {
                        debug!(session = %self.session_id, sequence, path = %path.display(), "Snapshot saved")
                    }
                    Err(e) => {
                        warn!(session = %self.session_id, sequence, error = %e, "Snapshot not written")
                    }
                }
            }
        }
        Ok(applied.report)
    }

    /// Advance one step regardless of the running flag.
    pub fn step(&mut self) -> Result<StepReport, SessionError> {
        let report = self.execute(SessionCommand::Step)?;
        Ok(report.unwrap_or_else(|| StepReport {
            timestamp: self.state.timestamp,
            ..Default::default()
        }))
    }

    /// One playback tick: steps only while running.
    pub fn tick(&mut self) -> Result<Option<StepReport>, SessionError> {
        if !self.running {
            return Ok(None);
        }
        self.step().map(Some)
    }

    pub fn load_preset(&mut self, preset: Preset) -> Result<(), SessionError> {
        self.execute(SessionCommand::LoadPreset(preset))?;
        self.running = false;
        info!(session = %self.session_id, preset = preset.as_str(), "Preset loaded");
        Ok(())
    }

    /// Replace the current state with a caller-built one. Rejected if it
    /// breaks an invariant.
    pub fn load_state(&mut self, state: PhysiologicalState) -> Result<(), SessionError> {
        self.execute(SessionCommand::LoadState(Box::new(state)))?;
        self.running = false;
        Ok(())
    }

    /// Back to the normal baseline, paused.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.execute(SessionCommand::Reset)?;
        self.running = false;
        Ok(())
    }

    pub fn update_organ_parameter(
        &mut self,
        organ: OrganSystem,
        parameter: &str,
        value: f64,
    ) -> Result<(), SessionError> {
        self.execute(SessionCommand::SetOrganParameter {
            organ,
            parameter: parameter.to_string(),
            value,
        })?;
        Ok(())
    }

    pub fn update_systemic_parameter(&mut self, parameter: &str, value: f64) -> Result<(), SessionError> {
        self.execute(SessionCommand::SetSystemicParameter {
            parameter: parameter.to_string(),
            value,
        })?;
        Ok(())
    }

    pub fn set_rule_active(
        &mut self,
        source: OrganSystem,
        target: OrganSystem,
        active: bool,
    ) -> Result<(), SessionError> {
        self.execute(SessionCommand::SetRuleActive {
            source,
            target,
            active,
        })?;
        Ok(())
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Clamped to [`MIN_SPEED`, `MAX_SPEED`]. Non-finite input is ignored.
    pub fn set_speed(&mut self, speed: f64) {
        if !speed.is_finite() {
            warn!(session = %self.session_id, speed, "Ignoring non-finite speed");
            return;
        }
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Wall-clock delay between ticks at the current speed.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.speed)
    }

    pub fn active_propagations(&self) -> Vec<PropagationRule> {
        self.engine.active_propagations(&self.state)
    }

    /// Independent in-memory copy of this session, paused, for what-if
    /// exploration. Nothing done to the branch reaches this session's log.
    pub fn branch(&self, session_id: &str) -> Session {
        Session {
            session_id: session_id.to_string(),
            engine: self.engine.clone(),
            state: self.state.clone(),
            running: false,
            speed: self.speed,
            store: None,
        }
    }

    /// Rebuild from the command log and replace the in-memory state.
    /// Returns the rebuilt state's canonical hash.
    pub fn replay_full(&mut self) -> Result<String, SessionError> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| SessionError::NotPersistent(self.session_id.clone()))?;
        let commands = store.log.load_all()?;

        let engine = PhysiologyEngine::with_config(self.engine.config().clone())?;
        let (state, engine) = replay::rebuild_with(engine, &create_initial_state(), &commands)?;
        self.engine = engine;
        self.state = state;
        Ok(self.current_hash())
    }

    pub fn state(&self) -> &PhysiologicalState {
        &self.state
    }

    pub fn engine(&self) -> &PhysiologyEngine {
        &self.engine
    }

    pub fn current_hash(&self) -> String {
        canonical_hash(&self.state)
    }

    /// Last logged command sequence; 0 for in-memory sessions.
    pub fn sequence(&self) -> u64 {
        self.store.as_ref().map_or(0, |s| s.log.last_sequence())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }
}

/// Compare the newest snapshot against a replay of the log prefix it
/// covers. A mismatch is logged; the log wins.
fn check_latest_snapshot(
    store: &Store,
    config: &EngineConfig,
    initial: &PhysiologicalState,
    commands: &[SessionCommand],
) -> Result<(), SessionError> {
    let Some(snap) = snapshot::load_latest_snapshot(&store.snapshot_dir())? else {
        return Ok(());
    };

    let covered = usize::try_from(snap.step).unwrap_or(usize::MAX);
    if covered > commands.len() {
        warn!(step = snap.step, logged = commands.len(), "Snapshot is ahead of the command log");
        return Ok(());
    }

    let engine = PhysiologyEngine::with_config(config.clone())?;
    let (state, _) = replay::rebuild_with(engine, initial, &commands[..covered])?;
    let expected = Snapshot::capture(snap.step, &state)?;

    if !snap.verify_hash() || snap.hash != expected.hash {
        warn!(
            step = snap.step,
            stored = %snap.hash,
            replayed = %expected.hash,
            "Snapshot does not match replay"
        );
    } else {
        debug!(step = snap.step, "Snapshot matches replay");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_is_clamped() {
        let mut s = Session::new("speed");
        assert_eq!(s.speed(), DEFAULT_SPEED);
        s.set_speed(50.0);
        assert_eq!(s.speed(), MAX_SPEED);
        s.set_speed(0.0);
        assert_eq!(s.speed(), MIN_SPEED);
        s.set_speed(f64::NAN);
        assert_eq!(s.speed(), MIN_SPEED);
        s.set_speed(2.0);
        assert_eq!(s.tick_interval(), Duration::from_millis(500));
    }

    #[test]
    fn tick_only_steps_while_running() {
        let mut s = Session::new("tick");
        assert!(s.tick().unwrap().is_none());
        assert_eq!(s.state().timestamp, 0.0);

        s.set_running(true);
        let report = s.tick().unwrap().unwrap();
        assert_eq!(report.timestamp, 0.5);
        assert_eq!(s.state().timestamp, 0.5);
    }

    #[test]
    fn loading_pauses_playback() {
        let mut s = Session::new("pause");
        s.set_running(true);
        s.load_preset(Preset::AdvancedSepsis).unwrap();
        assert!(!s.is_running());
        assert_eq!(s.state(), &Preset::AdvancedSepsis.build());

        s.set_running(true);
        s.reset().unwrap();
        assert!(!s.is_running());
        assert_eq!(s.state(), &create_initial_state());
    }

    #[test]
    fn rejected_override_leaves_state_alone() {
        let mut s = Session::new("reject");
        let before = s.current_hash();
        assert!(s.update_systemic_parameter("lactate", f64::INFINITY).is_err());
        assert!(s.update_organ_parameter(OrganSystem::Liver, "nope", 1.0).is_err());
        assert_eq!(s.current_hash(), before);
    }

    #[test]
    fn in_memory_session_cannot_replay() {
        let mut s = Session::new("mem");
        assert!(!s.is_persistent());
        assert_eq!(s.sequence(), 0);
        assert!(matches!(s.replay_full(), Err(SessionError::NotPersistent(_))));
    }
}
