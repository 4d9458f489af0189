//! Drift detection — determinism verification and state comparison.

use cascade_engine::domain::{OrganSystem, PhysiologicalState, ShockType, TimelineEvent};
use cascade_engine::parameters::ParameterSet;

use crate::commands::SessionCommand;
use crate::replay;

/// Verify determinism by replaying the same commands twice and
/// asserting identical hashes. Panics on failure or if a command is rejected.
pub fn verify_determinism(initial: &PhysiologicalState, commands: &[SessionCommand]) {
    let run = || {
        replay::rebuild_hash(initial, commands)
            .unwrap_or_else(|e| panic!("Replay rejected a command: {}", e))
    };
    let hash1 = run();
    let hash2 = run();

    if hash1 != hash2 {
        panic!(
            "DETERMINISM FAILURE: two replays produced different hashes.\n\
             Run 1: {}\n\
             Run 2: {}",
            hash1, hash2
        );
    }
}

/// Before/after pair for one numeric value.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    pub a: f64,
    pub b: f64,
    pub delta: f64,
}

impl Delta {
    fn between(a: f64, b: f64) -> Self {
        Self { a, b, delta: b - a }
    }
}

/// Structured difference between two states, read as "a, then b".
#[derive(Debug, Clone, PartialEq)]
pub struct DriftReport {
    pub elapsed_hours: f64,
    /// One entry per modeled organ, lungs first.
    pub severity_deltas: Vec<(OrganSystem, Delta)>,
    /// Systemic parameters that differ, in declaration order.
    pub systemic_deltas: Vec<(&'static str, Delta)>,
    pub shock_type_a: ShockType,
    pub shock_type_b: ShockType,
    /// Timeline entries in `b` with no equal entry in `a`.
    pub new_timeline_entries: Vec<TimelineEvent>,
}

impl DriftReport {
    /// Organs whose severity moved.
    pub fn changed_organs(&self) -> Vec<OrganSystem> {
        self.severity_deltas
            .iter()
            .filter(|(_, d)| d.delta != 0.0)
            .map(|(o, _)| *o)
            .collect()
    }

    pub fn is_identical(&self) -> bool {
        self.elapsed_hours == 0.0
            && self.changed_organs().is_empty()
            && self.systemic_deltas.is_empty()
            && self.shock_type_a == self.shock_type_b
            && self.new_timeline_entries.is_empty()
    }
}

/// Structured state comparison.
pub fn compare_states(state_a: &PhysiologicalState, state_b: &PhysiologicalState) -> DriftReport {
    let severity_deltas = state_a
        .organs
        .iter()
        .zip(state_b.organs.iter())
        .map(|(a, b)| (a.id(), Delta::between(a.severity().value(), b.severity().value())))
        .collect();

    let systemic_deltas = state_a
        .systemic_parameters
        .values()
        .into_iter()
        .zip(state_b.systemic_parameters.values())
        .filter(|((_, a), (_, b))| a != b)
        .map(|((name, a), (_, b))| (name, Delta::between(a, b)))
        .collect();

    let new_timeline_entries = state_b
        .timeline
        .iter()
        .filter(|e| !state_a.timeline.contains(e))
        .cloned()
        .collect();

    DriftReport {
        elapsed_hours: state_b.timestamp - state_a.timestamp,
        severity_deltas,
        systemic_deltas,
        shock_type_a: state_a.shock_type,
        shock_type_b: state_b.shock_type,
        new_timeline_entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_engine::engine::PhysiologyEngine;
    use cascade_engine::scenarios::Preset;

    #[test]
    fn identical_states_have_no_drift() {
        let s = Preset::AdvancedSepsis.build();
        assert!(compare_states(&s, &s).is_identical());
    }

    #[test]
    fn stepping_shows_up_in_the_report() {
        let engine = PhysiologyEngine::new();
        let a = Preset::CardiogenicShock.build();
        let b = engine.run(&a, 4);
        let report = compare_states(&a, &b);

        assert_eq!(report.elapsed_hours, 2.0);
        assert!(report.changed_organs().contains(&OrganSystem::Kidneys));
        assert!(!report.changed_organs().contains(&OrganSystem::Heart));
        assert!(report.systemic_deltas.iter().any(|(name, d)| *name == "lactate" && d.delta > 0.0));
        assert!(!report.is_identical());
    }

    #[test]
    fn new_events_are_listed() {
        let engine = PhysiologyEngine::new();
        let mut a = Preset::Normal.build();
        a.organs.lungs.parameters.pa_o2 = 50.0;
        a.organs.lungs.severity = 2.0.into();
        let b = engine.step(&a);
        let report = compare_states(&a, &b);
        assert_eq!(report.new_timeline_entries.len(), 1);
        assert!(report.new_timeline_entries[0].event.contains("ARDS"));
    }

    #[test]
    fn replay_is_deterministic() {
        let commands = vec![
            SessionCommand::LoadPreset(Preset::EarlySepsis),
            SessionCommand::Step,
            SessionCommand::SetOrganParameter {
                organ: OrganSystem::Heart,
                parameter: "cardiac_index".to_string(),
                value: 1.8,
            },
            SessionCommand::Step,
            SessionCommand::Step,
        ];
        verify_determinism(&Preset::Normal.build(), &commands);
    }
}
