/// Cascade kernel — Engine
///
/// Top-level orchestrator. Owns the rule set and configuration,
/// delegates mutation to transitions, validates via invariants.
///
/// The engine never holds a physiological state: callers pass one in
/// and receive an independent successor.

use tracing::{debug, info_span};

use crate::config::{ConfigError, EngineConfig};
use crate::domain::{OrganSystem, PhysiologicalState, PropagationRule, StepReport};
use crate::graph::{self, propagation_rules};
use crate::invariants::try_validate_invariants;
use crate::transitions::apply_step;

/// Propagation engine with the nine-edge rule set.
#[derive(Debug, Clone)]
pub struct PhysiologyEngine {
    rules: Vec<PropagationRule>,
    config: EngineConfig,
}

impl Default for PhysiologyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysiologyEngine {
    /// Engine with the default 0.5 h step.
    pub fn new() -> Self {
        Self {
            rules: propagation_rules(),
            config: EngineConfig::default(),
        }
    }

    /// Engine with a validated custom configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            rules: propagation_rules(),
            config,
        })
    }

    pub fn rules(&self) -> &[PropagationRule] {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn time_step(&self) -> f64 {
        self.config.time_step_hours
    }

    /// Enable or disable the rule `source → target`.
    /// Returns `false` if no such rule exists.
    pub fn set_rule_active(&mut self, source: OrganSystem, target: OrganSystem, active: bool) -> bool {
        match self.rules.iter_mut().find(|r| r.connects(source, target)) {
            Some(rule) => {
                rule.active = active;
                true
            }
            None => false,
        }
    }

    /// Advance one step. Panics if `state` or the result violates an invariant.
    pub fn step(&self, state: &PhysiologicalState) -> PhysiologicalState {
        self.step_with_report(state).0
    }

    /// Advance one step and summarise what changed.
    /// Panics if `state` or the result violates an invariant.
    pub fn step_with_report(&self, state: &PhysiologicalState) -> (PhysiologicalState, StepReport) {
        self.try_step_with_report(state)
            .unwrap_or_else(|msg| panic!("Invariant violation: {}", msg))
    }

    /// Non-panicking step. `Err` carries the first `[INVARIANT:...]` message
    /// for either the input or the stepped result.
    pub fn try_step_with_report(
        &self,
        state: &PhysiologicalState,
    ) -> Result<(PhysiologicalState, StepReport), String> {
        let _span = info_span!("step", from = state.timestamp).entered();

        try_validate_invariants(state)?;
        let (next, report) = apply_step(state, &self.rules, self.time_step());
        try_validate_invariants(&next)?;

        debug!(
            to = next.timestamp,
            severity_changes = report.severity_changes.len(),
            mechanisms = report.mechanisms_fired.len(),
            compensations = report.compensations_engaged.len(),
            events = report.events_recorded.len(),
            "Step applied"
        );
        Ok((next, report))
    }

    /// Apply `steps` transitions in sequence.
    pub fn run(&self, state: &PhysiologicalState, steps: usize) -> PhysiologicalState {
        let mut current = state.clone();
        for _ in 0..steps {
            current = self.step(&current);
        }
        current
    }

    /// Rules whose source organ is at severity ≥ 2. Pure.
    pub fn active_propagations(&self, state: &PhysiologicalState) -> Vec<PropagationRule> {
        graph::active_propagations(&self.rules, state)
    }

    /// Organs reachable from `origin` through active rules.
    pub fn downstream_cascade(&self, origin: OrganSystem) -> Vec<OrganSystem> {
        graph::downstream_cascade(&self.rules, origin)
    }

    /// Cycles among active rules.
    pub fn feedback_loops(&self) -> Vec<Vec<OrganSystem>> {
        graph::detect_feedback_loops(&self.rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_initial_state;

    #[test]
    fn toggling_a_rule() {
        let mut engine = PhysiologyEngine::new();
        assert!(engine.set_rule_active(OrganSystem::Heart, OrganSystem::Liver, false));
        assert!(!engine.rules()[8].active);
        assert!(!engine.set_rule_active(OrganSystem::Liver, OrganSystem::Heart, false));
        // Heart → Liver is the only way into the liver.
        assert!(!engine
            .downstream_cascade(OrganSystem::Heart)
            .contains(&OrganSystem::Liver));
    }

    #[test]
    fn custom_step_length() {
        let engine = PhysiologyEngine::with_config(EngineConfig { time_step_hours: 2.0 }).unwrap();
        assert_eq!(engine.step(&create_initial_state()).timestamp, 2.0);
        assert!(PhysiologyEngine::with_config(EngineConfig { time_step_hours: f64::NAN }).is_err());
    }

    #[test]
    fn run_applies_n_steps() {
        let engine = PhysiologyEngine::new();
        let s = engine.run(&create_initial_state(), 4);
        assert_eq!(s.timestamp, 2.0);
        assert_eq!(engine.run(&s, 0), s);
    }

    #[test]
    #[should_panic(expected = "Invariant violation")]
    fn invalid_input_panics() {
        let mut s = create_initial_state();
        s.organs.heart.parameters.map = f64::NAN;
        PhysiologyEngine::new().step(&s);
    }

    #[test]
    fn overflow_during_step_is_reported() {
        let mut s = crate::scenarios::Preset::CardiogenicShock.build();
        s.organs.kidneys.parameters.creatinine = f64::MAX;
        let err = PhysiologyEngine::new().try_step_with_report(&s).unwrap_err();
        assert!(err.contains("[INVARIANT:finite_parameters]"), "{}", err);
        assert!(err.contains("creatinine"), "{}", err);
    }

    #[test]
    fn feedback_loop_is_lungs_kidneys() {
        let loops = PhysiologyEngine::new().feedback_loops();
        assert_eq!(loops.len(), 1);
    }
}
