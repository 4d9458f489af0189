/// Cascade kernel — Invariant Checks
///
/// Hard-fail validation of a `PhysiologicalState`.
/// `validate_invariants` panics on the first failure; `try_validate_invariants`
/// reports it instead so loaders can reject bad input without aborting.
///
/// Timeline entries may be dated after the state's own timestamp, but
/// must be non-decreasing among themselves.

use crate::domain::{OrganSystem, PhysiologicalState};
use crate::parameters::ParameterSet;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run all checks. Panics on the first failure.
pub fn validate_invariants(state: &PhysiologicalState) {
    if let Err(msg) = try_validate_invariants(state) {
        panic!("Invariant violation: {}", msg);
    }
}

/// Non-panicking variant of `validate_invariants`.
/// Returns `Err(message)` on the first failure, `Ok(())` if all pass.
pub fn try_validate_invariants(state: &PhysiologicalState) -> Result<(), String> {
    check_timestamp(state)?;
    check_organ_ids(state)?;
    check_severity_range(state)?;
    check_finite_parameters(state)?;
    check_timeline(state)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

fn check_timestamp(state: &PhysiologicalState) -> Result<(), String> {
    if !state.timestamp.is_finite() || state.timestamp < 0.0 {
        return Err(format!(
            "[INVARIANT:timestamp] Timestamp {} must be finite and non-negative",
            state.timestamp
        ));
    }
    Ok(())
}

/// Each slot must hold the organ it is named for.
fn check_organ_ids(state: &PhysiologicalState) -> Result<(), String> {
    for (expected, organ) in OrganSystem::MODELED.iter().zip(state.organs.iter()) {
        if organ.id() != *expected {
            return Err(format!(
                "[INVARIANT:organ_ids] Slot {} holds organ {}",
                expected,
                organ.id()
            ));
        }
    }
    Ok(())
}

/// Severity is clamped on construction, but deserialized values bypass `new`.
fn check_severity_range(state: &PhysiologicalState) -> Result<(), String> {
    for organ in state.organs.iter() {
        if !organ.severity().is_in_range() {
            return Err(format!(
                "[INVARIANT:severity_range] Organ {} severity {} outside [0, 5]",
                organ.id(),
                organ.severity().value()
            ));
        }
    }
    Ok(())
}

fn check_finite_parameters(state: &PhysiologicalState) -> Result<(), String> {
    for organ in state.organs.iter() {
        if let Some((name, value)) = first_non_finite(organ.parameter_values()) {
            return Err(format!(
                "[INVARIANT:finite_parameters] Organ {} parameter {} is {}",
                organ.id(),
                name,
                value
            ));
        }
    }
    if let Some((name, value)) = first_non_finite(state.systemic_parameters.values()) {
        return Err(format!(
            "[INVARIANT:finite_parameters] Systemic parameter {} is {}",
            name, value
        ));
    }
    Ok(())
}

fn check_timeline(state: &PhysiologicalState) -> Result<(), String> {
    let mut previous = f64::NEG_INFINITY;
    for (i, event) in state.timeline.iter().enumerate() {
        if !event.time.is_finite() {
            return Err(format!(
                "[INVARIANT:timeline] Entry {} ({:?}) has non-finite time",
                i, event.event
            ));
        }
        if event.time < previous {
            return Err(format!(
                "[INVARIANT:timeline] Entry {} ({:?}) at {}h precedes the entry before it at {}h",
                i, event.event, event.time, previous
            ));
        }
        previous = event.time;
        if let Some(sev) = event.severity {
            if !sev.is_in_range() {
                return Err(format!(
                    "[INVARIANT:timeline] Entry {} ({:?}) severity {} outside [0, 5]",
                    i,
                    event.event,
                    sev.value()
                ));
            }
        }
    }
    Ok(())
}

fn first_non_finite(values: Vec<(&'static str, f64)>) -> Option<(&'static str, f64)> {
    values.into_iter().find(|(_, v)| !v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_initial_state;

    #[test]
    fn baseline_passes() {
        validate_invariants(&create_initial_state());
    }

    #[test]
    #[should_panic(expected = "[INVARIANT:timestamp]")]
    fn negative_timestamp_panics() {
        let mut s = create_initial_state();
        s.timestamp = -0.5;
        validate_invariants(&s);
    }

    #[test]
    fn swapped_organ_is_reported() {
        let mut s = create_initial_state();
        s.organs.liver.id = OrganSystem::Brain;
        let err = try_validate_invariants(&s).unwrap_err();
        assert!(err.contains("[INVARIANT:organ_ids]"), "{}", err);
    }

    #[test]
    fn out_of_range_severity_from_json_is_reported() {
        let s = create_initial_state();
        let mut value = serde_json::to_value(&s).unwrap();
        value["organs"]["heart"]["severity"] = serde_json::json!(6.5);
        let bad: PhysiologicalState = serde_json::from_value(value).unwrap();
        let err = try_validate_invariants(&bad).unwrap_err();
        assert!(err.contains("[INVARIANT:severity_range]"), "{}", err);
    }

    #[test]
    fn nan_parameter_is_reported() {
        let mut s = create_initial_state();
        s.organs.kidneys.parameters.gfr = f64::NAN;
        let err = try_validate_invariants(&s).unwrap_err();
        assert!(err.contains("kidneys parameter gfr"), "{}", err);

        let mut s = create_initial_state();
        s.systemic_parameters.ph = f64::INFINITY;
        let err = try_validate_invariants(&s).unwrap_err();
        assert!(err.contains("Systemic parameter ph"), "{}", err);
    }

    #[test]
    fn future_dated_timeline_entries_are_allowed() {
        let mut s = create_initial_state();
        s.timeline.push(crate::domain::TimelineEvent::new(48.0, "Planned reassessment"));
        assert!(try_validate_invariants(&s).is_ok());
    }

    #[test]
    fn out_of_order_timeline_is_reported() {
        let mut s = create_initial_state();
        s.timeline.push(crate::domain::TimelineEvent::new(6.0, "Fluids"));
        s.timeline.push(crate::domain::TimelineEvent::new(3.0, "Antibiotics"));
        let err = try_validate_invariants(&s).unwrap_err();
        assert!(err.contains("[INVARIANT:timeline]"), "{}", err);
        assert!(err.contains("Antibiotics"), "{}", err);
    }
}
