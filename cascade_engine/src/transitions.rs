/// Cascade kernel — Centralized Transition Logic
///
/// ALL state-mutation logic lives here.
/// Phase order is fixed: propagation, compensation, systemic
/// recomputation, event detection. Later phases read what earlier
/// phases wrote in the same step.

use tracing::{debug, info};

use crate::arithmetic::{checked_finite, scale_capped};
use crate::domain::{
    OrganSystem, PhysiologicalState, PropagationRule, SeverityChange, StepReport,
};
use crate::events::{timeline_mentions, ClinicalEventKind};
use crate::mechanisms::mechanism_effect;

/// Fraction of the scaled source severity transferred per simulated hour.
pub const PROPAGATION_RATE: f64 = 0.15;

/// Sources at or above this severity propagate 1.5× harder.
const EXPONENTIAL_THRESHOLD: f64 = 3.0;
const EXPONENTIAL_FACTOR: f64 = 1.5;

/// Below this cardiac index, tissue perfusion is inadequate.
const LOW_CARDIAC_INDEX: f64 = 2.2;

// ---------------------------------------------------------------------------
// Public dispatcher
// ---------------------------------------------------------------------------

/// Advance *state* by `time_step` hours and return `(new_state, report)`.
/// The input is never mutated; a deep clone is made first.
pub fn apply_step(
    state: &PhysiologicalState,
    rules: &[PropagationRule],
    time_step: f64,
) -> (PhysiologicalState, StepReport) {
    let time_step = checked_finite(time_step, "time_step");
    let mut next = state.clone();
    next.timestamp += time_step;

    let mut report = StepReport {
        timestamp: next.timestamp,
        ..Default::default()
    };

    propagate_severity(&mut next, rules, time_step, &mut report);
    update_compensation(&mut next, &mut report);
    update_systemic_parameters(&mut next);
    detect_events(&mut next, &mut report);

    (next, report)
}

// ---------------------------------------------------------------------------
// Phase 1: cross-organ propagation
// ---------------------------------------------------------------------------

/// Severity added to a target by one rule, before headroom capping.
pub fn propagation_increase(source_severity: f64, strength: f64, time_step: f64) -> f64 {
    let effect = (source_severity / 5.0) * strength;
    let base = effect * time_step * PROPAGATION_RATE;
    let factor = if source_severity >= EXPONENTIAL_THRESHOLD {
        EXPONENTIAL_FACTOR
    } else {
        1.0
    };
    base * factor
}

fn propagate_severity(
    state: &mut PhysiologicalState,
    rules: &[PropagationRule],
    time_step: f64,
    report: &mut StepReport,
) {
    for rule in rules.iter().filter(|r| r.active) {
        // Rules naming an unmodeled organ have nothing to act on.
        let (Some(source_severity), Some(target_severity)) = (
            state.organs.severity(rule.source),
            state.organs.severity(rule.target),
        ) else {
            continue;
        };

        if source_severity.value() < 1.0 {
            continue;
        }

        let increase = propagation_increase(source_severity.value(), rule.strength, time_step)
            .min(target_severity.headroom());

        if increase > 0.0 {
            if let Some(target) = state.organs.get_mut(rule.target) {
                let raised = target.severity().raised_by(increase);
                target.set_severity(raised);
                target.refresh_description();
                report.severity_changes.push(SeverityChange {
                    source: rule.source,
                    target: rule.target,
                    increase,
                    resulting: raised,
                });
            }
        }

        if let Some(effect) = mechanism_effect(rule.source, rule.target) {
            if effect(&mut state.organs) {
                report.mechanisms_fired.push((rule.source, rule.target));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Phase 2: organ-local compensation
// ---------------------------------------------------------------------------

/// Compensation is sticky: once engaged it stays active until a later
/// qualifying step overwrites the mechanism list.
fn update_compensation(state: &mut PhysiologicalState, report: &mut StepReport) {
    let lungs = &mut state.organs.lungs;
    if lungs.parameters.pa_o2 < 70.0 && lungs.severity.value() < 4.0 {
        lungs
            .compensation
            .engage(&["Increased respiratory rate", "Recruitment of alveoli"]);
        lungs.parameters.pa_o2 = scale_capped(lungs.parameters.pa_o2, 1.02, 100.0);
        report.compensations_engaged.push(OrganSystem::Lungs);
    }

    let heart = &mut state.organs.heart;
    if heart.parameters.map < 65.0 && heart.severity.value() < 4.0 {
        heart
            .compensation
            .engage(&["Increased heart rate", "Increased contractility"]);
        heart.parameters.heart_rate = scale_capped(heart.parameters.heart_rate, 1.05, 140.0);
        heart.parameters.svr = scale_capped(heart.parameters.svr, 1.03, 2000.0);
        report.compensations_engaged.push(OrganSystem::Heart);
    }

    let kidneys = &mut state.organs.kidneys;
    if kidneys.parameters.gfr < 60.0 && kidneys.severity.value() < 3.0 {
        kidneys
            .compensation
            .engage(&["Afferent arteriole dilation", "RAAS activation"]);
        kidneys.parameters.sodium_excretion *= 0.95;
        report.compensations_engaged.push(OrganSystem::Kidneys);
    }
}

// ---------------------------------------------------------------------------
// Phase 3: systemic recomputation
// ---------------------------------------------------------------------------

fn update_systemic_parameters(state: &mut PhysiologicalState) {
    let organs = &state.organs;
    let sys = &mut state.systemic_parameters;

    if organs.heart.parameters.cardiac_index < LOW_CARDIAC_INDEX {
        sys.lactate = scale_capped(sys.lactate, 1.05, 15.0);
    } else if sys.lactate > 2.0 {
        sys.lactate *= 0.95;
    }

    let metabolic = if sys.lactate > 4.0 { -0.01 } else { 0.0 };
    let respiratory = if organs.lungs.parameters.pa_co2 > 45.0 {
        -0.005
    } else {
        0.002
    };
    sys.ph = (sys.ph + metabolic + respiratory).clamp(6.9, 7.6);
    sys.base_excess = (sys.ph - 7.4) * 25.0;

    sys.inflammation = (organs.total_severity() / 3.0).min(10.0);
    sys.perfusion_status = 10.0
        - ((organs.heart.severity.value() * 2.0 + organs.lungs.severity.value()) / 3.0).min(10.0);
}

// ---------------------------------------------------------------------------
// Phase 4: event detection
// ---------------------------------------------------------------------------

/// Current time, but never earlier than the last timeline entry.
/// Presets seed entries ahead of their own timestamp.
fn event_time(state: &PhysiologicalState) -> f64 {
    state
        .timeline
        .last()
        .map_or(state.timestamp, |last| last.time.max(state.timestamp))
}

fn detect_events(state: &mut PhysiologicalState, report: &mut StepReport) {
    for kind in ClinicalEventKind::ALL {
        if !kind.criteria_met(state) || timeline_mentions(&state.timeline, kind.marker()) {
            continue;
        }
        let event = kind.to_timeline_event(event_time(state));
        info!(time = event.time, event = %event.event, "Clinical event recorded");
        state.timeline.push(event.clone());
        report.events_recorded.push(event);
    }
    debug!(
        timestamp = state.timestamp,
        timeline_len = state.timeline.len(),
        "Event detection complete"
    );
}
