/// Cascade kernel — Clinical Event Definitions
///
/// The transitions worth a timeline entry. Each kind carries its
/// detection criteria and the exact entry it appends. Entries are
/// deduplicated by substring match on the marker, so a preset that
/// already mentions "AKI" suppresses the engine's own AKI entry.

use crate::arithmetic::round_to_tenth;
use crate::domain::{OrganSystem, PhysiologicalState, TimelineEvent};

/// Detected clinical syndromes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClinicalEventKind {
    Ards,
    Aki,
    Dic,
}

impl ClinicalEventKind {
    /// Checked in this order every step.
    pub const ALL: [ClinicalEventKind; 3] = [
        ClinicalEventKind::Ards,
        ClinicalEventKind::Aki,
        ClinicalEventKind::Dic,
    ];

    /// Substring that identifies an existing entry of this kind.
    pub fn marker(self) -> &'static str {
        match self {
            ClinicalEventKind::Ards => "ARDS",
            ClinicalEventKind::Aki => "AKI",
            ClinicalEventKind::Dic => "DIC",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ClinicalEventKind::Ards => "ARDS criteria met (PaO₂/FiO₂ < 300)",
            ClinicalEventKind::Aki => "AKI Stage 1 (Creatinine > 1.5× baseline)",
            ClinicalEventKind::Dic => "DIC pattern developing (ISTH score ≥ 5)",
        }
    }

    pub fn organ(self) -> OrganSystem {
        match self {
            ClinicalEventKind::Ards => OrganSystem::Lungs,
            ClinicalEventKind::Aki => OrganSystem::Kidneys,
            ClinicalEventKind::Dic => OrganSystem::Coagulation,
        }
    }

    /// Severity recorded on the timeline entry.
    pub fn recorded_severity(self) -> f64 {
        match self {
            ClinicalEventKind::Ards | ClinicalEventKind::Aki => 2.0,
            ClinicalEventKind::Dic => 3.0,
        }
    }

    pub fn criteria_met(self, state: &PhysiologicalState) -> bool {
        let organs = &state.organs;
        match self {
            ClinicalEventKind::Ards => {
                let lungs = &organs.lungs;
                pf_ratio(lungs.parameters.pa_o2, lungs.parameters.fi_o2) < 300.0
                    && lungs.severity.value() >= 2.0
            }
            ClinicalEventKind::Aki => {
                organs.kidneys.parameters.creatinine > 1.5
                    && organs.kidneys.severity.value() >= 2.0
            }
            ClinicalEventKind::Dic => {
                organs.coagulation.parameters.dic_score >= 5.0
                    && organs.coagulation.severity.value() >= 3.0
            }
        }
    }

    /// Timeline entry for this kind at `timestamp` (rounded to 0.1 h).
    pub fn to_timeline_event(self, timestamp: f64) -> TimelineEvent {
        TimelineEvent::new(round_to_tenth(timestamp), self.description())
            .with_organ(self.organ())
            .with_severity(self.recorded_severity())
    }
}

/// PaO₂/FiO₂ with FiO₂ given in percent.
pub fn pf_ratio(pa_o2: f64, fi_o2_percent: f64) -> f64 {
    pa_o2 / (fi_o2_percent / 100.0)
}

/// True if any timeline entry's text contains `marker`.
pub fn timeline_mentions(timeline: &[TimelineEvent], marker: &str) -> bool {
    timeline.iter().any(|e| e.event.contains(marker))
}

/// Count of timeline entries whose text contains `marker`.
pub fn count_mentions(timeline: &[TimelineEvent], marker: &str) -> usize {
    timeline.iter().filter(|e| e.event.contains(marker)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_initial_state;

    #[test]
    fn pf_ratio_uses_percent_fio2() {
        assert!((pf_ratio(50.0, 21.0) - 238.095).abs() < 1e-3);
        assert_eq!(pf_ratio(95.0, 100.0), 95.0);
    }

    #[test]
    fn baseline_meets_no_criteria() {
        let state = create_initial_state();
        for kind in ClinicalEventKind::ALL {
            assert!(!kind.criteria_met(&state), "{:?}", kind);
        }
    }

    #[test]
    fn ards_needs_both_ratio_and_severity() {
        let mut state = create_initial_state();
        state.organs.lungs.parameters.pa_o2 = 50.0;
        assert!(!ClinicalEventKind::Ards.criteria_met(&state));
        state.organs.lungs.severity = 2.0.into();
        assert!(ClinicalEventKind::Ards.criteria_met(&state));
    }

    #[test]
    fn timeline_entry_is_rounded_and_tagged() {
        let e = ClinicalEventKind::Dic.to_timeline_event(12.54);
        assert_eq!(e.time, 12.5);
        assert_eq!(e.organ_affected, Some(OrganSystem::Coagulation));
        assert_eq!(e.severity.map(|s| s.value()), Some(3.0));
        assert!(e.event.contains(ClinicalEventKind::Dic.marker()));
    }

    #[test]
    fn mentions_match_substrings() {
        let timeline = vec![
            TimelineEvent::new(18.0, "AKI Stage 2 (Creatinine 2.5× baseline)"),
            TimelineEvent::new(24.0, "DIC pattern developing"),
        ];
        assert!(timeline_mentions(&timeline, "AKI"));
        assert!(!timeline_mentions(&timeline, "ARDS"));
        assert_eq!(count_mentions(&timeline, "DIC"), 1);
    }
}
