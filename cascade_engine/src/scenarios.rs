/// Cascade kernel — Scenario Presets
///
/// Named starting states built by overwriting fields of the baseline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{OrganSystem, PhysiologicalState, Severity, ShockType, TimelineEvent};
use crate::state::create_initial_state;

/// Available starting scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    Normal,
    EarlySepsis,
    AdvancedSepsis,
    CardiogenicShock,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Normal,
        Preset::EarlySepsis,
        Preset::AdvancedSepsis,
        Preset::CardiogenicShock,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Normal => "normal",
            Preset::EarlySepsis => "early-sepsis",
            Preset::AdvancedSepsis => "advanced-sepsis",
            Preset::CardiogenicShock => "cardiogenic-shock",
        }
    }

    pub fn build(self) -> PhysiologicalState {
        match self {
            Preset::Normal => normal_state(),
            Preset::EarlySepsis => early_sepsis_state(),
            Preset::AdvancedSepsis => advanced_sepsis_state(),
            Preset::CardiogenicShock => cardiogenic_shock_state(),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preset name not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown preset {0:?} (expected one of: normal, early-sepsis, advanced-sepsis, cardiogenic-shock)")]
pub struct PresetError(pub String);

impl FromStr for Preset {
    type Err = PresetError;

    /// Accepts kebab-case, snake_case and camelCase spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "normal" => Ok(Preset::Normal),
            "earlysepsis" => Ok(Preset::EarlySepsis),
            "advancedsepsis" => Ok(Preset::AdvancedSepsis),
            "cardiogenicshock" => Ok(Preset::CardiogenicShock),
            _ => Err(PresetError(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn normal_state() -> PhysiologicalState {
    create_initial_state()
}

/// Hyperdynamic early sepsis: tachycardia, fever, mild hypoxemia.
pub fn early_sepsis_state() -> PhysiologicalState {
    let mut state = create_initial_state();
    state.shock_type = ShockType::Septic;

    let heart = &mut state.organs.heart;
    heart.severity = Severity::new(1.0);
    heart.parameters.heart_rate = 110.0;
    heart.parameters.map = 72.0;
    heart.parameters.svr = 700.0;
    heart.parameters.cardiac_output = 6.5;
    heart.parameters.cardiac_index = 6.5;
    heart.set_clinical_signs(&["Tachycardia", "Warm extremities", "Hyperdynamic"]);

    let lungs = &mut state.organs.lungs;
    lungs.parameters.pa_o2 = 85.0;
    lungs.parameters.fi_o2 = 30.0;

    let sys = &mut state.systemic_parameters;
    sys.temperature = 38.5;
    sys.lactate = 2.5;
    sys.cytokine_levels = 4.0;
    sys.inflammation = 3.0;

    state.timeline = vec![
        TimelineEvent::new(0.0, "Patient develops fever and tachycardia").with_severity(1.0),
        TimelineEvent::new(2.0, "Blood cultures sent, empiric antibiotics started")
            .with_intervention("Broad-spectrum antibiotics"),
    ];

    state
}

/// Early sepsis 24 h later: ARDS, AKI stage 2, early DIC.
pub fn advanced_sepsis_state() -> PhysiologicalState {
    let mut state = early_sepsis_state();
    state.timestamp = 24.0;

    let lungs = &mut state.organs.lungs;
    lungs.severity = Severity::new(3.0);
    lungs.parameters.pa_o2 = 65.0;
    lungs.parameters.fi_o2 = 60.0;
    lungs.parameters.peep = 12.0;
    lungs.parameters.compliance = 30.0;
    lungs.parameters.shunt_fraction = 25.0;
    lungs.parameters.alveolar_fluid = 6.0;
    lungs.set_clinical_signs(&["Bilateral infiltrates", "Severe hypoxemia", "Decreased compliance"]);

    let kidneys = &mut state.organs.kidneys;
    kidneys.severity = Severity::new(2.0);
    kidneys.parameters.creatinine = 2.5;
    kidneys.parameters.bun = 45.0;
    kidneys.parameters.urine_output = 25.0;
    kidneys.parameters.gfr = 40.0;
    kidneys.parameters.atn_severity = 5.0;
    kidneys.set_clinical_signs(&["Oliguria", "Rising creatinine"]);

    let heart = &mut state.organs.heart;
    heart.severity = Severity::new(2.0);
    heart.parameters.map = 58.0;
    heart.parameters.cardiac_index = 2.0;
    heart.parameters.myocardial_depression = 4.0;

    let coag = &mut state.organs.coagulation;
    coag.severity = Severity::new(2.0);
    coag.parameters.platelets = 100.0;
    coag.parameters.inr = 1.6;
    coag.parameters.fibrinogen = 180.0;
    coag.parameters.d_dimer = 1500.0;
    coag.parameters.dic_score = 5.0;

    let sys = &mut state.systemic_parameters;
    sys.lactate = 4.5;
    sys.ph = 7.28;
    sys.inflammation = 7.0;
    sys.perfusion_status = 4.0;

    state.timeline.extend([
        TimelineEvent::new(12.0, "ARDS criteria met (PaO₂/FiO₂ = 108)")
            .with_organ(OrganSystem::Lungs)
            .with_severity(3.0),
        TimelineEvent::new(18.0, "AKI Stage 2 (Creatinine 2.5× baseline)")
            .with_organ(OrganSystem::Kidneys)
            .with_severity(2.0),
        TimelineEvent::new(24.0, "DIC pattern developing")
            .with_organ(OrganSystem::Coagulation)
            .with_severity(2.0),
    ]);

    state
}

/// Acute MI with pump failure, pulmonary edema, prerenal AKI.
pub fn cardiogenic_shock_state() -> PhysiologicalState {
    let mut state = create_initial_state();
    state.shock_type = ShockType::Cardiogenic;

    let heart = &mut state.organs.heart;
    heart.severity = Severity::new(4.0);
    heart.parameters.heart_rate = 120.0;
    heart.parameters.map = 55.0;
    heart.parameters.cardiac_output = 2.5;
    heart.parameters.cardiac_index = 1.4;
    heart.parameters.cvp = 18.0;
    heart.parameters.ejection_fraction = 25.0;
    heart.set_clinical_signs(&["Severe hypotension", "Pulmonary edema", "Cool extremities"]);

    let lungs = &mut state.organs.lungs;
    lungs.severity = Severity::new(2.0);
    lungs.parameters.pa_o2 = 70.0;
    lungs.parameters.alveolar_fluid = 7.0;
    lungs.parameters.compliance = 35.0;

    let kidneys = &mut state.organs.kidneys;
    kidneys.severity = Severity::new(2.0);
    kidneys.parameters.creatinine = 2.0;
    kidneys.parameters.urine_output = 20.0;
    kidneys.parameters.gfr = 35.0;

    let liver = &mut state.organs.liver;
    liver.severity = Severity::new(1.0);
    liver.parameters.alt = 150.0;
    liver.parameters.ast = 180.0;
    liver.parameters.bilirubin = 2.5;

    state.systemic_parameters.lactate = 5.5;
    state.systemic_parameters.perfusion_status = 2.0;

    state.timeline = vec![TimelineEvent::new(0.0, "Acute MI with cardiogenic shock")
        .with_organ(OrganSystem::Heart)
        .with_severity(4.0)];

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::try_validate_invariants;

    #[test]
    fn every_preset_is_valid() {
        for p in Preset::ALL {
            let state = p.build();
            assert!(try_validate_invariants(&state).is_ok(), "{} invalid", p);
        }
    }

    #[test]
    fn preset_names_round_trip() {
        for p in Preset::ALL {
            assert_eq!(p.as_str().parse::<Preset>(), Ok(p));
        }
        assert_eq!("earlySepsis".parse::<Preset>(), Ok(Preset::EarlySepsis));
        assert_eq!("cardiogenic_shock".parse::<Preset>(), Ok(Preset::CardiogenicShock));
        assert!("septic".parse::<Preset>().is_err());
    }

    #[test]
    fn early_sepsis_values() {
        let s = early_sepsis_state();
        assert_eq!(s.shock_type, ShockType::Septic);
        assert_eq!(s.organs.heart.severity.value(), 1.0);
        assert_eq!(s.organs.heart.parameters.cardiac_index, 6.5);
        assert_eq!(s.organs.heart.parameters.map, 72.0);
        assert_eq!(s.organs.lungs.parameters.pa_o2, 85.0);
        assert_eq!(s.timeline.len(), 2);
        assert_eq!(
            s.timeline[1].intervention.as_deref(),
            Some("Broad-spectrum antibiotics")
        );
    }

    #[test]
    fn advanced_sepsis_builds_on_early_sepsis() {
        let s = advanced_sepsis_state();
        assert_eq!(s.timestamp, 24.0);
        assert_eq!(s.shock_type, ShockType::Septic);
        assert_eq!(s.systemic_parameters.temperature, 38.5);
        assert_eq!(s.organs.kidneys.severity.value(), 2.0);
        assert_eq!(s.organs.coagulation.parameters.dic_score, 5.0);
        assert_eq!(s.timeline.len(), 5);
    }

    #[test]
    fn cardiogenic_shock_values() {
        let s = cardiogenic_shock_state();
        assert_eq!(s.organs.heart.severity.value(), 4.0);
        assert_eq!(s.organs.heart.parameters.cardiac_index, 1.4);
        assert_eq!(s.organs.heart.parameters.map, 55.0);
        assert_eq!(s.systemic_parameters.lactate, 5.5);
        assert_eq!(s.timeline[0].organ_affected, Some(OrganSystem::Heart));
    }
}
