/// Cascade kernel — Core Domain Types
///
/// Pure data. No transition logic.
/// Severity is a real value on the closed scale [0, 5].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::parameters::{
    CoagulationParameters, HeartParameters, KidneyParameters, LiverParameters,
    LungParameters, ParameterError, ParameterSet, SystemicParameters,
};

// ── Organ identifiers ─────────────────────────────────────────────

/// Organ system identifier. Only the first five carry a parameter model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganSystem {
    Lungs,
    Kidneys,
    Heart,
    Liver,
    Coagulation,
    Brain,
    Gi,
    Endocrine,
}

impl OrganSystem {
    /// Systems present in every `Organs` record, in iteration order.
    pub const MODELED: [OrganSystem; 5] = [
        OrganSystem::Lungs,
        OrganSystem::Kidneys,
        OrganSystem::Heart,
        OrganSystem::Liver,
        OrganSystem::Coagulation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrganSystem::Lungs => "lungs",
            OrganSystem::Kidneys => "kidneys",
            OrganSystem::Heart => "heart",
            OrganSystem::Liver => "liver",
            OrganSystem::Coagulation => "coagulation",
            OrganSystem::Brain => "brain",
            OrganSystem::Gi => "gi",
            OrganSystem::Endocrine => "endocrine",
        }
    }

    pub fn is_modeled(self) -> bool {
        Self::MODELED.contains(&self)
    }
}

impl fmt::Display for OrganSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name did not match any organ system.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown organ system {0:?}")]
pub struct UnknownOrganError(pub String);

impl FromStr for OrganSystem {
    type Err = UnknownOrganError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        [
            OrganSystem::Lungs,
            OrganSystem::Kidneys,
            OrganSystem::Heart,
            OrganSystem::Liver,
            OrganSystem::Coagulation,
            OrganSystem::Brain,
            OrganSystem::Gi,
            OrganSystem::Endocrine,
        ]
        .into_iter()
        .find(|o| o.as_str() == lowered)
        .ok_or_else(|| UnknownOrganError(s.to_string()))
    }
}

// ── Severity ──────────────────────────────────────────────────────

/// Organ dysfunction on [0, 5]. Construction through `new` always clamps.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Severity(f64);

impl Severity {
    pub const NORMAL: Severity = Severity(0.0);
    pub const CEILING: Severity = Severity(5.0);

    pub fn new(value: f64) -> Self {
        Self(value.clamp(Self::NORMAL.0, Self::CEILING.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Distance to the ceiling.
    pub fn headroom(self) -> f64 {
        Self::CEILING.0 - self.0
    }

    pub fn raised_by(self, increase: f64) -> Self {
        Self::new(self.0 + increase)
    }

    pub fn band(self) -> SeverityBand {
        SeverityBand::from_value(self.0)
    }

    pub fn is_in_range(self) -> bool {
        (Self::NORMAL.0..=Self::CEILING.0).contains(&self.0)
    }
}

impl From<f64> for Severity {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Descriptive bucket for a severity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeverityBand {
    /// Below 1.
    Normal,
    /// 1 up to 2.
    Mild,
    /// 2 up to 3.
    Moderate,
    /// 3 up to 4.
    Severe,
    /// 4 and above.
    Critical,
}

impl SeverityBand {
    pub fn from_value(value: f64) -> Self {
        if value >= 4.0 {
            SeverityBand::Critical
        } else if value >= 3.0 {
            SeverityBand::Severe
        } else if value >= 2.0 {
            SeverityBand::Moderate
        } else if value >= 1.0 {
            SeverityBand::Mild
        } else {
            SeverityBand::Normal
        }
    }

    /// Organ description for the band. `None` leaves the current text alone.
    pub fn description(self) -> Option<&'static str> {
        match self {
            SeverityBand::Critical => Some("Critical organ dysfunction"),
            SeverityBand::Severe => Some("Severe organ dysfunction"),
            SeverityBand::Moderate => Some("Moderate organ dysfunction"),
            SeverityBand::Mild => Some("Mild organ dysfunction"),
            SeverityBand::Normal => None,
        }
    }
}

/// Clinical sign appended whenever a critical description is regenerated.
pub const CRITICAL_SIGN: &str = "Critical deterioration";

// ── Shock ─────────────────────────────────────────────────────────

/// Shock classification. Informational; not read by propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShockType {
    #[default]
    None,
    Septic,
    Hypovolemic,
    Cardiogenic,
    Obstructive,
    Distributive,
}

// ── Organ state ───────────────────────────────────────────────────

/// Organ-local corrective response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Compensation {
    pub active: bool,
    pub mechanisms: Vec<String>,
}

impl Compensation {
    /// Mark active and replace the mechanism list wholesale.
    pub fn engage(&mut self, mechanisms: &[&str]) {
        self.active = true;
        self.mechanisms = mechanisms.iter().map(|m| m.to_string()).collect();
    }
}

/// One organ: shared bookkeeping plus its parameter record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganState<P> {
    pub id: OrganSystem,
    pub name: String,
    pub severity: Severity,
    pub parameters: P,
    pub description: String,
    pub clinical_signs: Vec<String>,
    pub compensation: Compensation,
}

impl<P> OrganState<P> {
    pub fn new(id: OrganSystem, name: &str, parameters: P, description: &str, signs: &[&str]) -> Self {
        Self {
            id,
            name: name.to_string(),
            severity: Severity::NORMAL,
            parameters,
            description: description.to_string(),
            clinical_signs: signs.iter().map(|s| s.to_string()).collect(),
            compensation: Compensation::default(),
        }
    }

    pub fn set_clinical_signs(&mut self, signs: &[&str]) {
        self.clinical_signs = signs.iter().map(|s| s.to_string()).collect();
    }

    /// Rewrite `description` from the severity band.
    pub fn refresh_description(&mut self) {
        let band = self.severity.band();
        if let Some(text) = band.description() {
            self.description = text.to_string();
        }
        if band == SeverityBand::Critical {
            self.clinical_signs.push(CRITICAL_SIGN.to_string());
        }
    }
}

/// Type-erased view over any `OrganState<P>`.
pub trait OrganRecord {
    fn id(&self) -> OrganSystem;
    fn name(&self) -> &str;
    fn severity(&self) -> Severity;
    fn set_severity(&mut self, severity: Severity);
    fn description(&self) -> &str;
    fn refresh_description(&mut self);
    fn clinical_signs(&self) -> &[String];
    fn compensation(&self) -> &Compensation;
    fn parameter(&self, name: &str) -> Option<f64>;
    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), ParameterError>;
    fn parameter_values(&self) -> Vec<(&'static str, f64)>;
}

impl<P: ParameterSet> OrganRecord for OrganState<P> {
    fn id(&self) -> OrganSystem {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn set_severity(&mut self, severity: Severity) {
        self.severity = severity;
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn refresh_description(&mut self) {
        OrganState::refresh_description(self);
    }

    fn clinical_signs(&self) -> &[String] {
        &self.clinical_signs
    }

    fn compensation(&self) -> &Compensation {
        &self.compensation
    }

    fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters.get(name)
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), ParameterError> {
        self.parameters.set(name, value)
    }

    fn parameter_values(&self) -> Vec<(&'static str, f64)> {
        self.parameters.values()
    }
}

/// The five modeled organs. A partial record cannot be represented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Organs {
    pub lungs: OrganState<LungParameters>,
    pub kidneys: OrganState<KidneyParameters>,
    pub heart: OrganState<HeartParameters>,
    pub liver: OrganState<LiverParameters>,
    pub coagulation: OrganState<CoagulationParameters>,
}

impl Organs {
    /// `None` for identifier-only systems (brain, GI, endocrine).
    pub fn get(&self, system: OrganSystem) -> Option<&dyn OrganRecord> {
        match system {
            OrganSystem::Lungs => Some(&self.lungs),
            OrganSystem::Kidneys => Some(&self.kidneys),
            OrganSystem::Heart => Some(&self.heart),
            OrganSystem::Liver => Some(&self.liver),
            OrganSystem::Coagulation => Some(&self.coagulation),
            OrganSystem::Brain | OrganSystem::Gi | OrganSystem::Endocrine => None,
        }
    }

    pub fn get_mut(&mut self, system: OrganSystem) -> Option<&mut dyn OrganRecord> {
        match system {
            OrganSystem::Lungs => Some(&mut self.lungs),
            OrganSystem::Kidneys => Some(&mut self.kidneys),
            OrganSystem::Heart => Some(&mut self.heart),
            OrganSystem::Liver => Some(&mut self.liver),
            OrganSystem::Coagulation => Some(&mut self.coagulation),
            OrganSystem::Brain | OrganSystem::Gi | OrganSystem::Endocrine => None,
        }
    }

    pub fn severity(&self, system: OrganSystem) -> Option<Severity> {
        self.get(system).map(|o| o.severity())
    }

    /// Lungs, kidneys, heart, liver, coagulation.
    pub fn iter(&self) -> impl Iterator<Item = &dyn OrganRecord> {
        let all: [&dyn OrganRecord; 5] = [
            &self.lungs,
            &self.kidneys,
            &self.heart,
            &self.liver,
            &self.coagulation,
        ];
        all.into_iter()
    }

    pub fn total_severity(&self) -> f64 {
        self.iter().map(|o| o.severity().value()).sum()
    }
}

// ── Timeline ──────────────────────────────────────────────────────

/// One clinical timeline entry. `event` text doubles as a dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimelineEvent {
    /// Hours from onset, one decimal.
    pub time: f64,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organ_affected: Option<OrganSystem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervention: Option<String>,
}

impl TimelineEvent {
    pub fn new(time: f64, event: &str) -> Self {
        Self {
            time,
            event: event.to_string(),
            organ_affected: None,
            severity: None,
            intervention: None,
        }
    }

    pub fn with_organ(mut self, organ: OrganSystem) -> Self {
        self.organ_affected = Some(organ);
        self
    }

    pub fn with_severity(mut self, severity: f64) -> Self {
        self.severity = Some(Severity::new(severity));
        self
    }

    pub fn with_intervention(mut self, intervention: &str) -> Self {
        self.intervention = Some(intervention.to_string());
        self
    }
}

// ── Propagation rules ─────────────────────────────────────────────

/// Directed, weighted influence of one organ on another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropagationRule {
    pub source: OrganSystem,
    pub target: OrganSystem,
    pub mechanism: String,
    /// (0, 1]
    pub strength: f64,
    /// Nominal onset latency in hours. Not consulted by stepping.
    pub delay: f64,
    pub active: bool,
}

impl PropagationRule {
    pub fn connects(&self, source: OrganSystem, target: OrganSystem) -> bool {
        self.source == source && self.target == target
    }
}

// ── Aggregate root ────────────────────────────────────────────────

/// Complete physiological snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhysiologicalState {
    /// Elapsed simulated hours.
    pub timestamp: f64,
    pub organs: Organs,
    pub systemic_parameters: SystemicParameters,
    pub shock_type: ShockType,
    pub timeline: Vec<TimelineEvent>,
}

// ── Step outcome ──────────────────────────────────────────────────

/// Severity pushed onto a target by one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityChange {
    pub source: OrganSystem,
    pub target: OrganSystem,
    pub increase: f64,
    pub resulting: Severity,
}

/// What one transition did. The new state is authoritative; this is
/// a summary for logging and display.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepReport {
    /// Timestamp of the state produced by the step.
    pub timestamp: f64,
    pub severity_changes: Vec<SeverityChange>,
    /// (source, target) pairs whose parameter effect crossed its threshold.
    pub mechanisms_fired: Vec<(OrganSystem, OrganSystem)>,
    pub compensations_engaged: Vec<OrganSystem>,
    pub events_recorded: Vec<TimelineEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_clamps_on_construction() {
        assert_eq!(Severity::new(7.0).value(), 5.0);
        assert_eq!(Severity::new(-1.0).value(), 0.0);
        assert_eq!(Severity::new(4.9).raised_by(0.5), Severity::CEILING);
    }

    #[test]
    fn severity_bands() {
        assert_eq!(Severity::new(0.006).band(), SeverityBand::Normal);
        assert_eq!(Severity::new(1.0).band(), SeverityBand::Mild);
        assert_eq!(Severity::new(2.5).band(), SeverityBand::Moderate);
        assert_eq!(Severity::new(3.0).band(), SeverityBand::Severe);
        assert_eq!(Severity::new(4.0).band(), SeverityBand::Critical);
    }

    #[test]
    fn organ_system_parses_case_insensitively() {
        assert_eq!("Kidneys".parse::<OrganSystem>(), Ok(OrganSystem::Kidneys));
        assert_eq!("gi".parse::<OrganSystem>(), Ok(OrganSystem::Gi));
        assert!("spleen".parse::<OrganSystem>().is_err());
    }

    #[test]
    fn only_five_systems_are_modeled() {
        assert!(OrganSystem::Coagulation.is_modeled());
        assert!(!OrganSystem::Brain.is_modeled());
        assert!(!OrganSystem::Endocrine.is_modeled());
    }

    #[test]
    fn compensation_replaces_mechanisms() {
        let mut c = Compensation::default();
        c.engage(&["a", "b"]);
        c.engage(&["c"]);
        assert!(c.active);
        assert_eq!(c.mechanisms, vec!["c".to_string()]);
    }
}
