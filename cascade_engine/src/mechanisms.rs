/// Cascade kernel — Mechanism Effects
///
/// Parameter-level physiology attached to specific (source, target) edges.
/// Each effect checks its own threshold and reports whether it fired.
/// Edges without an entry contribute to severity propagation only.

use crate::arithmetic::add_capped;
use crate::domain::{OrganSystem, Organs};

/// Parameter nudge for one edge. Returns `true` if the threshold was met.
pub type MechanismEffect = fn(&mut Organs) -> bool;

/// Ceiling for the 0-10 damage scores.
const DAMAGE_SCALE_MAX: f64 = 10.0;

const MECHANISM_EFFECTS: [(OrganSystem, OrganSystem, MechanismEffect); 4] = [
    (OrganSystem::Lungs, OrganSystem::Kidneys, hypoxemic_renal_injury),
    (OrganSystem::Heart, OrganSystem::Kidneys, low_output_renal_hypoperfusion),
    (OrganSystem::Coagulation, OrganSystem::Kidneys, renal_microthrombi),
    (OrganSystem::Kidneys, OrganSystem::Lungs, volume_overload),
];

/// Effect for the edge `source → target`, if one is modeled.
pub fn mechanism_effect(source: OrganSystem, target: OrganSystem) -> Option<MechanismEffect> {
    MECHANISM_EFFECTS
        .iter()
        .find(|(s, t, _)| *s == source && *t == target)
        .map(|&(_, _, effect)| effect)
}

/// PaO₂ < 60 → reduced GFR and urine output, ATN progression.
fn hypoxemic_renal_injury(organs: &mut Organs) -> bool {
    if organs.lungs.parameters.pa_o2 >= 60.0 {
        return false;
    }
    let k = &mut organs.kidneys.parameters;
    k.gfr *= 0.95;
    k.urine_output *= 0.95;
    k.atn_severity = add_capped(k.atn_severity, 0.1, DAMAGE_SCALE_MAX);
    true
}

/// Cardiac index < 2.2 → prerenal injury.
fn low_output_renal_hypoperfusion(organs: &mut Organs) -> bool {
    if organs.heart.parameters.cardiac_index >= 2.2 {
        return false;
    }
    let k = &mut organs.kidneys.parameters;
    k.gfr *= 0.93;
    k.urine_output *= 0.90;
    k.creatinine *= 1.05;
    true
}

/// DIC score ≥ 5 → microvascular thrombosis in the kidney.
fn renal_microthrombi(organs: &mut Organs) -> bool {
    if organs.coagulation.parameters.dic_score < 5.0 {
        return false;
    }
    let k = &mut organs.kidneys.parameters;
    k.gfr *= 0.92;
    k.tubular_damage = add_capped(k.tubular_damage, 0.15, DAMAGE_SCALE_MAX);
    true
}

/// Urine output < 30 → fluid retention and stiffer lungs.
fn volume_overload(organs: &mut Organs) -> bool {
    if organs.kidneys.parameters.urine_output >= 30.0 {
        return false;
    }
    let l = &mut organs.lungs.parameters;
    l.alveolar_fluid = add_capped(l.alveolar_fluid, 0.1, DAMAGE_SCALE_MAX);
    l.compliance *= 0.97;
    true
}
