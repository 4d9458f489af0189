/// Cascade kernel — Baseline State Construction
///
/// Normal adult physiology. Every preset starts from here.

use crate::domain::{OrganState, OrganSystem, Organs, PhysiologicalState, ShockType, TimelineEvent};
use crate::parameters::{
    CoagulationParameters, HeartParameters, KidneyParameters, LiverParameters,
    LungParameters, SystemicParameters,
};

/// Create a fresh baseline state at t = 0 with all severities 0.
pub fn create_initial_state() -> PhysiologicalState {
    PhysiologicalState {
        timestamp: 0.0,
        organs: baseline_organs(),
        systemic_parameters: baseline_systemic(),
        shock_type: ShockType::None,
        timeline: vec![TimelineEvent::new(0.0, "Baseline normal physiology")],
    }
}

pub fn baseline_organs() -> Organs {
    Organs {
        lungs: OrganState::new(
            OrganSystem::Lungs,
            "Respiratory System",
            LungParameters {
                pa_o2: 95.0,
                pa_co2: 40.0,
                fi_o2: 21.0,
                peep: 5.0,
                compliance: 50.0,
                shunt_fraction: 5.0,
                vq_mismatch: 0.0,
                alveolar_fluid: 0.0,
            },
            "Normal respiratory function",
            &["Clear breath sounds", "Normal work of breathing"],
        ),
        kidneys: OrganState::new(
            OrganSystem::Kidneys,
            "Renal System",
            KidneyParameters {
                creatinine: 1.0,
                bun: 15.0,
                urine_output: 60.0,
                gfr: 100.0,
                sodium_excretion: 140.0,
                atn_severity: 0.0,
                tubular_damage: 0.0,
            },
            "Normal renal function",
            &["Adequate urine output", "Normal electrolytes"],
        ),
        heart: OrganState::new(
            OrganSystem::Heart,
            "Cardiovascular System",
            HeartParameters {
                heart_rate: 75.0,
                map: 85.0,
                svr: 1000.0,
                cardiac_output: 5.0,
                cardiac_index: 2.8,
                cvp: 8.0,
                ejection_fraction: 60.0,
                myocardial_depression: 0.0,
            },
            "Normal cardiac function",
            &["Regular rhythm", "Normal perfusion"],
        ),
        liver: OrganState::new(
            OrganSystem::Liver,
            "Hepatic System",
            LiverParameters {
                bilirubin: 0.8,
                alt: 25.0,
                ast: 30.0,
                albumin: 4.0,
                inr: 1.0,
                lactate: 1.2,
                ammonia: 30.0,
                synthetic_function: 10.0,
            },
            "Normal hepatic function",
            &["Normal liver enzymes", "Normal synthetic function"],
        ),
        coagulation: OrganState::new(
            OrganSystem::Coagulation,
            "Coagulation System",
            CoagulationParameters {
                platelets: 250.0,
                inr: 1.0,
                ptt: 30.0,
                fibrinogen: 300.0,
                d_dimer: 200.0,
                microthrombi: 0.0,
                endothelial_injury: 0.0,
                dic_score: 0.0,
            },
            "Normal coagulation",
            &["Normal platelet count", "Normal coagulation studies"],
        ),
    }
}

pub fn baseline_systemic() -> SystemicParameters {
    SystemicParameters {
        temperature: 37.0,
        lactate: 1.2,
        ph: 7.40,
        base_excess: 0.0,
        glucose: 100.0,
        cytokine_levels: 0.0,
        inflammation: 0.0,
        perfusion_status: 10.0,
    }
}
