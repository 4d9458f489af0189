/// Cascade kernel — Organ Parameter Records
///
/// One plain-f64 record per modeled organ plus the systemic record.
/// Every record is addressable by field name so callers can apply manual
/// overrides between steps without knowing the concrete type.

use serde::{Deserialize, Serialize};

/// Rejected manual parameter write.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    /// The record has no field with this name.
    #[error("unknown parameter {name:?} for {scope}")]
    Unknown {
        /// Record the lookup ran against.
        scope: &'static str,
        /// Name that was requested.
        name: String,
    },

    /// NaN or infinity would poison every later step.
    #[error("non-finite value {value} for parameter {name:?}")]
    NonFinite {
        /// Field being written.
        name: String,
        /// Offending value.
        value: f64,
    },
}

/// Name-addressable numeric record.
pub trait ParameterSet {
    /// Human-readable scope used in error messages.
    const SCOPE: &'static str;

    /// Field names in declaration order.
    fn names() -> &'static [&'static str];

    fn get(&self, name: &str) -> Option<f64>;

    /// Overwrite one field. The record is unchanged on error.
    fn set(&mut self, name: &str, value: f64) -> Result<(), ParameterError>;

    /// `(name, value)` pairs in declaration order.
    fn values(&self) -> Vec<(&'static str, f64)>;
}

macro_rules! parameter_set {
    (
        $(#[$meta:meta])*
        $name:ident, $scope:literal {
            $( $(#[$fmeta:meta])* $field:ident ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: f64, )+
        }

        impl ParameterSet for $name {
            const SCOPE: &'static str = $scope;

            fn names() -> &'static [&'static str] {
                &[$(stringify!($field)),+]
            }

            fn get(&self, name: &str) -> Option<f64> {
                $(
                    if name == stringify!($field) {
                        return Some(self.$field);
                    }
                )+
                None
            }

            fn set(&mut self, name: &str, value: f64) -> Result<(), ParameterError> {
                if !value.is_finite() {
                    return Err(ParameterError::NonFinite {
                        name: name.to_string(),
                        value,
                    });
                }
                $(
                    if name == stringify!($field) {
                        self.$field = value;
                        return Ok(());
                    }
                )+
                Err(ParameterError::Unknown {
                    scope: Self::SCOPE,
                    name: name.to_string(),
                })
            }

            fn values(&self) -> Vec<(&'static str, f64)> {
                vec![$((stringify!($field), self.$field)),+]
            }
        }
    };
}

parameter_set! {
    /// Respiratory readings.
    LungParameters, "lungs" {
        /// mmHg
        pa_o2,
        /// mmHg
        pa_co2,
        /// percent
        fi_o2,
        /// cmH2O
        peep,
        /// mL/cmH2O
        compliance,
        /// percent
        shunt_fraction,
        /// 0-10
        vq_mismatch,
        /// 0-10
        alveolar_fluid,
    }
}

parameter_set! {
    /// Renal readings.
    KidneyParameters, "kidneys" {
        /// mg/dL
        creatinine,
        /// mg/dL
        bun,
        /// mL/h
        urine_output,
        /// mL/min
        gfr,
        /// mEq/L
        sodium_excretion,
        /// 0-10
        atn_severity,
        /// 0-10
        tubular_damage,
    }
}

parameter_set! {
    /// Cardiovascular readings.
    HeartParameters, "heart" {
        /// bpm
        heart_rate,
        /// Mean arterial pressure, mmHg
        map,
        /// dyn·s/cm⁵
        svr,
        /// L/min
        cardiac_output,
        /// L/min/m²
        cardiac_index,
        /// mmHg
        cvp,
        /// percent
        ejection_fraction,
        /// 0-10
        myocardial_depression,
    }
}

parameter_set! {
    /// Hepatic readings.
    LiverParameters, "liver" {
        /// mg/dL
        bilirubin,
        /// U/L
        alt,
        /// U/L
        ast,
        /// g/dL
        albumin,
        inr,
        /// mmol/L
        lactate,
        /// µg/dL
        ammonia,
        /// 0-10
        synthetic_function,
    }
}

parameter_set! {
    /// Coagulation readings.
    CoagulationParameters, "coagulation" {
        /// ×10³/µL
        platelets,
        inr,
        /// seconds
        ptt,
        /// mg/dL
        fibrinogen,
        /// ng/mL
        d_dimer,
        /// 0-10
        microthrombi,
        /// 0-10
        endothelial_injury,
        /// ISTH score, 0-8
        dic_score,
    }
}

parameter_set! {
    /// Whole-body values shared by every organ. Recomputed each step,
    /// freely editable between steps.
    SystemicParameters, "systemic" {
        /// °C
        temperature,
        /// mmol/L
        lactate,
        ph,
        /// mmol/L
        base_excess,
        /// mg/dL
        glucose,
        /// 0-10
        cytokine_levels,
        /// 0-10
        inflammation,
        /// 0-10, 10 is fully perfused
        perfusion_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn systemic() -> SystemicParameters {
        SystemicParameters {
            temperature: 37.0,
            lactate: 1.2,
            ph: 7.4,
            base_excess: 0.0,
            glucose: 100.0,
            cytokine_levels: 0.0,
            inflammation: 0.0,
            perfusion_status: 10.0,
        }
    }

    #[test]
    fn get_and_set_by_name() {
        let mut s = systemic();
        assert_eq!(s.get("lactate"), Some(1.2));
        s.set("lactate", 4.0).unwrap();
        assert_eq!(s.lactate, 4.0);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let mut s = systemic();
        let err = s.set("paO2", 50.0).unwrap_err();
        assert_eq!(
            err,
            ParameterError::Unknown {
                scope: "systemic",
                name: "paO2".to_string()
            }
        );
        assert_eq!(s, systemic());
    }

    #[test]
    fn non_finite_is_rejected() {
        let mut s = systemic();
        assert!(matches!(
            s.set("ph", f64::NAN),
            Err(ParameterError::NonFinite { .. })
        ));
        assert_eq!(s.ph, 7.4);
    }

    #[test]
    fn names_follow_declaration_order() {
        assert_eq!(LungParameters::names()[0], "pa_o2");
        assert_eq!(KidneyParameters::names().len(), 7);
        assert_eq!(CoagulationParameters::names().last(), Some(&"dic_score"));
        assert_eq!(systemic().values().len(), 8);
    }
}
