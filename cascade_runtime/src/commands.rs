//! Session commands — everything that changes a session's state.
//!
//! A command is applied against an (engine, state) pair and yields the
//! successor state. Commands convert to and from the protobuf wire types
//! so an applied sequence can be logged and replayed.

use cascade_engine::domain::{
    OrganSystem, PhysiologicalState, StepReport, UnknownOrganError,
};
use cascade_engine::engine::PhysiologyEngine;
use cascade_engine::invariants::try_validate_invariants;
use cascade_engine::parameters::{ParameterError, ParameterSet};
use cascade_engine::scenarios::{Preset, PresetError};
use cascade_engine::state::create_initial_state;

use crate::proto_types::{self, CommandKind, ProtoCommand, ProtoCommandEnvelope};
use crate::snapshot_codec::{encode_snapshot, restore_snapshot, SnapshotError};

/// A command could not be applied or decoded.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("organ {0} has no parameter model")]
    UnmodeledOrgan(OrganSystem),

    #[error(transparent)]
    UnknownOrgan(#[from] UnknownOrganError),

    #[error(transparent)]
    UnknownPreset(#[from] PresetError),

    #[error("no propagation rule {from} -> {to}")]
    UnknownRule { from: OrganSystem, to: OrganSystem },

    #[error("rejected state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("command frame {0} carries no command")]
    Empty(u64),
}

/// One state-changing session operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Step,
    SetOrganParameter {
        organ: OrganSystem,
        parameter: String,
        value: f64,
    },
    SetSystemicParameter {
        parameter: String,
        value: f64,
    },
    LoadPreset(Preset),
    Reset,
    SetRuleActive {
        source: OrganSystem,
        target: OrganSystem,
        active: bool,
    },
    LoadState(Box<PhysiologicalState>),
}

/// Outcome of applying a command.
#[derive(Debug, Clone)]
pub struct Applied {
    pub state: PhysiologicalState,
    /// Present only for `Step`.
    pub report: Option<StepReport>,
}

impl SessionCommand {
    /// Apply to `state` with `engine`. `state` is not modified; `engine` is
    /// only modified by `SetRuleActive`, and only on success.
    pub fn apply(
        &self,
        engine: &mut PhysiologyEngine,
        state: &PhysiologicalState,
    ) -> Result<Applied, CommandError> {
        let (state, report) = match self {
            SessionCommand::Step => {
                let (next, report) = engine
                    .try_step_with_report(state)
                    .map_err(CommandError::InvalidState)?;
                (next, Some(report))
            }
            SessionCommand::SetOrganParameter {
                organ,
                parameter,
                value,
            } => {
                let mut next = state.clone();
                next.organs
                    .get_mut(*organ)
                    .ok_or(CommandError::UnmodeledOrgan(*organ))?
                    .set_parameter(parameter, *value)?;
                (next, None)
            }
            SessionCommand::SetSystemicParameter { parameter, value } => {
                let mut next = state.clone();
                next.systemic_parameters.set(parameter, *value)?;
                (next, None)
            }
            SessionCommand::LoadPreset(preset) => (preset.build(), None),
            SessionCommand::Reset => (create_initial_state(), None),
            SessionCommand::SetRuleActive {
                source,
                target,
                active,
            } => {
                if !engine.set_rule_active(*source, *target, *active) {
                    return Err(CommandError::UnknownRule {
                        from: *source,
                        to: *target,
                    });
                }
                (state.clone(), None)
            }
            SessionCommand::LoadState(loaded) => {
                try_validate_invariants(loaded).map_err(CommandError::InvalidState)?;
                ((**loaded).clone(), None)
            }
        };
        Ok(Applied { state, report })
    }

    pub fn to_proto(&self, sequence: u64) -> Result<ProtoCommandEnvelope, CommandError> {
        let kind = match self {
            SessionCommand::Step => CommandKind::Step(proto_types::Step {}),
            SessionCommand::SetOrganParameter {
                organ,
                parameter,
                value,
            } => CommandKind::SetOrganParameter(proto_types::SetOrganParameter {
                organ: organ.as_str().to_string(),
                parameter: parameter.clone(),
                value: *value,
            }),
            SessionCommand::SetSystemicParameter { parameter, value } => {
                CommandKind::SetSystemicParameter(proto_types::SetSystemicParameter {
                    parameter: parameter.clone(),
                    value: *value,
                })
            }
            SessionCommand::LoadPreset(preset) => {
                CommandKind::LoadPreset(proto_types::LoadPreset {
                    preset: preset.as_str().to_string(),
                })
            }
            SessionCommand::Reset => CommandKind::Reset(proto_types::Reset {}),
            SessionCommand::SetRuleActive {
                source,
                target,
                active,
            } => CommandKind::SetRuleActive(proto_types::SetRuleActive {
                source: source.as_str().to_string(),
                target: target.as_str().to_string(),
                active: *active,
            }),
            SessionCommand::LoadState(state) => CommandKind::LoadState(proto_types::LoadState {
                state_json: encode_snapshot(state)?,
            }),
        };
        Ok(ProtoCommandEnvelope {
            sequence,
            command: Some(ProtoCommand { kind: Some(kind) }),
        })
    }

    pub fn from_proto(envelope: &ProtoCommandEnvelope) -> Result<Self, CommandError> {
        let kind = envelope
            .command
            .as_ref()
            .and_then(|c| c.kind.as_ref())
            .ok_or(CommandError::Empty(envelope.sequence))?;

        Ok(match kind {
            CommandKind::Step(_) => SessionCommand::Step,
            CommandKind::SetOrganParameter(p) => SessionCommand::SetOrganParameter {
                organ: p.organ.parse()?,
                parameter: p.parameter.clone(),
                value: p.value,
            },
            CommandKind::SetSystemicParameter(p) => SessionCommand::SetSystemicParameter {
                parameter: p.parameter.clone(),
                value: p.value,
            },
            CommandKind::LoadPreset(p) => SessionCommand::LoadPreset(p.preset.parse()?),
            CommandKind::Reset(_) => SessionCommand::Reset,
            CommandKind::SetRuleActive(p) => SessionCommand::SetRuleActive {
                source: p.source.parse()?,
                target: p.target.parse()?,
                active: p.active,
            },
            CommandKind::LoadState(p) => {
                SessionCommand::LoadState(Box::new(restore_snapshot(&p.state_json)?))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(cmd: SessionCommand) {
        let proto = cmd.to_proto(7).unwrap();
        assert_eq!(proto.sequence, 7);
        assert_eq!(SessionCommand::from_proto(&proto).unwrap(), cmd);
    }

    #[test]
    fn every_command_survives_the_wire() {
        round_trip(SessionCommand::Step);
        round_trip(SessionCommand::Reset);
        round_trip(SessionCommand::LoadPreset(Preset::CardiogenicShock));
        round_trip(SessionCommand::SetOrganParameter {
            organ: OrganSystem::Lungs,
            parameter: "pa_o2".to_string(),
            value: 52.5,
        });
        round_trip(SessionCommand::SetSystemicParameter {
            parameter: "lactate".to_string(),
            value: 6.0,
        });
        round_trip(SessionCommand::SetRuleActive {
            source: OrganSystem::Heart,
            target: OrganSystem::Liver,
            active: false,
        });
        round_trip(SessionCommand::LoadState(Box::new(Preset::AdvancedSepsis.build())));
    }

    #[test]
    fn empty_frame_is_rejected() {
        let envelope = ProtoCommandEnvelope {
            sequence: 3,
            command: None,
        };
        assert!(matches!(
            SessionCommand::from_proto(&envelope),
            Err(CommandError::Empty(3))
        ));
    }

    #[test]
    fn unmodeled_organ_is_rejected() {
        let mut engine = PhysiologyEngine::new();
        let state = create_initial_state();
        let cmd = SessionCommand::SetOrganParameter {
            organ: OrganSystem::Brain,
            parameter: "gcs".to_string(),
            value: 8.0,
        };
        assert!(matches!(
            cmd.apply(&mut engine, &state),
            Err(CommandError::UnmodeledOrgan(OrganSystem::Brain))
        ));
    }

    #[test]
    fn parameter_write_does_not_touch_input() {
        let mut engine = PhysiologyEngine::new();
        let state = create_initial_state();
        let cmd = SessionCommand::SetOrganParameter {
            organ: OrganSystem::Heart,
            parameter: "map".to_string(),
            value: 60.0,
        };
        let applied = cmd.apply(&mut engine, &state).unwrap();
        assert_eq!(applied.state.organs.heart.parameters.map, 60.0);
        assert_eq!(state.organs.heart.parameters.map, 85.0);
        assert!(applied.report.is_none());
    }

    #[test]
    fn step_that_overflows_is_rejected() {
        let mut engine = PhysiologyEngine::new();
        let mut state = Preset::CardiogenicShock.build();
        state.organs.kidneys.parameters.creatinine = f64::MAX;
        match SessionCommand::Step.apply(&mut engine, &state) {
            Err(CommandError::InvalidState(msg)) => assert!(msg.contains("creatinine"), "{}", msg),
            other => panic!("expected InvalidState, got {:?}", other.map(|a| a.state.timestamp)),
        }
    }

    #[test]
    fn unknown_rule_leaves_engine_alone() {
        let mut engine = PhysiologyEngine::new();
        let cmd = SessionCommand::SetRuleActive {
            source: OrganSystem::Liver,
            target: OrganSystem::Heart,
            active: false,
        };
        assert!(matches!(
            cmd.apply(&mut engine, &create_initial_state()),
            Err(CommandError::UnknownRule { .. })
        ));
        assert!(engine.rules().iter().all(|r| r.active));
    }
}
