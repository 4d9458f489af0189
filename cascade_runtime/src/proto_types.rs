//! Hand-written protobuf types for the session command log.
//!
//! Uses prost derive macros for encode/decode without prost-build.
//! Tags are stable; new commands take new oneof tags.

use prost::Message;

// ── Envelope ───────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoCommandEnvelope {
    #[prost(uint64, tag = "1")]
    pub sequence: u64,
    #[prost(message, optional, tag = "2")]
    pub command: Option<ProtoCommand>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoCommand {
    #[prost(oneof = "CommandKind", tags = "1, 2, 3, 4, 5, 6, 7")]
    pub kind: Option<CommandKind>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum CommandKind {
    #[prost(message, tag = "1")]
    Step(Step),
    #[prost(message, tag = "2")]
    SetOrganParameter(SetOrganParameter),
    #[prost(message, tag = "3")]
    SetSystemicParameter(SetSystemicParameter),
    #[prost(message, tag = "4")]
    LoadPreset(LoadPreset),
    #[prost(message, tag = "5")]
    Reset(Reset),
    #[prost(message, tag = "6")]
    SetRuleActive(SetRuleActive),
    #[prost(message, tag = "7")]
    LoadState(LoadState),
}

// ── Commands ───────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct Step {}

#[derive(Clone, PartialEq, Message)]
pub struct SetOrganParameter {
    /// Organ identifier, snake_case.
    #[prost(string, tag = "1")]
    pub organ: String,
    #[prost(string, tag = "2")]
    pub parameter: String,
    #[prost(double, tag = "3")]
    pub value: f64,
}

#[derive(Clone, PartialEq, Message)]
pub struct SetSystemicParameter {
    #[prost(string, tag = "1")]
    pub parameter: String,
    #[prost(double, tag = "2")]
    pub value: f64,
}

#[derive(Clone, PartialEq, Message)]
pub struct LoadPreset {
    /// kebab-case preset name.
    #[prost(string, tag = "1")]
    pub preset: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Reset {}

#[derive(Clone, PartialEq, Message)]
pub struct SetRuleActive {
    #[prost(string, tag = "1")]
    pub source: String,
    #[prost(string, tag = "2")]
    pub target: String,
    #[prost(bool, tag = "3")]
    pub active: bool,
}

#[derive(Clone, PartialEq, Message)]
pub struct LoadState {
    /// Snapshot-codec JSON of the loaded state.
    #[prost(string, tag = "1")]
    pub state_json: String,
}
