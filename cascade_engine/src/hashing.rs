/// Cascade kernel — Canonical Hashing
///
/// Deterministic canonical serialization + SHA-256 hashing.
///
/// Rules:
///   - engine_version first, then the state
///   - Struct fields in declaration order (serde_json preserve_order)
///   - Organs in fixed lungs, kidneys, heart, liver, coagulation order
///   - Timeline in recorded order (order is meaningful)
///   - UTF-8 JSON, no whitespace

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::domain::PhysiologicalState;
use crate::ENGINE_VERSION;

/// Canonical serialization of a state to UTF-8 JSON bytes.
pub fn canonical_serialize(state: &PhysiologicalState) -> Vec<u8> {
    let obj = build_canonical_value(state);
    serde_json::to_string(&obj)
        .expect("canonical_serialize: JSON serialization failed")
        .into_bytes()
}

/// SHA-256 of canonical serialization. Lowercase hex string.
pub fn canonical_hash(state: &PhysiologicalState) -> String {
    hex_digest(&canonical_serialize(state))
}

/// Lowercase hex SHA-256 of arbitrary bytes.
pub fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn build_canonical_value(state: &PhysiologicalState) -> Value {
    let body = serde_json::to_value(state)
        .expect("canonical_serialize: state is not representable as JSON");

    // engine_version MUST be first.
    let mut root = Map::new();
    root.insert(
        "engine_version".to_string(),
        Value::Number(ENGINE_VERSION.into()),
    );
    root.insert("state".to_string(), body);
    Value::Object(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::advanced_sepsis_state;
    use crate::state::create_initial_state;

    #[test]
    fn hash_is_stable_and_hex() {
        let a = canonical_hash(&create_initial_state());
        let b = canonical_hash(&create_initial_state());
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn version_leads_the_canonical_form() {
        let bytes = canonical_serialize(&create_initial_state());
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("{\"engine_version\":1,\"state\":{\"timestamp\":"));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn any_field_change_moves_the_hash() {
        let base = advanced_sepsis_state();
        let mut tweaked = base.clone();
        tweaked.organs.liver.parameters.albumin = 3.9;
        assert_ne!(canonical_hash(&base), canonical_hash(&tweaked));

        let mut reordered = base.clone();
        reordered.timeline.swap(0, 1);
        assert_ne!(canonical_hash(&base), canonical_hash(&reordered));
    }
}
