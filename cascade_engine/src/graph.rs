/// Cascade kernel — Propagation Rule Graph
///
/// The fixed inter-organ rule table and pure queries over it.
/// Nothing here mutates a state.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::domain::{OrganSystem, PhysiologicalState, PropagationRule};

/// Source severity at which an edge is reported as visibly propagating.
pub const VISIBLE_PROPAGATION_SEVERITY: f64 = 2.0;

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

const RULE_TABLE: [(OrganSystem, OrganSystem, &str, f64, f64); 9] = [
    // Sepsis → ARDS
    (
        OrganSystem::Heart,
        OrganSystem::Lungs,
        "Systemic inflammation → Endothelial injury → Pulmonary capillary leak",
        0.8,
        2.0,
    ),
    // Hypoxemia → AKI
    (
        OrganSystem::Lungs,
        OrganSystem::Kidneys,
        "Hypoxemia → Renal hypoperfusion → ATN",
        0.7,
        4.0,
    ),
    (
        OrganSystem::Heart,
        OrganSystem::Kidneys,
        "Low cardiac output → Decreased renal perfusion → Prerenal AKI",
        0.9,
        1.0,
    ),
    // Sepsis → DIC
    (
        OrganSystem::Heart,
        OrganSystem::Coagulation,
        "Endothelial injury → Tissue factor release → Coagulation cascade activation",
        0.75,
        3.0,
    ),
    (
        OrganSystem::Coagulation,
        OrganSystem::Kidneys,
        "Microthrombi → Renal microcirculation failure",
        0.6,
        2.0,
    ),
    (
        OrganSystem::Coagulation,
        OrganSystem::Lungs,
        "Microthrombi → Pulmonary microcirculation failure",
        0.6,
        2.0,
    ),
    // AKI → volume overload → ARDS
    (
        OrganSystem::Kidneys,
        OrganSystem::Lungs,
        "Fluid retention → Pulmonary edema",
        0.5,
        6.0,
    ),
    (
        OrganSystem::Liver,
        OrganSystem::Coagulation,
        "Decreased clotting factor synthesis",
        0.7,
        12.0,
    ),
    (
        OrganSystem::Heart,
        OrganSystem::Liver,
        "Venous congestion → Hepatic dysfunction",
        0.6,
        8.0,
    ),
];

/// Build the nine-edge rule set, all rules active, in evaluation order.
pub fn propagation_rules() -> Vec<PropagationRule> {
    RULE_TABLE
        .iter()
        .map(|&(source, target, mechanism, strength, delay)| PropagationRule {
            source,
            target,
            mechanism: mechanism.to_string(),
            strength,
            delay,
            active: true,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Edge queries
// ---------------------------------------------------------------------------

/// Rules leaving `system`, in table order.
pub fn edges_from(rules: &[PropagationRule], system: OrganSystem) -> Vec<&PropagationRule> {
    rules.iter().filter(|r| r.source == system).collect()
}

/// Rules arriving at `system`, in table order.
pub fn edges_into(rules: &[PropagationRule], system: OrganSystem) -> Vec<&PropagationRule> {
    rules.iter().filter(|r| r.target == system).collect()
}

/// Rules whose source organ is at severity ≥ 2.
///
/// Filters on source severity only; the `active` flag is not consulted,
/// so a disabled edge still shows while its source is sick.
pub fn active_propagations(
    rules: &[PropagationRule],
    state: &PhysiologicalState,
) -> Vec<PropagationRule> {
    rules
        .iter()
        .filter(|rule| {
            state
                .organs
                .severity(rule.source)
                .is_some_and(|s| s.value() >= VISIBLE_PROPAGATION_SEVERITY)
        })
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Reachability
// ---------------------------------------------------------------------------

fn active_adjacency(rules: &[PropagationRule]) -> BTreeMap<OrganSystem, Vec<OrganSystem>> {
    let mut adj: BTreeMap<OrganSystem, Vec<OrganSystem>> = BTreeMap::new();
    for rule in rules.iter().filter(|r| r.active) {
        adj.entry(rule.source).or_default().push(rule.target);
    }
    adj
}

/// Organs reachable from `origin` through active rules, breadth-first,
/// neighbours in table order. `origin` itself is excluded.
pub fn downstream_cascade(rules: &[PropagationRule], origin: OrganSystem) -> Vec<OrganSystem> {
    let adj = active_adjacency(rules);
    let mut seen: BTreeSet<OrganSystem> = BTreeSet::new();
    seen.insert(origin);
    let mut order = Vec::new();
    let mut queue: VecDeque<OrganSystem> = VecDeque::from([origin]);

    while let Some(node) = queue.pop_front() {
        for &next in adj.get(&node).map(|v| v.as_slice()).unwrap_or(&[]) {
            if seen.insert(next) {
                order.push(next);
                queue.push_back(next);
            }
        }
    }
    order
}

/// Detect feedback loops (cycles) among active rules.
/// Iterative DFS, organs visited in `OrganSystem` order.
/// Each cycle is reported forward and closed: `[a, b, a]`.
pub fn detect_feedback_loops(rules: &[PropagationRule]) -> Vec<Vec<OrganSystem>> {
    let adj = active_adjacency(rules);

    #[derive(Clone, Copy, PartialEq)]
    enum Colour {
        White,
        Grey,
        Black,
    }

    let nodes: BTreeSet<OrganSystem> = rules
        .iter()
        .filter(|r| r.active)
        .flat_map(|r| [r.source, r.target])
        .collect();
    let mut colour: BTreeMap<OrganSystem, Colour> =
        nodes.iter().map(|&n| (n, Colour::White)).collect();

    let mut cycles: Vec<Vec<OrganSystem>> = Vec::new();

    for &start in &nodes {
        if colour.get(&start).copied() != Some(Colour::White) {
            continue;
        }

        let mut stack: Vec<(OrganSystem, usize)> = vec![(start, 0)];
        colour.insert(start, Colour::Grey);

        while let Some(&(node, idx)) = stack.last() {
            let neighbours = adj.get(&node).map(|v| v.as_slice()).unwrap_or(&[]);

            if let Some(&next) = neighbours.get(idx) {
                if let Some(top) = stack.last_mut() {
                    top.1 = idx + 1;
                }
                match colour.get(&next).copied().unwrap_or(Colour::White) {
                    Colour::Grey => {
                        let from = stack.iter().position(|(n, _)| *n == next).unwrap_or(0);
                        let mut cycle: Vec<OrganSystem> =
                            stack[from..].iter().map(|(n, _)| *n).collect();
                        cycle.push(next);
                        cycles.push(cycle);
                    }
                    Colour::White => {
                        colour.insert(next, Colour::Grey);
                        stack.push((next, 0));
                    }
                    Colour::Black => {}
                }
            } else {
                colour.insert(node, Colour::Black);
                stack.pop();
            }
        }
    }

    cycles
}
