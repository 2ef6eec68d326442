//! External interfaces for a constraint set (spec.md §6): a colorized
//! `toString()` for humans and a JSON bundle for an external solver.

use std::sync::Arc;

use serde::Serialize;

use crate::constraints::ConstraintSet;
use crate::expr::Constraint;
use crate::loc::SourceLoc;

const MAGENTA: &str = "\x1b[35m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Render a constraint set as a human-readable, partition-colored listing:
/// hard constraints in magenta, path constraints in yellow, soft constraints
/// uncolored (spec.md §6, `toString()`).
#[must_use]
pub fn to_string_pretty(set: &ConstraintSet) -> String {
    let mut lines = Vec::new();
    for c in set.hard_constraints() {
        lines.push(format!("{MAGENTA}{c}{RESET}"));
    }
    for c in set.path_constraints() {
        lines.push(format!("{YELLOW}{c}{RESET}"));
    }
    for c in set.soft_constraints() {
        lines.push(c.to_string());
    }
    lines.join("\n")
}

/// One constraint's JSON projection: its printed form plus a sanitized
/// source location, or `null` if it has none. `SourceLoc` already
/// serializes to `{file, line, column}`, so it is reused as-is rather than
/// re-wrapped.
#[derive(Debug, Clone, Serialize)]
pub struct ConstraintJson {
    text: String,
    source: Option<SourceLoc>,
}

/// `{ ctrPool, hardCtr, softCtr, pathCtr }` — spec.md §6, `getConstraintJSON()`.
#[derive(Debug, Clone, Serialize)]
pub struct ConstraintBundle {
    #[serde(rename = "ctrPool")]
    ctr_pool: Vec<ConstraintJson>,
    #[serde(rename = "hardCtr")]
    hard_ctr: Vec<ConstraintJson>,
    #[serde(rename = "softCtr")]
    soft_ctr: Vec<ConstraintJson>,
    #[serde(rename = "pathCtr")]
    path_ctr: Vec<ConstraintJson>,
}

fn to_json(cs: &[Arc<Constraint>]) -> Vec<ConstraintJson> {
    cs.iter()
        .map(|c| ConstraintJson {
            text: c.to_string(),
            source: c.source().cloned(),
        })
        .collect()
}

/// Build the external-solver JSON bundle for `set` (spec.md §6).
#[must_use]
pub fn constraint_bundle(set: &ConstraintSet) -> ConstraintBundle {
    ConstraintBundle {
        ctr_pool: to_json(&set.get_constraints()),
        hard_ctr: to_json(&set.hard_constraints()),
        soft_ctr: to_json(&set.soft_constraints()),
        path_ctr: to_json(&set.path_constraints()),
    }
}

/// Serialize `set` directly to a JSON string (spec.md §6, `getConstraintJSON()`).
///
/// # Errors
/// Returns an error only if `serde_json` itself fails to serialize the
/// bundle, which does not happen for this DTO shape in practice.
pub fn get_constraint_json(set: &ConstraintSet) -> serde_json::Result<String> {
    serde_json::to_string(&constraint_bundle(set))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::expr::{NumExpr, Operand};

    #[test]
    fn to_string_pretty_colors_hard_and_path_differently() {
        let root = ConstraintSet::root();
        let (x, s1) = root.gen_sym_int_gte("x", 0);
        let eq = s1.gen_equality(
            Operand::Num(Arc::new(NumExpr::symbol(x))),
            Operand::Num(Arc::new(NumExpr::int(5))),
        );
        let s2 = s1.guarantee(&eq);
        let rendered = to_string_pretty(&s2);
        assert!(rendered.contains(MAGENTA));
        assert!(!rendered.contains(YELLOW));
    }

    #[test]
    fn json_bundle_has_all_four_keys() {
        let root = ConstraintSet::root();
        let (x, s1) = root.gen_sym_int_gte("x", 0);
        let eq = s1.gen_equality(
            Operand::Num(Arc::new(NumExpr::symbol(x))),
            Operand::Num(Arc::new(NumExpr::int(5))),
        );
        let s2 = s1.require(&eq);
        let json = get_constraint_json(&s2).expect("serialization cannot fail for this DTO");
        assert!(json.contains("\"ctrPool\""));
        assert!(json.contains("\"hardCtr\""));
        assert!(json.contains("\"softCtr\""));
        assert!(json.contains("\"pathCtr\""));
    }
}
