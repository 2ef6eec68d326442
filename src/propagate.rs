//! Local propagator (spec.md §4.F): narrows caches from a single
//! newly-guaranteed constraint. Sound but conservative — constraints it
//! declines to handle are simply left for the decision procedure to
//! recheck against the pool.

use std::sync::Arc;

use crate::expr::{Constraint, ConstraintKind, NumConst, NumExpr, Operand, ShapeExpr, StringExpr};
use crate::range::{Bound, IntRange, NumRange};
use crate::symbol::{Symbol, SymbolKind};

/// One cache update the propagator wants applied. Kept separate from the
/// snapshot's storage so this module doesn't need to know how caches are
/// represented.
#[derive(Debug, Clone)]
pub enum Narrowing {
    /// Intersect `symbol`'s cached range with `range`.
    Range { symbol: Symbol, range: NumRange },
    /// Pin `symbol`'s resolved exact string.
    String { symbol: Symbol, value: Arc<str> },
    /// Record that `symbol` is known to differ from `value`.
    NonString { symbol: Symbol, value: Arc<str> },
    /// Pin `symbol`'s resolved concrete shape.
    Shape { symbol: Symbol, dims: Vec<Arc<NumExpr>> },
}

fn range_from_bound_lower(k: NumExpr, int_kind: bool) -> Option<NumRange> {
    match k {
        NumExpr::Const(NumConst::Int(n)) => Some(NumRange::from_int(IntRange::new(Bound::Finite(n), Bound::PosInf))),
        NumExpr::Const(NumConst::Float(x)) if !int_kind => Some(NumRange::Float(
            crate::range::FloatRange::new(Bound::Finite(x), Bound::PosInf),
        )),
        _ => None,
    }
}

fn range_from_bound_upper(k: NumExpr, int_kind: bool) -> Option<NumRange> {
    match k {
        NumExpr::Const(NumConst::Int(n)) => Some(NumRange::from_int(IntRange::new(Bound::NegInf, Bound::Finite(n)))),
        NumExpr::Const(NumConst::Float(x)) if !int_kind => Some(NumRange::Float(
            crate::range::FloatRange::new(Bound::NegInf, Bound::Finite(x)),
        )),
        _ => None,
    }
}

fn as_symbol(e: &NumExpr) -> Option<&Symbol> {
    if let NumExpr::Symbol(s) = e {
        Some(s)
    } else {
        None
    }
}

fn as_const(e: &NumExpr) -> Option<NumExpr> {
    matches!(e, NumExpr::Const(_)).then(|| e.clone())
}

/// Narrow from `Le(k, symbol)` / `Le(symbol, k)` (or their strict `Lt`
/// counterparts, `strict = true`, nudging the bound by one for integer
/// symbols).
fn narrow_compare(l: &NumExpr, r: &NumExpr, strict: bool, le: bool) -> Vec<Narrowing> {
    let is_int = |s: &Symbol| matches!(s.kind(), SymbolKind::Int | SymbolKind::Bool);

    if let (Some(sym), Some(k)) = (as_symbol(l), as_const(r)) {
        // symbol `cmp` k  ==>  upper bound on symbol
        if is_int(sym) && strict && !le {
            if let NumExpr::Const(NumConst::Int(n)) = &k {
                let range = NumRange::from_int(IntRange::new(Bound::NegInf, Bound::Finite(n - 1)));
                return vec![Narrowing::Range { symbol: sym.clone(), range }];
            }
        }
        if let Some(range) = range_from_bound_upper(k, is_int(sym)) {
            return vec![Narrowing::Range { symbol: sym.clone(), range }];
        }
    }
    if let (Some(k), Some(sym)) = (as_const(l), as_symbol(r)) {
        // k `cmp` symbol  ==>  lower bound on symbol
        if is_int(sym) && strict && !le {
            if let NumExpr::Const(NumConst::Int(n)) = &k {
                let range = NumRange::from_int(IntRange::new(Bound::Finite(n + 1), Bound::PosInf));
                return vec![Narrowing::Range { symbol: sym.clone(), range }];
            }
        }
        if let Some(range) = range_from_bound_lower(k, is_int(sym)) {
            return vec![Narrowing::Range { symbol: sym.clone(), range }];
        }
    }
    Vec::new()
}

/// Compute the set of cache narrowings implied by installing `c` as a hard
/// or path constraint.
#[must_use]
pub fn propagate(c: &Constraint) -> Vec<Narrowing> {
    match c.kind() {
        ConstraintKind::Le(l, r) => narrow_compare(l, r, false, true),
        ConstraintKind::Lt(l, r) => narrow_compare(l, r, true, false),
        ConstraintKind::Eq(Operand::Num(l), Operand::Num(r)) => narrow_num_eq(l, r),
        ConstraintKind::Eq(Operand::String(l), Operand::String(r)) => narrow_string_eq(l, r),
        ConstraintKind::Eq(Operand::Shape(l), Operand::Shape(r)) => narrow_shape_eq(l, r),
        ConstraintKind::NotEq(Operand::String(l), Operand::String(r)) => narrow_string_not_eq(l, r),
        _ => Vec::new(),
    }
}

fn narrow_num_eq(l: &NumExpr, r: &NumExpr) -> Vec<Narrowing> {
    if let (Some(sym), Some(NumExpr::Const(c))) = (as_symbol(l), as_const(r)) {
        let range = match c {
            NumConst::Int(n) => NumRange::from_int(IntRange::from_const(n)),
            NumConst::Float(x) => NumRange::Float(crate::range::FloatRange::from_const(x.into_inner())),
        };
        return vec![Narrowing::Range { symbol: sym.clone(), range }];
    }
    if let (Some(NumExpr::Const(c)), Some(sym)) = (as_const(l), as_symbol(r)) {
        let range = match c {
            NumConst::Int(n) => NumRange::from_int(IntRange::from_const(n)),
            NumConst::Float(x) => NumRange::Float(crate::range::FloatRange::from_const(x.into_inner())),
        };
        return vec![Narrowing::Range { symbol: sym.clone(), range }];
    }
    Vec::new()
}

fn as_string_symbol(e: &StringExpr) -> Option<&Symbol> {
    if let StringExpr::Symbol(s) = e {
        Some(s)
    } else {
        None
    }
}

fn as_string_const(e: &StringExpr) -> Option<Arc<str>> {
    if let StringExpr::Const(s) = e {
        Some(Arc::clone(s))
    } else {
        None
    }
}

fn narrow_string_eq(l: &StringExpr, r: &StringExpr) -> Vec<Narrowing> {
    if let (Some(sym), Some(s)) = (as_string_symbol(l), as_string_const(r)) {
        return vec![Narrowing::String { symbol: sym.clone(), value: s }];
    }
    if let (Some(s), Some(sym)) = (as_string_const(l), as_string_symbol(r)) {
        return vec![Narrowing::String { symbol: sym.clone(), value: s }];
    }
    Vec::new()
}

fn narrow_string_not_eq(l: &StringExpr, r: &StringExpr) -> Vec<Narrowing> {
    if let (Some(sym), Some(s)) = (as_string_symbol(l), as_string_const(r)) {
        return vec![Narrowing::NonString { symbol: sym.clone(), value: s }];
    }
    if let (Some(s), Some(sym)) = (as_string_const(l), as_string_symbol(r)) {
        return vec![Narrowing::NonString { symbol: sym.clone(), value: s }];
    }
    Vec::new()
}

fn narrow_shape_eq(l: &ShapeExpr, r: &ShapeExpr) -> Vec<Narrowing> {
    if let (ShapeExpr::Symbol(sym), ShapeExpr::Const(dims)) = (l, r) {
        return vec![Narrowing::Shape { symbol: sym.clone(), dims: dims.clone() }];
    }
    if let (ShapeExpr::Const(dims), ShapeExpr::Symbol(sym)) = (l, r) {
        return vec![Narrowing::Shape { symbol: sym.clone(), dims: dims.clone() }];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdManager;

    #[test]
    fn le_const_upper_narrows_symbol() {
        let mgr = IdManager::new();
        let x = Symbol::new(&mgr, SymbolKind::Int, "x", None);
        let c = Constraint::new(
            &mgr,
            ConstraintKind::Le(NumExpr::symbol(x.clone()).arc(), NumExpr::int(5).arc()),
            None,
        );
        let n = propagate(&c);
        assert_eq!(n.len(), 1);
        match &n[0] {
            Narrowing::Range { symbol, range } => {
                assert_eq!(*symbol, x);
                assert_eq!(range.is_const_int(), None);
                assert!(range.contains(5.0));
                assert!(!range.contains(6.0));
            }
            _ => panic!("expected a range narrowing"),
        }
    }

    #[test]
    fn eq_const_pins_exact_range() {
        let mgr = IdManager::new();
        let x = Symbol::new(&mgr, SymbolKind::Int, "x", None);
        let c = Constraint::new(
            &mgr,
            ConstraintKind::Eq(
                Operand::Num(NumExpr::symbol(x.clone()).arc()),
                Operand::Num(NumExpr::int(5).arc()),
            ),
            None,
        );
        let n = propagate(&c);
        match &n[0] {
            Narrowing::Range { range, .. } => assert_eq!(range.is_const_int(), Some(5)),
            _ => panic!("expected a range narrowing"),
        }
    }
}
