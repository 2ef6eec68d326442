//! The immediate decision procedure (spec.md §4.D): classifies a constraint
//! as `true`/`false`/`unknown` without reaching for an external solver.

use std::sync::Arc;

use crate::expr::{BoolExpr, Constraint, ConstraintKind, NumExpr, Operand, ShapeExpr, StringExpr};
use crate::range::NumRange;

/// A three-valued decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The constraint is a logical consequence of the pool.
    True,
    /// The negation is a logical consequence of the pool.
    False,
    /// Neither could be established immediately.
    Unknown,
}

impl Decision {
    /// Three-valued negation: `Unknown` stays `Unknown`.
    #[must_use]
    pub const fn not(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }

    /// Short-circuiting conjunction: any `False` operand wins regardless of the other.
    #[must_use]
    pub const fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::True, Self::True) => Self::True,
            _ => Self::Unknown,
        }
    }

    /// Short-circuiting disjunction: any `True` operand wins regardless of the other.
    #[must_use]
    pub const fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::False, Self::False) => Self::False,
            _ => Self::Unknown,
        }
    }
}

/// The per-symbol context the decision procedure consults: a symbol's known
/// numeric range, its resolved shape (if any), and its resolved exact string
/// (if any). Threaded in rather than owned so this module stays independent
/// of the snapshot's storage representation.
pub trait DecisionContext {
    /// The range of a numeric expression, per `getCachedRange` (spec.md §4.E).
    fn range_of(&self, expr: &NumExpr) -> Option<NumRange>;
    /// The resolved dimension vector of a shape expression, if known.
    fn shape_of(&self, expr: &ShapeExpr) -> Option<Vec<Arc<NumExpr>>>;
    /// The resolved exact string value of a string expression, if known.
    fn string_of(&self, expr: &StringExpr) -> Option<Arc<str>>;
    /// Whether `expr` is known to differ from every string in its
    /// `nonStringCache` entry — used only to refine `NotEq`.
    fn known_unequal_string(&self, expr: &StringExpr, s: &str) -> bool;
}

/// `checkImmediate(c)` — spec.md §6. `enabled = false` models the global
/// "immediate-check enabled" switch short-circuiting to `unknown`.
pub fn check_immediate(ctx: &dyn DecisionContext, c: &Constraint, enabled: bool) -> Decision {
    if !enabled {
        return Decision::Unknown;
    }
    decide_kind(ctx, c.kind(), enabled)
}

fn decide_kind(ctx: &dyn DecisionContext, kind: &ConstraintKind, enabled: bool) -> Decision {
    match kind {
        ConstraintKind::ExpBool(e) => decide_bool_expr(ctx, e),
        ConstraintKind::Eq(l, r) => decide_eq(ctx, l, r),
        ConstraintKind::NotEq(l, r) => decide_not_eq(ctx, l, r),
        ConstraintKind::Lt(l, r) => decide_lt(ctx, l, r, false),
        ConstraintKind::Le(l, r) => decide_lt(ctx, l, r, true),
        ConstraintKind::And(l, r) => {
            let dl = check_immediate(ctx, l, enabled);
            let dr = check_immediate(ctx, r, enabled);
            dl.and(dr)
        }
        ConstraintKind::Or(l, r) => {
            let dl = check_immediate(ctx, l, enabled);
            let dr = check_immediate(ctx, r, enabled);
            dl.or(dr)
        }
        ConstraintKind::Not(c) => check_immediate(ctx, c, enabled).not(),
        ConstraintKind::Broadcastable(l, r) => decide_broadcastable(ctx, l, r),
        ConstraintKind::Forall { .. } => Decision::Unknown,
        ConstraintKind::Fail(_) => Decision::False,
    }
}

fn decide_bool_expr(ctx: &dyn DecisionContext, e: &BoolExpr) -> Decision {
    match e {
        BoolExpr::Const(true) => Decision::True,
        BoolExpr::Const(false) => Decision::False,
        BoolExpr::Symbol(sym) => {
            let expr = NumExpr::symbol(sym.clone());
            match ctx.range_of(&expr).and_then(|r| r.is_const()) {
                Some(v) if v == 0.0 => Decision::False,
                Some(v) if v == 1.0 => Decision::True,
                _ => Decision::Unknown,
            }
        }
    }
}

fn decide_eq(ctx: &dyn DecisionContext, l: &Operand, r: &Operand) -> Decision {
    match (l, r) {
        (Operand::Num(l), Operand::Num(r)) => decide_num_eq(ctx, l, r),
        (Operand::Bool(l), Operand::Bool(r)) => decide_bool_eq(ctx, l, r),
        (Operand::Shape(l), Operand::Shape(r)) => decide_shape_eq(l, r),
        (Operand::String(l), Operand::String(r)) => decide_string_eq(ctx, l, r),
        _ => Decision::False,
    }
}

fn decide_num_eq(ctx: &dyn DecisionContext, l: &NumExpr, r: &NumExpr) -> Decision {
    let lr = ctx.range_of(l);
    let rr = ctx.range_of(r);
    if let (Some(lc), Some(rc)) = (lr.and_then(|r| r.is_const()), rr.and_then(|r| r.is_const())) {
        return if lc == rc { Decision::True } else { Decision::False };
    }
    if l.is_structurally_eq(r) {
        Decision::True
    } else {
        Decision::Unknown
    }
}

fn decide_bool_eq(ctx: &dyn DecisionContext, l: &BoolExpr, r: &BoolExpr) -> Decision {
    let lv = eval_bool(ctx, l);
    let rv = eval_bool(ctx, r);
    match (lv, rv) {
        (Some(a), Some(b)) => {
            if a == b {
                Decision::True
            } else {
                Decision::False
            }
        }
        _ => Decision::Unknown,
    }
}

fn eval_bool(ctx: &dyn DecisionContext, e: &BoolExpr) -> Option<bool> {
    match decide_bool_expr(ctx, e) {
        Decision::True => Some(true),
        Decision::False => Some(false),
        Decision::Unknown => None,
    }
}

fn decide_shape_eq(l: &ShapeExpr, r: &ShapeExpr) -> Decision {
    if let (ShapeExpr::Const(ld), ShapeExpr::Const(rd)) = (l, r) {
        if ld.len() != rd.len() {
            return Decision::False;
        }
        for (a, b) in ld.iter().zip(rd.iter()) {
            if let (NumExpr::Const(ac), NumExpr::Const(bc)) = (a.as_ref(), b.as_ref()) {
                if ac != bc {
                    return Decision::False;
                }
            }
        }
        return Decision::Unknown;
    }
    if l.is_structurally_eq(r) {
        Decision::True
    } else {
        Decision::Unknown
    }
}

fn decide_string_eq(ctx: &dyn DecisionContext, l: &StringExpr, r: &StringExpr) -> Decision {
    if let (Some(a), Some(b)) = (ctx.string_of(l), ctx.string_of(r)) {
        return if a == b { Decision::True } else { Decision::False };
    }
    if l.is_structurally_eq(r) {
        Decision::True
    } else {
        Decision::Unknown
    }
}

fn decide_not_eq(ctx: &dyn DecisionContext, l: &Operand, r: &Operand) -> Decision {
    match (l, r) {
        (Operand::Num(l), Operand::Num(r)) => {
            if l.is_structurally_eq(r) {
                return Decision::False;
            }
            if let (Some(lr), Some(rr)) = (ctx.range_of(l), ctx.range_of(r)) {
                if lr.lt_range(&rr) || rr.lt_range(&lr) {
                    return Decision::True;
                }
            }
            decide_num_eq(ctx, l, r).not()
        }
        (Operand::String(l), Operand::String(r)) => {
            if let (Some(a), Some(b)) = (ctx.string_of(l), ctx.string_of(r)) {
                return if a != b { Decision::True } else { Decision::False };
            }
            if let StringExpr::Const(s) = r {
                if ctx.known_unequal_string(l, s) {
                    return Decision::True;
                }
            }
            if l.is_structurally_eq(r) {
                Decision::False
            } else {
                Decision::Unknown
            }
        }
        (Operand::Bool(l), Operand::Bool(r)) => decide_bool_eq(ctx, l, r).not(),
        (Operand::Shape(l), Operand::Shape(r)) => decide_shape_eq(l, r).not(),
        _ => Decision::True,
    }
}

fn decide_lt(ctx: &dyn DecisionContext, l: &NumExpr, r: &NumExpr, or_equal: bool) -> Decision {
    let (Some(lr), Some(rr)) = (ctx.range_of(l), ctx.range_of(r)) else {
        return Decision::Unknown;
    };
    let holds = if or_equal { lr.lte_range(&rr) } else { lr.lt_range(&rr) };
    if holds {
        Decision::True
    } else {
        Decision::Unknown
    }
}

/// `selectBroadcastable(a, b)` — spec.md §4.D, the 8-rule per-position test.
fn select_broadcastable(
    ctx: &dyn DecisionContext,
    a: &NumExpr,
    b: &NumExpr,
) -> Result<Option<Arc<NumExpr>>, ()> {
    let ra = ctx.range_of(a);
    let rb = ctx.range_of(b);
    let a_is_one = ra.as_ref().is_some_and(|r| r.is_const() == Some(1.0));
    let b_is_one = rb.as_ref().is_some_and(|r| r.is_const() == Some(1.0));

    if a_is_one {
        return Ok(Some(Arc::new(b.clone())));
    }
    if b_is_one {
        return Ok(Some(Arc::new(a.clone())));
    }
    if let (Some(ac), Some(bc)) = (ra.as_ref().and_then(NumRange::is_const), rb.as_ref().and_then(NumRange::is_const)) {
        return if (ac - bc).abs() < f64::EPSILON {
            Ok(Some(Arc::new(a.clone())))
        } else {
            Err(())
        };
    }
    if let (Some(ac), Some(rb)) = (ra.as_ref().and_then(NumRange::is_const), rb.as_ref()) {
        if !rb.contains(ac) {
            return Err(());
        }
    }
    if let (Some(ra), Some(bc)) = (ra.as_ref(), rb.as_ref().and_then(NumRange::is_const)) {
        if !ra.contains(bc) {
            return Err(());
        }
    }
    if let (Some(ra), Some(rb)) = (&ra, &rb) {
        if ra.lt_range(rb) || rb.lt_range(ra) {
            return Err(());
        }
    }
    if a.is_structurally_eq(b) {
        return Ok(Some(Arc::new(a.clone())));
    }
    Ok(None)
}

fn decide_broadcastable(ctx: &dyn DecisionContext, l: &ShapeExpr, r: &ShapeExpr) -> Decision {
    let (Some(ld), Some(rd)) = (ctx.shape_of(l), ctx.shape_of(r)) else {
        return Decision::Unknown;
    };
    let n = ld.len().max(rd.len());
    let pad = |dims: &[Arc<NumExpr>]| -> Vec<Arc<NumExpr>> {
        let missing = n - dims.len();
        let mut out = vec![Arc::new(NumExpr::int(1)); missing];
        out.extend(dims.iter().cloned());
        out
    };
    let lp = pad(&ld);
    let rp = pad(&rd);

    let mut saw_unknown = false;
    for (a, b) in lp.iter().zip(rp.iter()) {
        match select_broadcastable(ctx, a, b) {
            Err(()) => return Decision::False,
            Ok(None) => saw_unknown = true,
            Ok(Some(_)) => {}
        }
    }
    if saw_unknown {
        Decision::Unknown
    } else {
        Decision::True
    }
}
