//! Expression simplifier (spec.md §4.C): peephole constant-folding,
//! identity elimination, and a handful of projection rules over `dim`/`slice`.
//!
//! Simplification never changes the *meaning* of an expression, only its
//! representation — it is always sound to skip a rule.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::expr::{Constraint, ConstraintKind, NumBinOp, NumConst, NumExpr, Operand, ShapeExpr};
use crate::range::NumRange;

/// A cache of resolved `Shape`-symbol definitions, keyed by symbol id and
/// consulted by [`simplify_shape`] when a shape symbol's concrete value is
/// already known (spec.md §4.C, "symbol-shape resolution via shapeCache").
pub type ShapeCache = FxHashMap<u64, Arc<ShapeExpr>>;

/// A cache of symbol ranges, keyed by symbol id, consulted by
/// [`simplify_num`] to specialize a symbol whose range is a single point to
/// the constant it pins down (spec.md §4.C, "consults the constraint set to
/// specialize symbols whose range is a single point").
pub type RangeCache = FxHashMap<u64, NumRange>;

/// Fold constants and eliminate identities in a numeric expression.
///
/// `ranges` lets a `Symbol` leaf whose cached range is a single point
/// specialize to that point's constant.
#[must_use]
pub fn simplify_num(expr: &Arc<NumExpr>, ranges: &RangeCache) -> Arc<NumExpr> {
    match expr.as_ref() {
        NumExpr::Const(_) => Arc::clone(expr),
        NumExpr::Symbol(s) => {
            if let Some(range) = ranges.get(&s.id()) {
                if let Some(n) = range.is_const_int() {
                    return Arc::new(NumExpr::int(n));
                }
                if let Some(v) = range.is_const() {
                    return Arc::new(NumExpr::float(v));
                }
            }
            Arc::clone(expr)
        }
        NumExpr::Neg(e) => {
            let e = simplify_num(e, ranges);
            match e.as_ref() {
                NumExpr::Const(NumConst::Int(n)) => Arc::new(NumExpr::int(-n)),
                NumExpr::Const(NumConst::Float(x)) => Arc::new(NumExpr::float(-x.into_inner())),
                NumExpr::Neg(inner) => Arc::clone(inner),
                _ => Arc::new(NumExpr::neg(e)),
            }
        }
        NumExpr::Ceil(e) => fold_unary(e, ranges, NumExpr::Ceil, f64::ceil, |n| n),
        NumExpr::Floor(e) => fold_unary(e, ranges, NumExpr::Floor, f64::floor, |n| n),
        NumExpr::Abs(e) => fold_unary(e, ranges, NumExpr::Abs, f64::abs, i64::abs),
        NumExpr::Binary(op, l, r) => simplify_binary(*op, l, r, ranges),
        NumExpr::Reduce(op, items) => {
            let items: Vec<Arc<NumExpr>> = items.iter().map(|e| simplify_num(e, ranges)).collect();
            Arc::new(NumExpr::Reduce(*op, items))
        }
        NumExpr::DimIndex(shape, i) => {
            let shape = simplify_shape(shape, &ShapeCache::default(), ranges);
            let i = simplify_num(i, ranges);
            simplify_dim_index(&shape, &i)
        }
        NumExpr::Numel(shape) => {
            let shape = simplify_shape(shape, &ShapeCache::default(), ranges);
            Arc::new(NumExpr::numel(shape))
        }
    }
}

fn fold_unary(
    e: &Arc<NumExpr>,
    ranges: &RangeCache,
    rebuild: fn(Arc<NumExpr>) -> NumExpr,
    float_op: fn(f64) -> f64,
    int_op: fn(i64) -> i64,
) -> Arc<NumExpr> {
    let e = simplify_num(e, ranges);
    match e.as_ref() {
        NumExpr::Const(NumConst::Int(n)) => Arc::new(NumExpr::int(int_op(*n))),
        NumExpr::Const(NumConst::Float(x)) => Arc::new(NumExpr::float(float_op(x.into_inner()))),
        _ => Arc::new(rebuild(e)),
    }
}

fn simplify_binary(op: NumBinOp, l: &Arc<NumExpr>, r: &Arc<NumExpr>, ranges: &RangeCache) -> Arc<NumExpr> {
    let l = simplify_num(l, ranges);
    let r = simplify_num(r, ranges);

    if let (NumExpr::Const(lc), NumExpr::Const(rc)) = (l.as_ref(), r.as_ref()) {
        if let Some(folded) = fold_const_binary(op, *lc, *rc) {
            return Arc::new(NumExpr::Const(folded));
        }
    }

    match op {
        NumBinOp::Add => {
            if is_zero(&l) {
                return r;
            }
            if is_zero(&r) {
                return l;
            }
        }
        NumBinOp::Sub => {
            if is_zero(&r) {
                return l;
            }
        }
        NumBinOp::Mul => {
            if is_one(&l) {
                return r;
            }
            if is_one(&r) {
                return l;
            }
            if is_zero(&l) || is_zero(&r) {
                return Arc::new(NumExpr::int(0));
            }
        }
        NumBinOp::TrueDiv | NumBinOp::FloorDiv => {
            if is_one(&r) {
                return l;
            }
        }
        NumBinOp::Mod => {}
    }

    Arc::new(NumExpr::Binary(op, l, r))
}

fn fold_const_binary(op: NumBinOp, l: NumConst, r: NumConst) -> Option<NumConst> {
    use NumConst::{Float, Int};
    match (l, r) {
        (Int(a), Int(b)) => match op {
            NumBinOp::Add => Some(Int(a.checked_add(b)?)),
            NumBinOp::Sub => Some(Int(a.checked_sub(b)?)),
            NumBinOp::Mul => Some(Int(a.checked_mul(b)?)),
            NumBinOp::TrueDiv => {
                if b == 0 {
                    None
                } else {
                    #[allow(clippy::cast_precision_loss, reason = "exact division result")]
                    let quotient = a as f64 / b as f64;
                    Some(Float(ordered_float::OrderedFloat(quotient)))
                }
            }
            NumBinOp::FloorDiv => {
                if b == 0 {
                    None
                } else {
                    let q = a / b;
                    let rem = a % b;
                    let q = if rem != 0 && (rem < 0) != (b < 0) { q - 1 } else { q };
                    Some(Int(q))
                }
            }
            NumBinOp::Mod => {
                if b == 0 {
                    None
                } else {
                    let rem = a % b;
                    let rem = if rem != 0 && (rem < 0) != (b < 0) { rem + b } else { rem };
                    Some(Int(rem))
                }
            }
        },
        (a, b) => {
            let a = to_f64(a);
            let b = to_f64(b);
            let v = match op {
                NumBinOp::Add => a + b,
                NumBinOp::Sub => a - b,
                NumBinOp::Mul => a * b,
                NumBinOp::TrueDiv => {
                    if b == 0.0 {
                        return None;
                    }
                    a / b
                }
                NumBinOp::FloorDiv => {
                    if b == 0.0 {
                        return None;
                    }
                    (a / b).floor()
                }
                NumBinOp::Mod => {
                    if b == 0.0 {
                        return None;
                    }
                    let rem = a.rem_euclid(b.abs());
                    if rem != 0.0 && b < 0.0 { rem - b.abs() } else { rem }
                }
            };
            Some(Float(ordered_float::OrderedFloat(v)))
        }
    }
}

fn to_f64(c: NumConst) -> f64 {
    match c {
        NumConst::Int(n) => {
            #[allow(clippy::cast_precision_loss, reason = "widening for mixed-kind folding")]
            let v = n as f64;
            v
        }
        NumConst::Float(x) => x.into_inner(),
    }
}

fn is_zero(e: &NumExpr) -> bool {
    match e {
        NumExpr::Const(NumConst::Int(0)) => true,
        NumExpr::Const(NumConst::Float(x)) => x.into_inner() == 0.0,
        _ => false,
    }
}

fn is_one(e: &NumExpr) -> bool {
    match e {
        NumExpr::Const(NumConst::Int(1)) => true,
        NumExpr::Const(NumConst::Float(x)) => x.into_inner() == 1.0,
        _ => false,
    }
}

/// Simplify a shape expression, resolving `Shape` symbols found in `cache`
/// and consulting `ranges` to specialize numeric sub-expressions whose range
/// is a single point.
#[must_use]
pub fn simplify_shape(expr: &Arc<ShapeExpr>, cache: &ShapeCache, ranges: &RangeCache) -> Arc<ShapeExpr> {
    match expr.as_ref() {
        ShapeExpr::Const(dims) => {
            let dims: Vec<Arc<NumExpr>> = dims.iter().map(|d| simplify_num(d, ranges)).collect();
            Arc::new(ShapeExpr::Const(dims))
        }
        ShapeExpr::Symbol(sym) => {
            if let Some(resolved) = cache.get(&sym.id()) {
                return simplify_shape(resolved, cache, ranges);
            }
            Arc::clone(expr)
        }
        ShapeExpr::Set(base, axis, new_dim) => {
            let base = simplify_shape(base, cache, ranges);
            let axis = simplify_num(axis, ranges);
            let new_dim = simplify_num(new_dim, ranges);
            if let (ShapeExpr::Const(dims), NumExpr::Const(NumConst::Int(i))) =
                (base.as_ref(), axis.as_ref())
            {
                if let Ok(idx) = usize::try_from(*i) {
                    if idx < dims.len() {
                        let mut dims = dims.clone();
                        dims[idx] = new_dim;
                        return Arc::new(ShapeExpr::Const(dims));
                    }
                }
            }
            Arc::new(ShapeExpr::Set(base, axis, new_dim))
        }
        ShapeExpr::Slice(base, start, end) => {
            let base = simplify_shape(base, cache, ranges);
            let start = simplify_num(start, ranges);
            let end = simplify_num(end, ranges);
            if let (
                ShapeExpr::Const(dims),
                NumExpr::Const(NumConst::Int(s)),
                NumExpr::Const(NumConst::Int(e)),
            ) = (base.as_ref(), start.as_ref(), end.as_ref())
            {
                if let (Some(s), Some(e)) = (
                    crate::expr::resolve_index(*s, dims.len()),
                    crate::expr::resolve_index(*e, dims.len()),
                ) {
                    if s <= e {
                        return Arc::new(ShapeExpr::Const(dims[s..e].to_vec()));
                    }
                }
            }
            Arc::new(ShapeExpr::Slice(base, start, end))
        }
        ShapeExpr::Concat(l, r) => {
            let l = simplify_shape(l, cache, ranges);
            let r = simplify_shape(r, cache, ranges);
            if let (ShapeExpr::Const(ld), ShapeExpr::Const(rd)) = (l.as_ref(), r.as_ref()) {
                let mut dims = ld.clone();
                dims.extend(rd.iter().cloned());
                return Arc::new(ShapeExpr::Const(dims));
            }
            Arc::new(ShapeExpr::Concat(l, r))
        }
        ShapeExpr::Broadcast(l, r) => {
            let l = simplify_shape(l, cache, ranges);
            let r = simplify_shape(r, cache, ranges);
            Arc::new(ShapeExpr::Broadcast(l, r))
        }
    }
}

/// `dim(set(base, axis, d), i)` projects to `d` when `axis` is structurally
/// equal to `i`; `dim(const-shape, const-i)` projects directly to the
/// indexed dimension (spec.md §4.C).
fn simplify_dim_index(shape: &Arc<ShapeExpr>, index: &Arc<NumExpr>) -> Arc<NumExpr> {
    if let ShapeExpr::Set(base, axis, new_dim) = shape.as_ref() {
        if axis.is_structurally_eq(index.as_ref()) {
            return Arc::clone(new_dim);
        }
        return simplify_dim_index(base, index);
    }
    if let (ShapeExpr::Const(dims), NumExpr::Const(NumConst::Int(i))) = (shape.as_ref(), index.as_ref()) {
        if let Some(idx) = crate::expr::resolve_index(*i, dims.len()) {
            if idx < dims.len() {
                return Arc::clone(&dims[idx]);
            }
        }
    }
    Arc::new(NumExpr::dim(Arc::clone(shape), Arc::clone(index)))
}

fn simplify_operand(op: &Operand, cache: &ShapeCache, ranges: &RangeCache) -> Operand {
    match op {
        Operand::Num(e) => Operand::Num(simplify_num(e, ranges)),
        Operand::Shape(e) => Operand::Shape(simplify_shape(e, cache, ranges)),
        Operand::Bool(_) | Operand::String(_) => op.clone(),
    }
}

/// Rebuild a constraint's sub-expressions in simplified form, keeping its
/// `id` and `source` (spec.md §4.E, `getConstraints()`). `Forall`/`And`/`Or`/
/// `Not` recurse into their child constraints; `Fail` has nothing to fold.
/// `shape_cache` resolves `Shape` symbols (spec.md §4.C's `shapeCache`);
/// `ranges` specializes `Num` symbols whose range is a single point.
#[must_use]
pub fn simplify_constraint(c: &Constraint, shape_cache: &ShapeCache, ranges: &RangeCache) -> Constraint {
    let kind = match c.kind() {
        ConstraintKind::ExpBool(_) | ConstraintKind::Fail(_) => return c.clone(),
        ConstraintKind::Eq(l, r) => ConstraintKind::Eq(
            simplify_operand(l, shape_cache, ranges),
            simplify_operand(r, shape_cache, ranges),
        ),
        ConstraintKind::NotEq(l, r) => ConstraintKind::NotEq(
            simplify_operand(l, shape_cache, ranges),
            simplify_operand(r, shape_cache, ranges),
        ),
        ConstraintKind::Lt(l, r) => ConstraintKind::Lt(simplify_num(l, ranges), simplify_num(r, ranges)),
        ConstraintKind::Le(l, r) => ConstraintKind::Le(simplify_num(l, ranges), simplify_num(r, ranges)),
        ConstraintKind::And(l, r) => ConstraintKind::And(
            Arc::new(simplify_constraint(l, shape_cache, ranges)),
            Arc::new(simplify_constraint(r, shape_cache, ranges)),
        ),
        ConstraintKind::Or(l, r) => ConstraintKind::Or(
            Arc::new(simplify_constraint(l, shape_cache, ranges)),
            Arc::new(simplify_constraint(r, shape_cache, ranges)),
        ),
        ConstraintKind::Not(inner) => ConstraintKind::Not(Arc::new(simplify_constraint(inner, shape_cache, ranges))),
        ConstraintKind::Broadcastable(l, r) => ConstraintKind::Broadcastable(
            simplify_shape(l, shape_cache, ranges),
            simplify_shape(r, shape_cache, ranges),
        ),
        ConstraintKind::Forall { symbol, lo, hi, body } => ConstraintKind::Forall {
            symbol: symbol.clone(),
            lo: simplify_num(lo, ranges),
            hi: simplify_num(hi, ranges),
            body: Arc::new(simplify_constraint(body, shape_cache, ranges)),
        },
    };
    c.with_kind(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_folding_add_mul() {
        let e = NumExpr::mul(
            NumExpr::add(NumExpr::int(2).arc(), NumExpr::int(3).arc()).arc(),
            NumExpr::int(4).arc(),
        )
        .arc();
        assert_eq!(simplify_num(&e, &RangeCache::default()).as_ref(), &NumExpr::int(20));
    }

    #[test]
    fn add_zero_identity_elided() {
        let x = NumExpr::int(7).arc();
        let e = NumExpr::add(Arc::clone(&x), NumExpr::int(0).arc()).arc();
        assert_eq!(simplify_num(&e, &RangeCache::default()), x);
    }

    #[test]
    fn mul_by_zero_collapses() {
        let e = NumExpr::mul(NumExpr::int(9).arc(), NumExpr::int(0).arc()).arc();
        assert_eq!(simplify_num(&e, &RangeCache::default()).as_ref(), &NumExpr::int(0));
    }

    #[test]
    fn symbol_with_single_point_int_range_specializes_to_exact_constant() {
        use crate::id::IdManager;
        use crate::range::IntRange;
        use crate::symbol::{Symbol, SymbolKind};

        let mgr = IdManager::new();
        let sym = Symbol::new(&mgr, SymbolKind::Int, "n", None);
        let mut ranges = RangeCache::default();
        ranges.insert(sym.id(), NumRange::Int(IntRange::from_const(5)));
        let e = NumExpr::add(NumExpr::symbol(sym).arc(), NumExpr::int(1).arc()).arc();
        assert_eq!(simplify_num(&e, &ranges).as_ref(), &NumExpr::int(6));
    }

    #[test]
    fn symbol_with_single_point_float_range_specializes_without_widening_int_ranges() {
        use crate::id::IdManager;
        use crate::range::FloatRange;
        use crate::symbol::{Symbol, SymbolKind};

        let mgr = IdManager::new();
        let sym = Symbol::new(&mgr, SymbolKind::Float, "x", None);
        let mut ranges = RangeCache::default();
        ranges.insert(sym.id(), NumRange::Float(FloatRange::from_const(2.5)));
        let e = NumExpr::symbol(sym).arc();
        assert_eq!(simplify_num(&e, &ranges).as_ref(), &NumExpr::float(2.5));
    }

    #[test]
    fn dim_projects_through_const_shape() {
        let shape = ShapeExpr::konst(vec![NumExpr::int(3).arc(), NumExpr::int(4).arc()]).arc();
        let e = NumExpr::dim(shape, NumExpr::int(1).arc()).arc();
        assert_eq!(simplify_num(&e, &RangeCache::default()).as_ref(), &NumExpr::int(4));
    }

    #[test]
    fn dim_projects_through_matching_set() {
        let base = ShapeExpr::konst(vec![NumExpr::int(3).arc(), NumExpr::int(4).arc()]).arc();
        let shape = ShapeExpr::set(base, NumExpr::int(0).arc(), NumExpr::int(99).arc()).arc();
        let e = NumExpr::dim(shape, NumExpr::int(0).arc()).arc();
        assert_eq!(simplify_num(&e, &RangeCache::default()).as_ref(), &NumExpr::int(99));
    }

    #[test]
    fn concat_of_const_shapes_folds() {
        let l = ShapeExpr::konst(vec![NumExpr::int(1).arc()]).arc();
        let r = ShapeExpr::konst(vec![NumExpr::int(2).arc()]).arc();
        let cat = ShapeExpr::concat(l, r).arc();
        let simplified = simplify_shape(&cat, &ShapeCache::default(), &RangeCache::default());
        assert_eq!(
            simplified.as_ref(),
            &ShapeExpr::konst(vec![NumExpr::int(1).arc(), NumExpr::int(2).arc()])
        );
    }

    #[test]
    fn simplify_constraint_folds_nested_num_exprs_preserving_id() {
        use crate::id::IdManager;

        let mgr = IdManager::new();
        let l = NumExpr::add(NumExpr::int(2).arc(), NumExpr::int(3).arc()).arc();
        let r = NumExpr::int(5).arc();
        let c = Constraint::new(&mgr, ConstraintKind::Lt(l, r), None);
        let simplified = simplify_constraint(&c, &ShapeCache::default(), &RangeCache::default());
        assert_eq!(simplified.id(), c.id());
        match simplified.kind() {
            ConstraintKind::Lt(l, _) => assert_eq!(l.as_ref(), &NumExpr::int(5)),
            _ => panic!("expected Lt"),
        }
    }
}
