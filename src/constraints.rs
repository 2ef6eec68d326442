//! The constraint set snapshot (spec.md §4.E) — a copy-on-write container
//! of pooled constraints, partitioned into hard/soft/path, with caches that
//! narrow monotonically as hard/path constraints are installed.

use std::sync::Arc;

use rpds::{HashTrieMap, HashTrieSet, Vector};

use crate::decide::{check_immediate, Decision, DecisionContext};
use crate::error::ShapeCtrError;
use crate::expr::{
    BoolExpr, Constraint, ConstraintKind, NumExpr, Operand, ShapeExpr, StringExpr,
};
use crate::id::IdManager;
use crate::loc::SourceLoc;
use crate::range::{IntRange, NumRange};
use crate::simplify::{
    simplify_constraint, simplify_shape, RangeCache as SimplifyRangeCache, ShapeCache as SimplifyShapeCache,
};
use crate::symbol::{Symbol, SymbolKind};

type RangeCache = HashTrieMap<u64, NumRange>;
type ShapeDimCache = HashTrieMap<u64, Vector<Arc<NumExpr>>>;
type StringCache = HashTrieMap<u64, Arc<str>>;
type NonStringCache = HashTrieMap<u64, HashTrieSet<Arc<str>>>;
type IdSet = HashTrieSet<u64>;

/// The three partitions a constraint can belong to (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// Asserted fact; narrows caches.
    Hard,
    /// User obligation; never narrows.
    Soft,
    /// Branch predicate; narrows like hard.
    Path,
}

/// Whether the engine's global immediate-check switch is enabled (spec.md
/// §4.D, "external service layer"). Builder-style like the teacher's
/// `with_max_iterations` configuration knobs.
#[derive(Debug, Clone, Copy)]
pub struct ImmediateCheckConfig {
    enabled: bool,
}

impl Default for ImmediateCheckConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ImmediateCheckConfig {
    /// Default config: immediate checking enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self { enabled: true }
    }

    /// Toggle immediate checking.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether immediate checking is enabled.
    #[must_use]
    pub const fn enabled(self) -> bool {
        self.enabled
    }
}

/// An immutable constraint-set value. Cloning is `O(1)` (it copies a
/// handful of persistent-container handles); every mutator returns a new
/// `ConstraintSet` and leaves `self` untouched (spec.md Invariant 5).
#[derive(Clone)]
pub struct ConstraintSet {
    ids: IdManager,
    config: ImmediateCheckConfig,
    pool: Vector<Arc<Constraint>>,
    hard_idx: Vector<usize>,
    soft_idx: Vector<usize>,
    path_idx: Vector<usize>,
    ctr_id_cache: IdSet,
    range_cache: RangeCache,
    shape_cache: ShapeDimCache,
    string_cache: StringCache,
    non_string_cache: NonStringCache,
    valid: Option<bool>,
}

impl ConstraintSet {
    /// The empty root snapshot (spec.md §3, "Lifecycle").
    #[must_use]
    pub fn root() -> Self {
        Self::with_config(IdManager::new(), ImmediateCheckConfig::new())
    }

    /// A root snapshot sharing an existing id-manager, e.g. when the
    /// interpreter has already minted symbols elsewhere.
    #[must_use]
    pub fn with_config(ids: IdManager, config: ImmediateCheckConfig) -> Self {
        Self {
            ids,
            config,
            pool: Vector::new(),
            hard_idx: Vector::new(),
            soft_idx: Vector::new(),
            path_idx: Vector::new(),
            ctr_id_cache: IdSet::new(),
            range_cache: RangeCache::new(),
            shape_cache: ShapeDimCache::new(),
            string_cache: StringCache::new(),
            non_string_cache: NonStringCache::new(),
            valid: None,
        }
    }

    /// The id-manager backing this snapshot and all of its descendants.
    #[must_use]
    pub const fn ids(&self) -> &IdManager {
        &self.ids
    }

    /// `true` unless a contradiction has been detected; `undef` (here
    /// `None`) before any installer has run, per the tri-state in spec.md §3.
    #[must_use]
    pub const fn valid(&self) -> Option<bool> {
        self.valid
    }

    /// `count()` — the pool size (spec.md §6).
    #[must_use]
    pub fn count(&self) -> usize {
        self.pool.len()
    }

    // ---- symbol minters (spec.md §6) ----------------------------------

    /// `genSymInt`.
    #[must_use]
    pub fn gen_sym_int(&self, name: impl Into<Arc<str>>, source: Option<SourceLoc>) -> Symbol {
        Symbol::new(&self.ids, SymbolKind::Int, name, source)
    }

    /// `genSymFloat`.
    #[must_use]
    pub fn gen_sym_float(&self, name: impl Into<Arc<str>>, source: Option<SourceLoc>) -> Symbol {
        Symbol::new(&self.ids, SymbolKind::Float, name, source)
    }

    /// `genSymBool`.
    #[must_use]
    pub fn gen_sym_bool(&self, name: impl Into<Arc<str>>, source: Option<SourceLoc>) -> Symbol {
        Symbol::new(&self.ids, SymbolKind::Bool, name, source)
    }

    /// `genSymString`.
    #[must_use]
    pub fn gen_sym_string(&self, name: impl Into<Arc<str>>, source: Option<SourceLoc>) -> Symbol {
        Symbol::new(&self.ids, SymbolKind::String, name, source)
    }

    /// `genSymShape`, given an already-built rank expression.
    #[must_use]
    pub fn gen_sym_shape(
        &self,
        name: impl Into<Arc<str>>,
        source: Option<SourceLoc>,
        rank: Arc<NumExpr>,
    ) -> Symbol {
        Symbol::new_shape(&self.ids, name, source, rank)
    }

    // ---- constrained minters (spec.md §4.E) ----------------------------

    /// `genSymIntGte(name, k)`: mint a symbol, `guarantee(k <= sym)`.
    #[must_use]
    pub fn gen_sym_int_gte(&self, name: impl Into<Arc<str>>, k: i64) -> (Symbol, Self) {
        let sym = self.gen_sym_int(name, None);
        let c = self.gen_num_compare(
            Arc::new(NumExpr::int(k)),
            Arc::new(NumExpr::symbol(sym.clone())),
            true,
        );
        (sym, self.guarantee(&c))
    }

    /// `genSymFloatGte(name, k)`.
    #[must_use]
    pub fn gen_sym_float_gte(&self, name: impl Into<Arc<str>>, k: f64) -> (Symbol, Self) {
        let sym = self.gen_sym_float(name, None);
        let c = self.gen_num_compare(
            Arc::new(NumExpr::float(k)),
            Arc::new(NumExpr::symbol(sym.clone())),
            true,
        );
        (sym, self.guarantee(&c))
    }

    /// `genShaped(name, rank, dims?)` — spec.md §4.E. `dims = None` mints
    /// `rank` fresh non-negative `Int` symbols; `dims = Some(..)` lifts the
    /// given numbers to constants with no new symbols. A negative `rank` is
    /// unconditionally a usage error, per spec.md §7, regardless of whether
    /// `dims` is given.
    pub fn gen_shaped(
        &self,
        name: impl Into<Arc<str>>,
        rank: i64,
        dims: Option<Vec<i64>>,
    ) -> Result<(Arc<ShapeExpr>, Self), ShapeCtrError> {
        if rank < 0 {
            return Err(ShapeCtrError::NegativeRank { rank });
        }
        let name = name.into();
        if let Some(dims) = dims {
            let dims: Vec<Arc<NumExpr>> = dims.into_iter().map(|d| Arc::new(NumExpr::int(d))).collect();
            return Ok((Arc::new(ShapeExpr::Const(dims)), self.clone()));
        }
        let mut set = self.clone();
        let mut dims = Vec::with_capacity(usize::try_from(rank).unwrap_or(0));
        for i in 0..rank {
            let dim_name = format!("{name}#{i}");
            let (sym, next) = set.gen_sym_int_gte(dim_name, 0);
            dims.push(Arc::new(NumExpr::symbol(sym)));
            set = next;
        }
        Ok((Arc::new(ShapeExpr::Const(dims)), set))
    }

    /// `castBoolToInt(e)` — constant-fold when possible, else mint a fresh
    /// `Int` symbol `n` and `guarantee((e && n=1) || (!e && n=0))`.
    #[must_use]
    pub fn cast_bool_to_int(&self, e: Arc<BoolExpr>) -> (Arc<NumExpr>, Self) {
        if let BoolExpr::Const(b) = e.as_ref() {
            let n = i64::from(*b);
            return (Arc::new(NumExpr::int(n)), self.clone());
        }
        let sym = self.gen_sym_int("castBoolToInt", None);
        let n = Arc::new(NumExpr::symbol(sym.clone()));
        let eq1 = self.gen_equality(
            Operand::Num(Arc::clone(&n)),
            Operand::Num(Arc::new(NumExpr::int(1))),
        );
        let eq0 = self.gen_equality(Operand::Num(Arc::clone(&n)), Operand::Num(Arc::new(NumExpr::int(0))));
        let e_true = self.gen_from_bool(e);
        let e_false = self.gen_not(Arc::new(e_true.clone()));
        let lhs = self.gen_and(Arc::new(e_true), Arc::new(eq1));
        let rhs = self.gen_and(Arc::new(e_false), Arc::new(eq0));
        let whole = self.gen_or(Arc::new(lhs), Arc::new(rhs));
        (n, self.guarantee(&whole))
    }

    /// `castNumToBool(e)` — by range if decidable, else mint a fresh `Bool`
    /// symbol and `guarantee((b && e!=0) || (!b && e=0))`.
    #[must_use]
    pub fn cast_num_to_bool(&self, e: Arc<NumExpr>) -> (Arc<BoolExpr>, Self) {
        if let Some(range) = self.get_cached_range(&e) {
            if let Some(c) = range.is_const() {
                return (Arc::new(BoolExpr::Const(c != 0.0)), self.clone());
            }
        }
        let sym = self.gen_sym_bool("castNumToBool", None);
        let b = Arc::new(BoolExpr::symbol(sym.clone()));
        let zero = Arc::new(NumExpr::int(0));
        let ne = self.gen_not_eq(Operand::Num(Arc::clone(&e)), Operand::Num(Arc::clone(&zero)));
        let eq = self.gen_equality(Operand::Num(e), Operand::Num(zero));
        let b_true = self.gen_from_bool(Arc::clone(&b));
        let b_false = self.gen_not(Arc::new(b_true.clone()));
        let lhs = self.gen_and(Arc::new(b_true), Arc::new(ne));
        let rhs = self.gen_and(Arc::new(b_false), Arc::new(eq));
        let whole = self.gen_or(Arc::new(lhs), Arc::new(rhs));
        (b, self.guarantee(&whole))
    }

    // ---- constraint factories, pure (spec.md §6) -----------------------

    /// Lift a boolean expression to a constraint asserting it is true.
    #[must_use]
    pub fn gen_from_bool(&self, e: Arc<BoolExpr>) -> Constraint {
        Constraint::new(&self.ids, ConstraintKind::ExpBool(e), None)
    }

    /// `l == r`, for any pair of operands of the same result kind.
    #[must_use]
    pub fn gen_equality(&self, l: Operand, r: Operand) -> Constraint {
        Constraint::new(&self.ids, ConstraintKind::Eq(l, r), None)
    }

    /// `l != r`, for any pair of operands of the same result kind.
    #[must_use]
    pub fn gen_not_eq(&self, l: Operand, r: Operand) -> Constraint {
        Constraint::new(&self.ids, ConstraintKind::NotEq(l, r), None)
    }

    /// `genNumCompare(l, r, orEqual)` — `orEqual` selects `Le` over `Lt`.
    #[must_use]
    pub fn gen_num_compare(&self, l: Arc<NumExpr>, r: Arc<NumExpr>, or_equal: bool) -> Constraint {
        let kind = if or_equal {
            ConstraintKind::Le(l, r)
        } else {
            ConstraintKind::Lt(l, r)
        };
        Constraint::new(&self.ids, kind, None)
    }

    /// Logical conjunction of two constraints.
    #[must_use]
    pub fn gen_and(&self, l: Arc<Constraint>, r: Arc<Constraint>) -> Constraint {
        Constraint::new(&self.ids, ConstraintKind::And(l, r), None)
    }

    /// Logical disjunction of two constraints.
    #[must_use]
    pub fn gen_or(&self, l: Arc<Constraint>, r: Arc<Constraint>) -> Constraint {
        Constraint::new(&self.ids, ConstraintKind::Or(l, r), None)
    }

    /// Logical negation of a constraint.
    #[must_use]
    pub fn gen_not(&self, c: Arc<Constraint>) -> Constraint {
        Constraint::new(&self.ids, ConstraintKind::Not(c), None)
    }

    /// `l` and `r` are broadcast-compatible shapes.
    #[must_use]
    pub fn gen_broad(&self, l: Arc<ShapeExpr>, r: Arc<ShapeExpr>) -> Constraint {
        Constraint::new(&self.ids, ConstraintKind::Broadcastable(l, r), None)
    }

    /// `body` holds for every value of `symbol` in `[lo, hi)`.
    #[must_use]
    pub fn gen_forall(&self, symbol: Symbol, lo: Arc<NumExpr>, hi: Arc<NumExpr>, body: Arc<Constraint>) -> Constraint {
        Constraint::new(&self.ids, ConstraintKind::Forall { symbol, lo, hi, body }, None)
    }

    /// An unconditionally-false constraint carrying a diagnostic reason.
    #[must_use]
    pub fn gen_fail(&self, reason: impl Into<Arc<str>>) -> Constraint {
        Constraint::new(&self.ids, ConstraintKind::Fail(reason.into()), None)
    }

    // ---- installers (spec.md §4.E) -------------------------------------

    /// `require(c)`: soft installer. Never narrows caches — a soft
    /// constraint is an obligation on the caller, not a fact the engine
    /// vouches for.
    #[must_use]
    pub fn require(&self, c: &Constraint) -> Self {
        self.install(c, Partition::Soft)
    }

    /// `guarantee(c)`: hard installer; narrows caches via the propagator.
    #[must_use]
    pub fn guarantee(&self, c: &Constraint) -> Self {
        self.install(c, Partition::Hard)
    }

    /// `addIf(c)`: path installer; narrows like `guarantee` but tagged
    /// `pathIdx`.
    #[must_use]
    pub fn add_if(&self, c: &Constraint) -> Self {
        self.install(c, Partition::Path)
    }

    /// Left-fold `require` over `cs`.
    #[must_use]
    pub fn require_all<'a>(&self, cs: impl IntoIterator<Item = &'a Constraint>) -> Self {
        cs.into_iter().fold(self.clone(), |s, c| s.require(c))
    }

    /// Left-fold `guarantee` over `cs`.
    #[must_use]
    pub fn guarantee_all<'a>(&self, cs: impl IntoIterator<Item = &'a Constraint>) -> Self {
        cs.into_iter().fold(self.clone(), |s, c| s.guarantee(c))
    }

    /// Left-fold `addIf` over `cs`.
    #[must_use]
    pub fn add_if_all<'a>(&self, cs: impl IntoIterator<Item = &'a Constraint>) -> Self {
        cs.into_iter().fold(self.clone(), |s, c| s.add_if(c))
    }

    fn install(&self, c: &Constraint, partition: Partition) -> Self {
        debug_assert!(self.ids.same_manager_as(c.ids()), "{}", ShapeCtrError::ForeignIdManager);
        if self.ctr_id_cache.contains(&c.id()) {
            return self.clone();
        }

        let decision = check_immediate(self, c, self.config.enabled());
        if decision == Decision::True {
            // Trivially-true constraints are dropped (Invariant 3).
            let mut next = self.clone();
            next.ctr_id_cache = next.ctr_id_cache.insert(c.id());
            return next;
        }

        let mut next = self.clone();
        let idx = next.pool.len();
        next.pool.push_back_mut(Arc::new(c.clone()));
        next.ctr_id_cache = next.ctr_id_cache.insert(c.id());
        match partition {
            Partition::Hard => next.hard_idx.push_back_mut(idx),
            Partition::Soft => next.soft_idx.push_back_mut(idx),
            Partition::Path => next.path_idx.push_back_mut(idx),
        }

        if decision == Decision::False {
            next.valid = Some(false);
        }

        if matches!(partition, Partition::Hard | Partition::Path) && decision != Decision::True {
            next = next.narrow_from(c);
        }

        next
    }

    fn narrow_from(&self, c: &Constraint) -> Self {
        let mut next = self.clone();
        for n in crate::propagate::propagate(c) {
            match n {
                crate::propagate::Narrowing::Range { symbol, range } => {
                    let merged = match next.range_cache.get(&symbol.id()) {
                        Some(existing) => existing.intersect(&range),
                        None => range,
                    };
                    if !merged.valid() {
                        next.valid = Some(false);
                    }
                    next.range_cache = next.range_cache.insert(symbol.id(), merged);
                }
                crate::propagate::Narrowing::String { symbol, value } => {
                    if let Some(forbidden) = next.non_string_cache.get(&symbol.id()) {
                        if forbidden.contains(&value) {
                            next.valid = Some(false);
                        }
                    }
                    next.string_cache = next.string_cache.insert(symbol.id(), value);
                }
                crate::propagate::Narrowing::NonString { symbol, value } => {
                    let set = next
                        .non_string_cache
                        .get(&symbol.id())
                        .cloned()
                        .unwrap_or_else(HashTrieSet::new);
                    let set = set.insert(value);
                    next.non_string_cache = next.non_string_cache.insert(symbol.id(), set);
                }
                crate::propagate::Narrowing::Shape { symbol, dims } => {
                    let v: Vector<Arc<NumExpr>> = dims.into_iter().collect();
                    next.shape_cache = next.shape_cache.insert(symbol.id(), v);
                }
            }
        }
        next
    }

    // ---- queries (spec.md §4.E) -----------------------------------------

    /// `getCachedRange(numExp)`.
    #[must_use]
    pub fn get_cached_range(&self, expr: &NumExpr) -> Option<NumRange> {
        DecisionContext::range_of(self, expr)
    }

    /// `getCachedShape(shapeExp)`.
    #[must_use]
    pub fn get_cached_shape(&self, expr: &ShapeExpr) -> Option<Vec<Arc<NumExpr>>> {
        DecisionContext::shape_of(self, expr)
    }

    /// `getCachedString(exp)`.
    #[must_use]
    pub fn get_cached_string(&self, expr: &StringExpr) -> Option<Arc<str>> {
        DecisionContext::string_of(self, expr)
    }

    /// `checkNonString(exp, s)`.
    #[must_use]
    pub fn check_non_string(&self, expr: &StringExpr, s: &str) -> bool {
        DecisionContext::known_unequal_string(self, expr, s)
    }

    /// `getSymbolRange(sym)` — raw cache lookup, no composition.
    #[must_use]
    pub fn get_symbol_range(&self, sym: &Symbol) -> Option<NumRange> {
        self.range_cache.get(&sym.id()).copied()
    }

    /// `checkImmediate(c)`.
    #[must_use]
    pub fn check_immediate(&self, c: &Constraint) -> Decision {
        check_immediate(self, c, self.config.enabled())
    }

    /// `hasSingleVar` over a constraint.
    #[must_use]
    pub fn has_single_var(&self, c: &Constraint) -> Option<Symbol> {
        c.single_var()
    }

    /// Simplified snapshots of the pool, per `getConstraints()`. Each
    /// returned constraint keeps its pool `id`/`source` but has its
    /// sub-expressions folded by [`crate::simplify`], consulting this
    /// snapshot's shape and range caches to specialize symbols.
    #[must_use]
    pub fn get_constraints(&self) -> Vec<Arc<Constraint>> {
        let shapes = self.shape_cache_as_simplify_cache();
        let ranges = self.range_cache_as_simplify_cache();
        self.pool
            .iter()
            .map(|c| Arc::new(simplify_constraint(c, &shapes, &ranges)))
            .collect()
    }

    fn partition_constraints(&self, idx: &Vector<usize>) -> Vec<Arc<Constraint>> {
        let shapes = self.shape_cache_as_simplify_cache();
        let ranges = self.range_cache_as_simplify_cache();
        idx.iter()
            .filter_map(|&i| self.pool.get(i))
            .map(|c| Arc::new(simplify_constraint(c, &shapes, &ranges)))
            .collect()
    }

    /// The hard-partitioned subset of `getConstraints()`.
    #[must_use]
    pub fn hard_constraints(&self) -> Vec<Arc<Constraint>> {
        self.partition_constraints(&self.hard_idx)
    }

    /// The soft-partitioned subset of `getConstraints()`.
    #[must_use]
    pub fn soft_constraints(&self) -> Vec<Arc<Constraint>> {
        self.partition_constraints(&self.soft_idx)
    }

    /// The path-partitioned subset of `getConstraints()`.
    #[must_use]
    pub fn path_constraints(&self) -> Vec<Arc<Constraint>> {
        self.partition_constraints(&self.path_idx)
    }

    /// The not-yet-implemented `genFalsy` stub — spec.md Design Note:
    /// semantics unspecified upstream, left undefined on purpose.
    #[must_use]
    pub fn gen_falsy(&self, _value: &NumExpr) -> Option<Constraint> {
        None
    }

    /// Project `shape_cache` into the simplifier's cache shape, keyed the
    /// same way (symbol id). Consulted by [`Self::shape_of`]'s
    /// `Slice`/`Concat`/`Broadcast` branch and by [`Self::get_constraints`].
    fn shape_cache_as_simplify_cache(&self) -> SimplifyShapeCache {
        self.shape_cache
            .iter()
            .map(|(id, dims)| (*id, Arc::new(ShapeExpr::Const(dims.iter().cloned().collect()))))
            .collect()
    }

    /// Project `range_cache` into the simplifier's cache shape.
    fn range_cache_as_simplify_cache(&self) -> SimplifyRangeCache {
        self.range_cache.iter().map(|(id, r)| (*id, *r)).collect()
    }
}

impl DecisionContext for ConstraintSet {
    fn range_of(&self, expr: &NumExpr) -> Option<NumRange> {
        match expr {
            NumExpr::Const(c) => Some(match c {
                crate::expr::NumConst::Int(n) => NumRange::from_int(IntRange::from_const(*n)),
                crate::expr::NumConst::Float(x) => {
                    NumRange::Float(crate::range::FloatRange::from_const(x.into_inner()))
                }
            }),
            NumExpr::Symbol(s) => Some(self.range_cache.get(&s.id()).copied().unwrap_or_else(NumRange::top)),
            NumExpr::Neg(e) => self.range_of(e).map(|r| r.neg()),
            NumExpr::Ceil(e) => self.range_of(e).map(|r| r.ceil()),
            NumExpr::Floor(e) => self.range_of(e).map(|r| r.floor()),
            NumExpr::Abs(e) => self.range_of(e).map(|r| r.abs()),
            NumExpr::Binary(op, l, r) => {
                let l = self.range_of(l)?;
                let r = self.range_of(r)?;
                Some(match op {
                    crate::expr::NumBinOp::Add => l.add(&r),
                    crate::expr::NumBinOp::Sub => l.sub(&r),
                    crate::expr::NumBinOp::Mul => l.mul(&r),
                    crate::expr::NumBinOp::TrueDiv => l.truediv(&r),
                    crate::expr::NumBinOp::FloorDiv => l.floordiv(&r),
                    crate::expr::NumBinOp::Mod => l.modulo(&r),
                })
            }
            NumExpr::Reduce(op, items) => {
                let mut iter = items.iter();
                let first = self.range_of(iter.next()?)?;
                iter.try_fold(first, |acc, item| {
                    let r = self.range_of(item)?;
                    Some(match op {
                        crate::expr::NumReduceOp::Max => acc.max(&r),
                        crate::expr::NumReduceOp::Min => acc.min(&r),
                    })
                })
            }
            NumExpr::DimIndex(shape, i) => {
                let dims = self.shape_of(shape)?;
                let idx_range = self.range_of(i)?;
                let idx = idx_range.is_const_int()?;
                let idx = usize::try_from(idx).ok()?;
                let dim = dims.get(idx)?;
                self.range_of(dim)
            }
            NumExpr::Numel(shape) => {
                let dims = self.shape_of(shape)?;
                dims.iter()
                    .try_fold(NumRange::from_int(IntRange::from_const(1)), |acc, d| {
                        Some(acc.mul(&self.range_of(d)?))
                    })
            }
        }
    }

    fn shape_of(&self, expr: &ShapeExpr) -> Option<Vec<Arc<NumExpr>>> {
        match expr {
            ShapeExpr::Const(dims) => Some(dims.clone()),
            ShapeExpr::Symbol(s) => self.shape_cache.get(&s.id()).map(|v| v.iter().cloned().collect()),
            ShapeExpr::Set(base, axis, new_dim) => {
                let mut dims = self.shape_of(base)?;
                let axis_range = self.range_of(axis)?;
                let axis = usize::try_from(axis_range.is_const_int()?).ok()?;
                if axis >= dims.len() {
                    return None;
                }
                dims[axis] = Arc::clone(new_dim);
                Some(dims)
            }
            ShapeExpr::Slice(..) | ShapeExpr::Concat(..) | ShapeExpr::Broadcast(..) => {
                let simplified = simplify_shape(
                    &Arc::new(expr.clone()),
                    &self.shape_cache_as_simplify_cache(),
                    &self.range_cache_as_simplify_cache(),
                );
                if let ShapeExpr::Const(dims) = simplified.as_ref() {
                    Some(dims.clone())
                } else {
                    None
                }
            }
        }
    }

    fn string_of(&self, expr: &StringExpr) -> Option<Arc<str>> {
        match expr {
            StringExpr::Const(s) => Some(Arc::clone(s)),
            StringExpr::Symbol(s) => self.string_cache.get(&s.id()).cloned(),
            StringExpr::Concat(l, r) => {
                let l = self.string_of(l)?;
                let r = self.string_of(r)?;
                Some(Arc::from(format!("{l}{r}")))
            }
            StringExpr::Slice(base, start, end) => {
                let base = self.string_of(base)?;
                let start = self.range_of(start)?.is_const_int()?;
                let end = self.range_of(end)?.is_const_int()?;
                let s = crate::expr::resolve_index(start, base.len())?;
                let e = crate::expr::resolve_index(end, base.len())?;
                if s > e || e > base.len() {
                    return None;
                }
                Some(Arc::from(&base[s..e]))
            }
        }
    }

    fn known_unequal_string(&self, expr: &StringExpr, s: &str) -> bool {
        if let StringExpr::Symbol(sym) = expr {
            if let Some(set) = self.non_string_cache.get(&sym.id()) {
                return set.iter().any(|v| v.as_ref() == s);
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_gen_sym_int_gte_range_and_immediate_checks() {
        let root = ConstraintSet::root();
        let (x, s1) = root.gen_sym_int_gte("x", 0);
        let (y, s2) = s1.gen_sym_int_gte("y", 3);

        assert_eq!(
            s2.get_cached_range(&NumExpr::symbol(y.clone())),
            Some(NumRange::from_int(IntRange::new(crate::range::Bound::Finite(3), crate::range::Bound::PosInf)))
        );

        let lt_xy = s2.gen_num_compare(Arc::new(NumExpr::symbol(x.clone())), Arc::new(NumExpr::symbol(y)), false);
        assert_eq!(s2.check_immediate(&lt_xy), Decision::Unknown);

        let lt_neg1_x = s2.gen_num_compare(Arc::new(NumExpr::int(-1)), Arc::new(NumExpr::symbol(x)), false);
        assert_eq!(s2.check_immediate(&lt_neg1_x), Decision::True);
    }

    #[test]
    fn s2_require_does_not_narrow() {
        let root = ConstraintSet::root();
        let (x, s1) = root.gen_sym_int_gte("x", 0);
        let (_y, s2) = s1.gen_sym_int_gte("y", 3);
        let eq = s2.gen_equality(
            Operand::Num(Arc::new(NumExpr::symbol(x.clone()))),
            Operand::Num(Arc::new(NumExpr::int(5))),
        );
        let s3 = s2.require(&eq);
        assert_eq!(s3.valid(), Some(true));
        assert_eq!(
            s3.get_cached_range(&NumExpr::symbol(x)),
            Some(NumRange::from_int(IntRange::new(crate::range::Bound::Finite(0), crate::range::Bound::PosInf)))
        );
        assert_eq!(s3.count(), 3);
    }

    #[test]
    fn s3_guarantee_narrows_to_point() {
        let root = ConstraintSet::root();
        let (x, s1) = root.gen_sym_int_gte("x", 0);
        let (y, s2) = s1.gen_sym_int_gte("y", 3);
        let eq = s2.gen_equality(
            Operand::Num(Arc::new(NumExpr::symbol(x.clone()))),
            Operand::Num(Arc::new(NumExpr::int(5))),
        );
        let s3 = s2.guarantee(&eq);
        assert_eq!(s3.get_cached_range(&NumExpr::symbol(x.clone())).and_then(|r| r.is_const()), Some(5.0));

        let lt_xy = s3.gen_num_compare(Arc::new(NumExpr::symbol(x.clone())), Arc::new(NumExpr::symbol(y)), false);
        assert_eq!(s3.check_immediate(&lt_xy), Decision::Unknown);

        let le_x5 = s3.gen_num_compare(Arc::new(NumExpr::symbol(x)), Arc::new(NumExpr::int(5)), true);
        assert_eq!(s3.check_immediate(&le_x5), Decision::True);
    }

    #[test]
    fn s4_broadcastable_shapes() {
        let root = ConstraintSet::root();
        let a = Arc::new(ShapeExpr::konst(vec![
            Arc::new(NumExpr::int(1)),
            Arc::new(NumExpr::int(3)),
            Arc::new(NumExpr::int(1)),
        ]));
        let b = Arc::new(ShapeExpr::konst(vec![
            Arc::new(NumExpr::int(4)),
            Arc::new(NumExpr::int(1)),
            Arc::new(NumExpr::int(5)),
        ]));
        let c = root.gen_broad(Arc::clone(&a), b);
        assert_eq!(root.check_immediate(&c), Decision::True);

        let b2 = Arc::new(ShapeExpr::konst(vec![
            Arc::new(NumExpr::int(4)),
            Arc::new(NumExpr::int(2)),
            Arc::new(NumExpr::int(5)),
        ]));
        let c2 = root.gen_broad(a, b2);
        assert_eq!(root.check_immediate(&c2), Decision::False);
    }

    #[test]
    fn s5_cast_bool_to_int_round_trip() {
        let root = ConstraintSet::root();
        let (n, s1) = root.cast_bool_to_int(Arc::new(BoolExpr::Const(true)));
        assert_eq!(s1.get_cached_range(&n).and_then(|r| r.is_const()), Some(1.0));
    }

    #[test]
    fn s6_fail_invalidates() {
        let root = ConstraintSet::root();
        let eq = root.gen_equality(
            Operand::Num(Arc::new(NumExpr::int(1))),
            Operand::Num(Arc::new(NumExpr::int(2))),
        );
        let s1 = root.guarantee(&eq);
        assert_eq!(s1.valid(), Some(false));
        assert_eq!(s1.count(), 1);
        assert!(matches!(s1.get_constraints()[0].kind(), ConstraintKind::Eq(..)));
    }

    #[test]
    fn idempotent_guarantee() {
        let root = ConstraintSet::root();
        let (x, s1) = root.gen_sym_int_gte("x", 0);
        let eq = s1.gen_equality(
            Operand::Num(Arc::new(NumExpr::symbol(x))),
            Operand::Num(Arc::new(NumExpr::int(5))),
        );
        let once = s1.guarantee(&eq);
        let twice = once.guarantee(&eq);
        assert_eq!(once.count(), twice.count());
        assert_eq!(once.valid(), twice.valid());
    }

    #[test]
    fn gen_shaped_rejects_negative_rank_even_with_dims_given() {
        let root = ConstraintSet::root();
        let err = root.gen_shaped("x", -1, Some(vec![1, 2])).unwrap_err();
        assert!(matches!(err, ShapeCtrError::NegativeRank { rank: -1 }));
    }

    #[test]
    fn gen_shaped_rejects_negative_rank_without_dims() {
        let root = ConstraintSet::root();
        let err = root.gen_shaped("x", -1, None).unwrap_err();
        assert!(matches!(err, ShapeCtrError::NegativeRank { rank: -1 }));
    }

    #[test]
    fn gen_shaped_with_dims_lifts_constants_without_minting_symbols() {
        let root = ConstraintSet::root();
        let (shape, next) = root.gen_shaped("x", 2, Some(vec![3, 4])).unwrap();
        assert_eq!(next.count(), root.count());
        assert!(matches!(shape.as_ref(), ShapeExpr::Const(dims) if dims.len() == 2));
    }

    #[test]
    #[should_panic(expected = "snapshots from two different id-managers were combined")]
    #[cfg(debug_assertions)]
    fn installing_a_constraint_from_a_foreign_id_manager_panics() {
        let a = ConstraintSet::root();
        let b = ConstraintSet::root();
        let foreign = b.gen_equality(
            Operand::Num(Arc::new(NumExpr::int(1))),
            Operand::Num(Arc::new(NumExpr::int(1))),
        );
        let _ = a.require(&foreign);
    }
}
