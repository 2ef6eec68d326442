//! The interval (range) abstract domain (spec.md §4.B).
//!
//! Split into an exact [`IntRange`] and an approximate [`FloatRange`]
//! (Design Note 9), unified by [`NumRange`] for use as the value type of
//! `rangeCache` and the return type of `getCachedRange`. Mixed-kind
//! operations widen the integer side to float.

mod bound;
mod float;
mod int;

pub use bound::Bound;
pub use float::FloatRange;
pub use int::IntRange;

use std::fmt;

/// The range of a numeric (or boolean, which is `{0,1}`-valued) symbol or
/// expression: either exact-integer or finite-float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumRange {
    /// An exact-integer range (also used for `Bool`, restricted to `{0,1}`).
    Int(IntRange),
    /// A finite-float range.
    Float(FloatRange),
}

impl NumRange {
    /// `(−∞, +∞)`, as an integer range.
    #[must_use]
    pub const fn top() -> Self {
        Self::Int(IntRange::top())
    }

    /// The boolean range `{0,1}` (spec.md §3: "Bool uses `{0,1}`").
    #[must_use]
    pub fn bool_top() -> Self {
        Self::Int(IntRange::new(Bound::Finite(0), Bound::Finite(1)))
    }

    /// Wrap an [`IntRange`] as a [`NumRange`].
    #[must_use]
    pub const fn from_int(r: IntRange) -> Self {
        Self::Int(r)
    }

    /// Wrap a [`FloatRange`] as a [`NumRange`].
    #[must_use]
    pub const fn from_float(r: FloatRange) -> Self {
        Self::Float(r)
    }

    /// Widen an integer range to a float range; a no-op on an already-float
    /// range.
    #[must_use]
    pub fn to_float(self) -> FloatRange {
        match self {
            Self::Float(f) => f,
            Self::Int(i) => {
                let to_bound = |b: Bound<i64>| match b {
                    Bound::NegInf => Bound::NegInf,
                    Bound::PosInf => Bound::PosInf,
                    #[allow(
                        clippy::cast_precision_loss,
                        reason = "range bounds are already an over-approximation"
                    )]
                    Bound::Finite(v) => Bound::Finite(ordered_float::OrderedFloat(v as f64)),
                };
                FloatRange::new(to_bound(i.start()), to_bound(i.end()))
            }
        }
    }

    /// Whether the range is non-empty (`lo <= hi`).
    #[must_use]
    pub fn valid(&self) -> bool {
        match self {
            Self::Int(r) => r.valid(),
            Self::Float(r) => r.valid(),
        }
    }

    /// `Some(c)` iff this range is a single point; integer ranges report an
    /// exact `i64`, float ranges an `f64`.
    #[must_use]
    pub fn is_const(&self) -> Option<f64> {
        match self {
            #[allow(
                clippy::cast_precision_loss,
                reason = "reporting a constant value, not reasoning about bounds"
            )]
            Self::Int(r) => r.is_const().map(|c| c as f64),
            Self::Float(r) => r.is_const().map(ordered_float::OrderedFloat::into_inner),
        }
    }

    /// The constant as an exact `i64`, only when this is an integer range.
    #[must_use]
    pub fn is_const_int(&self) -> Option<i64> {
        match self {
            Self::Int(r) => r.is_const(),
            Self::Float(_) => None,
        }
    }

    /// Whether `n` lies within this range.
    #[must_use]
    pub fn contains(&self, n: f64) -> bool {
        match self {
            #[allow(clippy::cast_possible_truncation, reason = "exact membership check")]
            Self::Int(r) => n.fract() == 0.0 && r.contains(n as i64),
            Self::Float(r) => r.contains(n),
        }
    }

    /// `self.upper < other.lower`, widening to float if the kinds differ.
    #[must_use]
    pub fn lt_range(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.lt_range(b),
            _ => self.to_float().lt_range(&other.to_float()),
        }
    }

    /// `self.upper <= other.lower`, widening to float if the kinds differ.
    #[must_use]
    pub fn lte_range(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.lte_range(b),
            _ => self.to_float().lte_range(&other.to_float()),
        }
    }

    /// Arithmetic negation.
    #[must_use]
    pub fn neg(&self) -> Self {
        match self {
            Self::Int(r) => Self::Int(r.neg()),
            Self::Float(r) => Self::Float(r.neg()),
        }
    }

    /// Round towards positive infinity.
    #[must_use]
    pub fn ceil(&self) -> Self {
        match self {
            Self::Int(r) => Self::Int(r.ceil()),
            Self::Float(r) => Self::Float(r.ceil()),
        }
    }

    /// Round towards negative infinity.
    #[must_use]
    pub fn floor(&self) -> Self {
        match self {
            Self::Int(r) => Self::Int(r.floor()),
            Self::Float(r) => Self::Float(r.floor()),
        }
    }

    /// Absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        match self {
            Self::Int(r) => Self::Int(r.abs()),
            Self::Float(r) => Self::Float(r.abs()),
        }
    }

    /// Interval addition.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.add(b)),
            _ => Self::Float(self.to_float().add(&other.to_float())),
        }
    }

    /// Interval subtraction.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.sub(b)),
            _ => Self::Float(self.to_float().sub(&other.to_float())),
        }
    }

    /// Interval multiplication.
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.mul(b)),
            _ => Self::Float(self.to_float().mul(&other.to_float())),
        }
    }

    /// True division always promotes to the float domain (`5 / 2 = 2.5`
    /// even for integer operands).
    #[must_use]
    pub fn truediv(&self, other: &Self) -> Self {
        Self::Float(self.to_float().truediv(&other.to_float()))
    }

    /// Floor division requires both operands to be integer ranges; a float
    /// operand conservatively yields `top`.
    #[must_use]
    pub fn floordiv(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.floordiv(b)),
            _ => Self::top(),
        }
    }

    /// `mod` requires both operands to be integer ranges; a float operand
    /// conservatively yields `top`.
    #[must_use]
    pub fn modulo(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.modulo(b)),
            _ => Self::top(),
        }
    }

    /// Pointwise maximum of two ranges.
    #[must_use]
    pub fn max(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.max(b)),
            _ => Self::Float(self.to_float().max(&other.to_float())),
        }
    }

    /// Pointwise minimum of two ranges.
    #[must_use]
    pub fn min(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.min(b)),
            _ => Self::Float(self.to_float().min(&other.to_float())),
        }
    }

    /// Narrow to the overlap of two ranges.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.intersect(b)),
            _ => Self::Float(self.to_float().intersect(&other.to_float())),
        }
    }

    /// Widen to the span of two ranges.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.union(b)),
            _ => Self::Float(self.to_float().union(&other.to_float())),
        }
    }
}

impl fmt::Display for NumRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(r) => write!(f, "{r}"),
            Self::Float(r) => write!(f, "{r}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_kind_add_widens_to_float() {
        let i = NumRange::Int(IntRange::from_const(2));
        let f = NumRange::Float(FloatRange::from_const(0.5));
        let sum = i.add(&f);
        assert!(matches!(sum, NumRange::Float(_)));
        assert_eq!(sum.is_const(), Some(2.5));
    }

    #[test]
    fn truediv_always_promotes_to_float() {
        let a = NumRange::Int(IntRange::from_const(5));
        let b = NumRange::Int(IntRange::from_const(2));
        let r = a.truediv(&b);
        assert!(matches!(r, NumRange::Float(_)));
        assert_eq!(r.is_const(), Some(2.5));
    }

    #[test]
    fn bool_top_is_zero_one() {
        let b = NumRange::bool_top();
        assert!(b.contains(0.0));
        assert!(b.contains(1.0));
        assert!(!b.contains(2.0));
    }
}
