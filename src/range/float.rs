//! The finite-float range domain.
//!
//! Endpoints are `OrderedFloat<f64>` so that `Bound<OrderedFloat<f64>>` gets a
//! total order for free. Per the Non-goals in spec.md §1, this domain is not
//! sound under IEEE rounding — it is a best-effort approximation, unlike the
//! exact-integer side (Design Note 9).

use std::fmt;

use ordered_float::OrderedFloat;

use super::bound::Bound;

type F = OrderedFloat<f64>;

/// A closed interval over `f64` (via [`OrderedFloat`]), with `±∞` sentinels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRange {
    start: Bound<F>,
    end: Bound<F>,
}

impl FloatRange {
    /// `(−∞, +∞)`.
    #[must_use]
    pub fn top() -> Self {
        Self {
            start: Bound::NegInf,
            end: Bound::PosInf,
        }
    }

    /// `[k, +∞)`.
    #[must_use]
    pub fn gen_gte(k: f64) -> Self {
        Self {
            start: Bound::Finite(OrderedFloat(k)),
            end: Bound::PosInf,
        }
    }

    /// `[c, c]`.
    #[must_use]
    pub fn from_const(c: f64) -> Self {
        Self {
            start: Bound::Finite(OrderedFloat(c)),
            end: Bound::Finite(OrderedFloat(c)),
        }
    }

    /// Build a range from raw bounds.
    #[must_use]
    pub const fn new(start: Bound<F>, end: Bound<F>) -> Self {
        Self { start, end }
    }

    /// The lower bound.
    #[must_use]
    pub const fn start(&self) -> Bound<F> {
        self.start
    }

    /// The upper bound.
    #[must_use]
    pub const fn end(&self) -> Bound<F> {
        self.end
    }

    /// Whether the range is non-empty (`lo <= hi`).
    #[must_use]
    pub fn valid(&self) -> bool {
        self.start <= self.end
    }

    /// The single value this range pins down, if any.
    #[must_use]
    pub fn is_const(&self) -> Option<f64> {
        match (self.start, self.end) {
            (Bound::Finite(a), Bound::Finite(b)) if a == b => Some(a.0),
            _ => None,
        }
    }

    /// Whether `n` lies within this range.
    #[must_use]
    pub fn contains(&self, n: f64) -> bool {
        let n = Bound::Finite(OrderedFloat(n));
        self.start <= n && n <= self.end
    }

    /// Whether every value in `self` is strictly less than every value in `other`.
    #[must_use]
    pub fn lt_range(&self, other: &Self) -> bool {
        self.end < other.start
    }

    /// Whether every value in `self` is less than or equal to every value in `other`.
    #[must_use]
    pub fn lte_range(&self, other: &Self) -> bool {
        self.end <= other.start
    }

    /// Arithmetic negation.
    #[must_use]
    pub fn neg(&self) -> Self {
        let neg_bound = |b: Bound<F>| match b {
            Bound::NegInf => Bound::PosInf,
            Bound::PosInf => Bound::NegInf,
            Bound::Finite(v) => Bound::Finite(OrderedFloat(-v.0)),
        };
        Self {
            start: neg_bound(self.end),
            end: neg_bound(self.start),
        }
    }

    /// Round towards positive infinity.
    #[must_use]
    pub fn ceil(&self) -> Self {
        let map_bound = |b: Bound<F>| match b {
            Bound::Finite(v) => Bound::Finite(OrderedFloat(v.0.ceil())),
            inf => inf,
        };
        Self {
            start: map_bound(self.start),
            end: map_bound(self.end),
        }
    }

    /// Round towards negative infinity.
    #[must_use]
    pub fn floor(&self) -> Self {
        let map_bound = |b: Bound<F>| match b {
            Bound::Finite(v) => Bound::Finite(OrderedFloat(v.0.floor())),
            inf => inf,
        };
        Self {
            start: map_bound(self.start),
            end: map_bound(self.end),
        }
    }

    /// Absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        let zero = Bound::Finite(OrderedFloat(0.0));
        if self.start >= zero {
            return *self;
        }
        if self.end <= zero {
            return self.neg();
        }
        let neg_start = match self.start {
            Bound::Finite(v) => Bound::Finite(OrderedFloat(-v.0)),
            Bound::NegInf => Bound::PosInf,
            Bound::PosInf => Bound::NegInf,
        };
        Self {
            start: zero,
            end: Bound::max(neg_start, self.end),
        }
    }

    /// Interval addition.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let add_bound = |a: Bound<F>, b: Bound<F>| match (a, b) {
            (Bound::NegInf, Bound::PosInf) | (Bound::PosInf, Bound::NegInf) => Bound::NegInf,
            (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
            (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
            (Bound::Finite(x), Bound::Finite(y)) => Bound::Finite(OrderedFloat(x.0 + y.0)),
        };
        Self {
            start: add_bound(self.start, other.start),
            end: add_bound(self.end, other.end),
        }
    }

    /// Interval subtraction.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    /// Interval multiplication.
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        let mul_bound = |a: Bound<F>, b: Bound<F>| -> Bound<F> {
            if let Bound::Finite(x) = a {
                if x.0 == 0.0 {
                    return Bound::Finite(OrderedFloat(0.0));
                }
            }
            if let Bound::Finite(y) = b {
                if y.0 == 0.0 {
                    return Bound::Finite(OrderedFloat(0.0));
                }
            }
            match (a, b) {
                (Bound::Finite(x), Bound::Finite(y)) => Bound::Finite(OrderedFloat(x.0 * y.0)),
                (Bound::NegInf, Bound::NegInf) | (Bound::PosInf, Bound::PosInf) => Bound::PosInf,
                (Bound::NegInf, Bound::PosInf) | (Bound::PosInf, Bound::NegInf) => Bound::NegInf,
                (Bound::Finite(x), Bound::NegInf | Bound::PosInf) => {
                    let x_pos = x.0 > 0.0;
                    let b_pos_inf = matches!(b, Bound::PosInf);
                    if x_pos == b_pos_inf { Bound::PosInf } else { Bound::NegInf }
                }
                (Bound::NegInf | Bound::PosInf, Bound::Finite(y)) => {
                    let y_pos = y.0 > 0.0;
                    let a_pos_inf = matches!(a, Bound::PosInf);
                    if y_pos == a_pos_inf { Bound::PosInf } else { Bound::NegInf }
                }
            }
        };
        let candidates = [
            mul_bound(self.start, other.start),
            mul_bound(self.start, other.end),
            mul_bound(self.end, other.start),
            mul_bound(self.end, other.end),
        ];
        let start = candidates.into_iter().reduce(Bound::min).unwrap_or(Bound::NegInf);
        let end = candidates.into_iter().reduce(Bound::max).unwrap_or(Bound::PosInf);
        Self { start, end }
    }

    /// Division by a range straddling (or touching) zero, or with an
    /// unbounded divisor, returns `top`.
    #[must_use]
    pub fn truediv(&self, other: &Self) -> Self {
        let (Bound::Finite(c), Bound::Finite(d)) = (other.start, other.end) else {
            return Self::top();
        };
        if c.0 <= 0.0 && d.0 >= 0.0 {
            return Self::top();
        }
        let recip = |v: F| OrderedFloat(1.0 / v.0);
        let recip_range = Self {
            start: Bound::Finite(recip(d)),
            end: Bound::Finite(recip(c)),
        };
        self.mul(&recip_range)
    }

    /// Pointwise maximum of two ranges.
    #[must_use]
    pub fn max(&self, other: &Self) -> Self {
        Self {
            start: Bound::max(self.start, other.start),
            end: Bound::max(self.end, other.end),
        }
    }

    /// Pointwise minimum of two ranges.
    #[must_use]
    pub fn min(&self, other: &Self) -> Self {
        Self {
            start: Bound::min(self.start, other.start),
            end: Bound::min(self.end, other.end),
        }
    }

    /// Narrow to the overlap of two ranges.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            start: Bound::max(self.start, other.start),
            end: Bound::min(self.end, other.end),
        }
    }

    /// Widen to the span of two ranges.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            start: Bound::min(self.start, other.start),
            end: Bound::max(self.end, other.end),
        }
    }
}

impl fmt::Display for FloatRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_bound = |b: Bound<F>| match b {
            Bound::NegInf => "-inf".to_owned(),
            Bound::PosInf => "+inf".to_owned(),
            Bound::Finite(v) => v.0.to_string(),
        };
        write!(f, "[{}, {}]", fmt_bound(self.start), fmt_bound(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truediv_straddling_zero_is_top() {
        let a = FloatRange::from_const(1.0);
        let b = FloatRange::new(Bound::Finite(OrderedFloat(-1.0)), Bound::Finite(OrderedFloat(1.0)));
        assert_eq!(a.truediv(&b), FloatRange::top());
    }

    #[test]
    fn truediv_positive_divisor() {
        let a = FloatRange::from_const(10.0);
        let b = FloatRange::from_const(2.0);
        let r = a.truediv(&b);
        assert_eq!(r.is_const(), Some(5.0));
    }

    #[test]
    fn abs_straddles_zero() {
        let a = FloatRange::new(Bound::Finite(OrderedFloat(-3.0)), Bound::Finite(OrderedFloat(1.0)));
        let r = a.abs();
        assert_eq!(r.start(), Bound::Finite(OrderedFloat(0.0)));
        assert_eq!(r.end(), Bound::Finite(OrderedFloat(3.0)));
    }
}
