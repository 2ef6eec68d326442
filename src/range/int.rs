//! The exact-integer range domain.

use std::fmt;

use super::bound::Bound;

/// A closed interval over `i64`, with `±∞` sentinels.
///
/// All arithmetic here is exact — no rounding is ever needed on this side of
/// the domain split (Design Note 9), since every endpoint is an exact
/// integer. Overflow in `checked_*` arithmetic widens conservatively to the
/// matching infinite bound rather than panicking or wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    start: Bound<i64>,
    end: Bound<i64>,
}

impl IntRange {
    /// `(−∞, +∞)`.
    #[must_use]
    pub const fn top() -> Self {
        Self {
            start: Bound::NegInf,
            end: Bound::PosInf,
        }
    }

    /// `[k, +∞)`.
    #[must_use]
    pub const fn gen_gte(k: i64) -> Self {
        Self {
            start: Bound::Finite(k),
            end: Bound::PosInf,
        }
    }

    /// `(−∞, k]`.
    #[must_use]
    pub const fn gen_lte(k: i64) -> Self {
        Self {
            start: Bound::NegInf,
            end: Bound::Finite(k),
        }
    }

    /// `[c, c]`.
    #[must_use]
    pub const fn from_const(c: i64) -> Self {
        Self {
            start: Bound::Finite(c),
            end: Bound::Finite(c),
        }
    }

    /// Build a range from raw bounds.
    #[must_use]
    pub const fn new(start: Bound<i64>, end: Bound<i64>) -> Self {
        Self { start, end }
    }

    /// The lower bound.
    #[must_use]
    pub const fn start(&self) -> Bound<i64> {
        self.start
    }

    /// The upper bound.
    #[must_use]
    pub const fn end(&self) -> Bound<i64> {
        self.end
    }

    /// `false` iff both endpoints are finite and `start > end`.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.start <= self.end
    }

    /// `Some(c)` iff this range is the single point `[c, c]`.
    #[must_use]
    pub fn is_const(&self) -> Option<i64> {
        match (self.start, self.end) {
            (Bound::Finite(a), Bound::Finite(b)) if a == b => Some(a),
            _ => None,
        }
    }

    /// Whether `n` lies within `[start, end]`.
    #[must_use]
    pub fn contains(&self, n: i64) -> bool {
        self.start <= Bound::Finite(n) && Bound::Finite(n) <= self.end
    }

    /// `self.end < other.start`.
    #[must_use]
    pub fn lt_range(&self, other: &Self) -> bool {
        self.end < other.start
    }

    /// `self.end <= other.start`.
    #[must_use]
    pub fn lte_range(&self, other: &Self) -> bool {
        self.end <= other.start
    }

    /// Arithmetic negation.
    #[must_use]
    pub fn neg(&self) -> Self {
        let neg_bound = |b: Bound<i64>| match b {
            Bound::NegInf => Bound::PosInf,
            Bound::PosInf => Bound::NegInf,
            Bound::Finite(v) => v.checked_neg().map_or(Bound::PosInf, Bound::Finite),
        };
        Self {
            start: neg_bound(self.end),
            end: neg_bound(self.start),
        }
    }

    /// Identity: every endpoint is already an exact integer.
    #[must_use]
    pub fn ceil(&self) -> Self {
        *self
    }

    /// Identity: every endpoint is already an exact integer.
    #[must_use]
    pub fn floor(&self) -> Self {
        *self
    }

    /// Absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        if self.start >= Bound::Finite(0) {
            return *self;
        }
        if self.end <= Bound::Finite(0) {
            return self.neg();
        }
        let upper = Bound::max(
            match self.start {
                Bound::Finite(v) => v.checked_neg().map_or(Bound::PosInf, Bound::Finite),
                Bound::NegInf => Bound::PosInf,
                Bound::PosInf => Bound::NegInf,
            },
            self.end,
        );
        Self {
            start: Bound::Finite(0),
            end: upper,
        }
    }

    /// Interval addition.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let add_bound = |a: Bound<i64>, b: Bound<i64>| -> Bound<i64> {
            match (a, b) {
                (Bound::NegInf, Bound::PosInf) | (Bound::PosInf, Bound::NegInf) => {
                    // Sound but degenerate; widen fully rather than pick a side.
                    Bound::NegInf
                }
                (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
                (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
                (Bound::Finite(x), Bound::Finite(y)) => {
                    x.checked_add(y).map_or(Bound::PosInf, Bound::Finite)
                }
            }
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
        let mul_bound = |a: Bound<i64>, b: Bound<i64>| -> Bound<i64> {
            match (a, b) {
                (Bound::Finite(0), _) | (_, Bound::Finite(0)) => Bound::Finite(0),
                (Bound::Finite(x), Bound::Finite(y)) => {
                    x.checked_mul(y).map_or_else(
                        || {
                            if (x < 0) == (y < 0) {
                                Bound::PosInf
                            } else {
                                Bound::NegInf
                            }
                        },
                        Bound::Finite,
                    )
                }
                (Bound::NegInf, Bound::NegInf) | (Bound::PosInf, Bound::PosInf) => Bound::PosInf,
                (Bound::NegInf, Bound::PosInf) | (Bound::PosInf, Bound::NegInf) => Bound::NegInf,
                (Bound::Finite(x), Bound::NegInf) | (Bound::NegInf, Bound::Finite(x)) => {
                    if x < 0 {
                        Bound::PosInf
                    } else {
                        Bound::NegInf
                    }
                }
                (Bound::Finite(x), Bound::PosInf) | (Bound::PosInf, Bound::Finite(x)) => {
                    if x < 0 {
                        Bound::NegInf
                    } else {
                        Bound::PosInf
                    }
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

    /// Divisor must be entirely positive or entirely negative and finite;
    /// anything else (straddles zero, unbounded) returns `top`, matching the
    /// `truediv`-by-a-zero-straddling-range rule generalized to `floordiv`.
    #[must_use]
    pub fn floordiv(&self, other: &Self) -> Self {
        let (Bound::Finite(c), Bound::Finite(d)) = (other.start, other.end) else {
            return Self::top();
        };
        if c <= 0 && d >= 0 {
            return Self::top();
        }
        let fdiv = |a: i64, b: i64| -> i64 {
            let q = a / b;
            let r = a % b;
            if r != 0 && (r < 0) != (b < 0) { q - 1 } else { q }
        };
        let corner = |a: Bound<i64>, b: i64| -> Option<i64> {
            match a {
                Bound::Finite(v) => Some(fdiv(v, b)),
                Bound::NegInf => None,
                Bound::PosInf => None,
            }
        };
        let mut lo_candidates = Vec::with_capacity(4);
        let mut hi_candidates = Vec::with_capacity(4);
        let mut any_unbounded = false;
        for divisor in [c, d] {
            match (corner(self.start, divisor), corner(self.end, divisor)) {
                (Some(a), Some(b)) => {
                    lo_candidates.push(a.min(b));
                    hi_candidates.push(a.max(b));
                }
                _ => any_unbounded = true,
            }
        }
        if any_unbounded || lo_candidates.is_empty() {
            return Self::top();
        }
        Self {
            start: Bound::Finite(lo_candidates.into_iter().min().unwrap_or(i64::MIN)),
            end: Bound::Finite(hi_candidates.into_iter().max().unwrap_or(i64::MAX)),
        }
    }

    /// `mod(x, m)` with `m` a known positive constant is `[0, m-1]`;
    /// everything else is `top`.
    #[must_use]
    pub fn modulo(&self, other: &Self) -> Self {
        match other.is_const() {
            Some(m) if m > 0 => Self {
                start: Bound::Finite(0),
                end: Bound::Finite(m - 1),
            },
            _ => Self::top(),
        }
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

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_bound = |b: Bound<i64>| match b {
            Bound::NegInf => "-inf".to_owned(),
            Bound::PosInf => "+inf".to_owned(),
            Bound::Finite(v) => v.to_string(),
        };
        write!(f, "[{}, {}]", fmt_bound(self.start), fmt_bound(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gen_gte_is_half_open() {
        let r = IntRange::gen_gte(3);
        assert!(r.valid());
        assert_eq!(r.is_const(), None);
        assert!(r.contains(3));
        assert!(r.contains(1_000_000));
        assert!(!r.contains(2));
    }

    #[test]
    fn mul_straddling_zero() {
        let a = IntRange::new(Bound::Finite(-2), Bound::Finite(3));
        let b = IntRange::new(Bound::Finite(-1), Bound::Finite(4));
        let p = a.mul(&b);
        // corners: -2*-1=2, -2*4=-8, 3*-1=-3, 3*4=12
        assert_eq!(p, IntRange::new(Bound::Finite(-8), Bound::Finite(12)));
    }

    #[test]
    fn modulo_constant_positive() {
        let x = IntRange::top();
        let m = IntRange::from_const(5);
        assert_eq!(x.modulo(&m), IntRange::new(Bound::Finite(0), Bound::Finite(4)));
    }

    #[test]
    fn modulo_non_constant_is_top() {
        let x = IntRange::top();
        let m = IntRange::gen_gte(1);
        assert_eq!(x.modulo(&m), IntRange::top());
    }

    #[test]
    fn floordiv_straddling_zero_is_top() {
        let a = IntRange::from_const(10);
        let b = IntRange::new(Bound::Finite(-1), Bound::Finite(1));
        assert_eq!(a.floordiv(&b), IntRange::top());
    }

    #[test]
    fn abs_straddling_zero() {
        let a = IntRange::new(Bound::Finite(-5), Bound::Finite(2));
        assert_eq!(a.abs(), IntRange::new(Bound::Finite(0), Bound::Finite(5)));
    }

    #[test]
    fn intersect_and_union() {
        let a = IntRange::new(Bound::Finite(0), Bound::Finite(10));
        let b = IntRange::new(Bound::Finite(5), Bound::Finite(20));
        assert_eq!(a.intersect(&b), IntRange::new(Bound::Finite(5), Bound::Finite(10)));
        assert_eq!(a.union(&b), IntRange::new(Bound::Finite(0), Bound::Finite(20)));
    }

    #[test]
    fn invalid_range_detected() {
        let bad = IntRange::new(Bound::Finite(5), Bound::Finite(1));
        assert!(!bad.valid());
    }
}
