use std::{
    fmt,
    ops::{Add, Neg, Sub},
};

use rand::{
    distributions::{Standard, Uniform},
    prelude::Distribution,
    Rng,
};

/// The unique index of a clock. This can be used to directly address the DBM.
pub type Clock = usize;

/// The zero'th (0) clock is the reference clock and marker of inconsistency.
pub const REFERENCE: Clock = 0;

/// Describes the strictness (<, <=) of the constraint between two clocks in the DBM.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub enum Strictness {
    Strict,
    Weak,
}

impl Strictness {
    pub const fn opposite(&self) -> Self {
        match self {
            Strictness::Strict => Strictness::Weak,
            Strictness::Weak => Strictness::Strict,
        }
    }

    pub const fn from_strict_flag(is_strict: bool) -> Self {
        if is_strict {
            return Strictness::Strict;
        }
        Strictness::Weak
    }

    const fn bit(&self) -> Limit {
        match self {
            Strictness::Strict => 0,
            Strictness::Weak => 1,
        }
    }
}

impl Distribution<Strictness> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Strictness {
        if rng.gen_bool(1.0 / 2.0) {
            return Strictness::Strict;
        }
        Strictness::Weak
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strictness::Strict => write!(f, "<"),
            Strictness::Weak => write!(f, "≤"),
        }
    }
}

pub type Limit = i32;

/// The largest bound magnitude. Anything at or beyond it means "no bound".
pub const INFINITY: Limit = Limit::MAX >> 1;

/// Bounds are expected to stay below this magnitude. Sums beyond
/// it saturate instead of wrapping around.
pub const OVERFLOW: Limit = Limit::MAX >> 2;

/// An element optimized for caching which represents a strict or weak
/// relation between two clocks (c0 - c1 RELATION). This encoding uses
/// the least significant bit to represent the strictness and the other
/// bits as the limit. The encoding is [limit] [1 bit strictness], i.e.
/// `raw = 2 * limit + (0 if strict else 1)`.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct Relation(Limit);

/// Infinity is (∞, <). Every cell holding it is unconstrained.
pub const LS_INFINITY: Relation = Relation(INFINITY << 1);
/// Zero is just a relation with limit of 0 but it is weak and thereby includes 0 (0, ≤).
pub const LE_ZERO: Relation = Relation(1);
/// The first raw value outside the valid range.
pub const LE_OVERFLOW: Relation = Relation(LS_INFINITY.0 >> 1);
/// The most negative valid relation. Sums below the valid range stick to it.
pub const LS_NEGATIVE_OVERFLOW: Relation = Relation(1 - LE_OVERFLOW.0);

impl Relation {
    pub const fn new(limit: Limit, strictness: Strictness) -> Self {
        Self((limit << 1) | strictness.bit())
    }

    pub const fn weak(limit: Limit) -> Self {
        Self::new(limit, Strictness::Weak)
    }

    pub const fn strict(limit: Limit) -> Self {
        Self::new(limit, Strictness::Strict)
    }

    pub const fn from_strict_flag(limit: Limit, is_strict: bool) -> Self {
        Self::new(limit, Strictness::from_strict_flag(is_strict))
    }

    /// Wraps an already encoded value without checking it.
    pub const fn from_raw(raw: Limit) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> Limit {
        self.0
    }

    /// Returns the limit of the relation which can be
    /// represented with one less bit than the relation
    /// as the last bit describes the relation's strictness.
    pub const fn limit(&self) -> Limit {
        self.0 >> 1
    }

    /// Returns the strictness of the relation.
    pub const fn strictness(&self) -> Strictness {
        if self.is_strict() {
            return Strictness::Strict;
        }
        Strictness::Weak
    }

    pub const fn as_weak(&self) -> Self {
        Self(self.0 | 1)
    }

    pub const fn as_strict(&self) -> Self {
        Self(self.0 & !1)
    }

    /// Returns true if the strictness of the relation is strict.
    pub const fn is_strict(&self) -> bool {
        (self.0 & 1) == 0
    }

    /// Returns true if the strictness of the relation is weak.
    pub const fn is_weak(&self) -> bool {
        !self.is_strict()
    }

    /// Returns true if the relation represents the unbounded relation (∞, <).
    pub const fn is_infinity(&self) -> bool {
        self.0 == LS_INFINITY.0
    }

    /// Returns true if the relation represents a zero relation (0, ≤).
    pub const fn is_zero(&self) -> bool {
        self.0 == LE_ZERO.0
    }

    /// Infinity is valid, every other value must stay clear of the overflow range.
    pub const fn is_valid(&self) -> bool {
        self.0 == LS_INFINITY.0 || (self.0 < LE_OVERFLOW.0 && -self.0 < LE_OVERFLOW.0)
    }

    /// The complement of the relation on the mirrored difference:
    /// negating `x - y < 5` yields `y - x ≤ -5`, and `x - y ≤ 5` yields `y - x < -5`.
    pub const fn negation(&self) -> Self {
        Self(1 - self.0)
    }

    /// Negation which always stays weak. Only meaningful for weak relations.
    pub const fn weak_negation(&self) -> Self {
        Self(2 - self.0)
    }

    /// Returns the sum of two relations. The sum describes the path
    /// along both relations, if one of them is strict then so is the sum.
    /// Saturates at infinity when either side is unbounded.
    /// This addition is mostly used to compute the accumulated path when closing a DBM.
    pub const fn addition(&self, other: &Self) -> Self {
        if self.is_infinity() || other.is_infinity() {
            return LS_INFINITY;
        }
        self.add_finite(other)
    }

    /// Addition where only self may be infinite.
    pub const fn add_raw_finite(&self, finite: &Self) -> Self {
        if self.is_infinity() {
            return LS_INFINITY;
        }
        self.add_finite(finite)
    }

    /// Addition where only other may be infinite.
    pub const fn add_finite_raw(&self, other: &Self) -> Self {
        other.add_raw_finite(self)
    }

    /// Addition of two finite relations. The sum saturates at the
    /// ends of the valid range.
    pub const fn add_finite(&self, finite: &Self) -> Self {
        // First adding the lhs and rhs increases the limit.
        // Then we ensure the tightest constraint that satisfies both constraints is kept.
        let sum = (self.0 as i64 + finite.0 as i64) - ((self.0 | finite.0) & 1) as i64;
        Self::saturate(sum)
    }

    /// Addition of two finite and weak relations.
    pub const fn add_finite_weak(&self, finite: &Self) -> Self {
        Self::saturate(self.0 as i64 + finite.0 as i64 - 1)
    }

    /// Clamps a widened raw value into the valid range. Values above it lose
    /// their bound and values below it become [`LS_NEGATIVE_OVERFLOW`] such
    /// that cycles through them stay negative.
    const fn saturate(raw: i64) -> Self {
        if raw >= LE_OVERFLOW.0 as i64 {
            return LS_INFINITY;
        }
        if raw <= LS_NEGATIVE_OVERFLOW.0 as i64 {
            return LS_NEGATIVE_OVERFLOW;
        }
        Self(raw as Limit)
    }

    /// subtract other from self by "self + (-other)".
    pub const fn subtract(&self, other: &Self) -> Self {
        self.addition(&other.negation())
    }

    /// Offsets the encoded value by `amount` raw units, infinity stays infinity.
    /// An odd amount flips the strictness, pass `2 * limit` to move the limit only.
    pub const fn increment(&self, amount: Limit) -> Self {
        if self.0 < LS_INFINITY.0 {
            return Self::saturate(self.0 as i64 + amount as i64);
        }
        *self
    }

    /// Offsets the encoded value by `-amount` raw units, infinity stays infinity.
    /// An odd amount flips the strictness, pass `2 * limit` to move the limit only.
    pub const fn decrement(&self, amount: Limit) -> Self {
        if self.0 < LS_INFINITY.0 {
            return Self::saturate(self.0 as i64 - amount as i64);
        }
        *self
    }
}

impl Distribution<Relation> for Standard {
    /// Samples finite relations with small limits, suitable for random zones.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Relation {
        let strictness: Strictness = rng.gen();
        let limit = Uniform::new_inclusive(-1_000, 1_000).sample(rng);
        Relation::new(limit, strictness)
    }
}

impl Add for Relation {
    type Output = Relation;

    fn add(self, rhs: Self) -> Self::Output {
        self.addition(&rhs)
    }
}

impl Sub for Relation {
    type Output = Relation;

    fn sub(self, rhs: Self) -> Self::Output {
        self.subtract(&rhs)
    }
}

impl Neg for Relation {
    type Output = Relation;

    fn neg(self) -> Self::Output {
        self.negation()
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinity() {
            return write!(f, "(∞, {})", self.strictness());
        }
        write!(f, "({}, {})", self.limit(), self.strictness())
    }
}

/// The difference constraint `x_i - x_j ⋈ value`.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub struct Constraint {
    pub i: Clock,
    pub j: Clock,
    pub value: Relation,
}

impl Constraint {
    pub const fn new(i: Clock, j: Clock, value: Relation) -> Self {
        Self { i, j, value }
    }

    pub const fn bound(i: Clock, j: Clock, limit: Limit, strictness: Strictness) -> Self {
        Self::new(i, j, Relation::new(limit, strictness))
    }

    pub const fn from_strict_flag(i: Clock, j: Clock, limit: Limit, is_strict: bool) -> Self {
        Self::new(i, j, Relation::from_strict_flag(limit, is_strict))
    }

    pub const fn upper(clock: Clock, value: Relation) -> Self {
        Self::new(clock, REFERENCE, value)
    }

    pub const fn lower(clock: Clock, value: Relation) -> Self {
        Self::new(REFERENCE, clock, value)
    }

    /// `x_j - x_i` bounded by the negated value, i.e. the complement of self.
    pub const fn negation(&self) -> Self {
        Self::new(self.j, self.i, self.value.negation())
    }

    pub fn fmt_with(&self, labels: &[&str]) -> String {
        format!(
            "{} - {} {} {}",
            labels[self.i],
            labels[self.j],
            self.value.strictness(),
            self.value.limit()
        )
    }
}

impl Neg for Constraint {
    type Output = Constraint;

    fn neg(self) -> Self::Output {
        self.negation()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} {}", self.i, self.j, self.value)
    }
}
