use super::constraint::{Clock, Limit, INFINITY, REFERENCE};

/// Marks a clock that is never compared against a constant of the given kind.
pub const NO_BOUND: Limit = -INFINITY;

/// The largest constants each clock is compared against, split by lower
/// bound guards (`x > c`, `x ≥ c`) and upper bound guards (`x < c`, `x ≤ c`).
/// Index 0 is the reference clock and always has the constant 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bounds {
    lower: Vec<Option<Limit>>,
    upper: Vec<Option<Limit>>,
}

impl Bounds {
    pub fn new(dimension: Clock) -> Self {
        assert!(dimension > 0, "bounds require the reference clock");
        let mut bounds = vec![None; dimension];
        bounds[REFERENCE] = Some(0);
        Self {
            lower: bounds.clone(),
            upper: bounds,
        }
    }

    pub fn dimensions(&self) -> Clock {
        self.upper.len()
    }

    /// Records a lower bound guard, only the largest constant is kept.
    pub fn add_lower(&mut self, clock: Clock, limit: Limit) -> &mut Self {
        assert!(clock != REFERENCE, "the reference clock has no bounds");
        self.lower[clock] = self.lower[clock].max(Some(limit));
        self
    }

    /// Records an upper bound guard, only the largest constant is kept.
    pub fn add_upper(&mut self, clock: Clock, limit: Limit) -> &mut Self {
        assert!(clock != REFERENCE, "the reference clock has no bounds");
        self.upper[clock] = self.upper[clock].max(Some(limit));
        self
    }

    pub fn lower(&self, clock: Clock) -> Option<Limit> {
        self.lower[clock]
    }

    pub fn upper(&self, clock: Clock) -> Option<Limit> {
        self.upper[clock]
    }

    pub fn max(&self, clock: Clock) -> Option<Limit> {
        match (self.lower(clock), self.upper(clock)) {
            (Some(lower), Some(upper)) => Some(lower.max(upper)),
            (lower, upper) => lower.or(upper),
        }
    }

    /// Per clock maximum constants, [`NO_BOUND`] where the clock is never compared.
    pub fn max_bounds(&self) -> Vec<Limit> {
        (REFERENCE..self.dimensions())
            .map(|clock| self.max(clock).unwrap_or(NO_BOUND))
            .collect()
    }

    pub fn lower_bounds(&self) -> Vec<Limit> {
        self.lower.iter().map(|limit| limit.unwrap_or(NO_BOUND)).collect()
    }

    pub fn upper_bounds(&self) -> Vec<Limit> {
        self.upper.iter().map(|limit| limit.unwrap_or(NO_BOUND)).collect()
    }
}
