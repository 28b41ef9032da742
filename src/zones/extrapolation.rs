use log::debug;

use super::{
    bounds::Bounds,
    constraint::{Clock, Limit, Relation, LE_ZERO, LS_INFINITY, REFERENCE},
    dbm::DBM,
    error::{expect_length, Result},
};

/// Returns true if the bound is looser than anything the clock is compared against.
/// A negative constant means that the clock is never compared.
#[inline]
fn exceeds(relation: Relation, limit: Limit) -> bool {
    limit < 0 || relation > Relation::weak(limit)
}

/// The loosest lower bound `x_0 - x_j` worth remembering for a constant.
#[inline]
fn floor(limit: Limit) -> Relation {
    if limit < 0 {
        return LS_INFINITY;
    }
    Relation::strict(-limit)
}

/// Reads the constant of a clock where the reference clock is always 0.
#[inline]
fn constant(bounds: &[Limit], clock: Clock) -> Limit {
    if clock == REFERENCE {
        return 0;
    }
    bounds[clock]
}

impl DBM {
    /// Classic max bounds extrapolation (Extra_M). Bounds above the clock's
    /// constant are dropped and bounds below the negated constant are lifted.
    pub fn extrapolate_max_bounds(&mut self, max: &[Limit]) -> Result<()> {
        expect_length("max bounds", self.dimensions(), max.len())?;
        self.extrapolate_with(|_, i, j, relation| {
            if exceeds(relation, constant(max, i)) {
                return LS_INFINITY;
            }

            let lifted = floor(constant(max, j));
            if relation < lifted {
                return lifted;
            }
            relation
        });
        Ok(())
    }

    /// Max bounds extrapolation which also drops the relations of clocks
    /// already above their constant (Extra+_M).
    pub fn diagonal_extrapolate_max_bounds(&mut self, max: &[Limit]) -> Result<()> {
        expect_length("max bounds", self.dimensions(), max.len())?;
        self.extrapolate_with(|lower, i, j, relation| {
            if exceeds(relation, constant(max, i)) {
                return LS_INFINITY;
            }

            if i != REFERENCE {
                if lower[i] < floor(constant(max, i)) || lower[j] < floor(constant(max, j)) {
                    return LS_INFINITY;
                }
                return relation;
            }

            let lifted = floor(constant(max, j));
            if relation < lifted {
                return lifted;
            }
            relation
        });
        Ok(())
    }

    /// Lower/upper bounds extrapolation (Extra_LU). Upper bounds of a clock are
    /// compared with its lower bound constant and lower bounds with its upper bound constant.
    pub fn extrapolate_lu_bounds(&mut self, lower: &[Limit], upper: &[Limit]) -> Result<()> {
        expect_length("lower bounds", self.dimensions(), lower.len())?;
        expect_length("upper bounds", self.dimensions(), upper.len())?;
        self.extrapolate_with(|_, i, j, relation| {
            if exceeds(relation, constant(lower, i)) {
                return LS_INFINITY;
            }

            let lifted = floor(constant(upper, j));
            if relation < lifted {
                return lifted;
            }
            relation
        });
        Ok(())
    }

    /// Lower/upper bounds extrapolation with the diagonal rules (Extra+_LU).
    pub fn diagonal_extrapolate_lu_bounds(&mut self, lower: &[Limit], upper: &[Limit]) -> Result<()> {
        expect_length("lower bounds", self.dimensions(), lower.len())?;
        expect_length("upper bounds", self.dimensions(), upper.len())?;
        self.extrapolate_with(|row, i, j, relation| {
            if exceeds(relation, constant(lower, i)) {
                return LS_INFINITY;
            }

            if i != REFERENCE {
                if row[i] < floor(constant(lower, i)) || row[j] < floor(constant(upper, j)) {
                    return LS_INFINITY;
                }
                return relation;
            }

            let lifted = floor(constant(upper, j));
            if relation < lifted {
                return lifted;
            }
            relation
        });
        Ok(())
    }

    /// Extrapolates with the constants collected in the bounds.
    pub fn extrapolate(&mut self, bounds: &Bounds) -> Result<()> {
        self.diagonal_extrapolate_lu_bounds(&bounds.lower_bounds(), &bounds.upper_bounds())
    }

    /// Rewrites every finite off-diagonal cell with the rule and closes. The rule receives
    /// the lower bounds `x_0 - x_k` as they were before the extrapolation started.
    fn extrapolate_with(&mut self, rule: impl Fn(&[Relation], Clock, Clock, Relation) -> Relation) {
        if self.is_empty() {
            return;
        }

        let lower = self.lower_relations();
        let dim = self.dimensions();
        let mut changed = 0;
        for i in REFERENCE..dim {
            for j in REFERENCE..dim {
                let relation = self[(i, j)];
                if i == j || relation.is_infinity() {
                    continue;
                }

                let mut extrapolated = rule(&lower, i, j, relation);
                if i == REFERENCE && extrapolated > LE_ZERO {
                    // Clocks are never negative.
                    extrapolated = LE_ZERO;
                }

                if extrapolated != relation {
                    self.set(i, j, extrapolated);
                    changed += 1;
                }
            }
        }

        if changed > 0 {
            debug!("extrapolation relaxed {} bounds", changed);
            self.close();
        }
    }
}
