use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
};

use itertools::iproduct;

use super::{
    constraint::{Limit, REFERENCE},
    dbm::DBM,
    error::{expect_dimension, expect_length, Result},
};

/// The inclusion relation between two zones.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum ZoneRelation {
    Different = 0,
    Superset = 1,
    Subset = 2,
    Equal = 3,
}

impl ZoneRelation {
    fn from_flags(subset: bool, superset: bool) -> Self {
        match (subset, superset) {
            (true, true) => ZoneRelation::Equal,
            (true, false) => ZoneRelation::Subset,
            (false, true) => ZoneRelation::Superset,
            (false, false) => ZoneRelation::Different,
        }
    }

    pub const fn is_subset(&self) -> bool {
        matches!(self, ZoneRelation::Subset | ZoneRelation::Equal)
    }

    pub const fn is_superset(&self) -> bool {
        matches!(self, ZoneRelation::Superset | ZoneRelation::Equal)
    }
}

impl fmt::Display for ZoneRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneRelation::Different => write!(f, "different"),
            ZoneRelation::Superset => write!(f, "superset"),
            ZoneRelation::Subset => write!(f, "subset"),
            ZoneRelation::Equal => write!(f, "equal"),
        }
    }
}

impl DBM {
    /// Compares two closed DBMs cell by cell. The empty zone is a subset of everything.
    pub fn relation(&self, other: &Self) -> Result<ZoneRelation> {
        expect_dimension(self.dimensions(), other.dimensions())?;

        match (self.is_empty(), other.is_empty()) {
            (true, true) => return Ok(ZoneRelation::Equal),
            (true, false) => return Ok(ZoneRelation::Subset),
            (false, true) => return Ok(ZoneRelation::Superset),
            (false, false) => {}
        }

        let mut subset = true;
        let mut superset = true;
        let dim = self.dimensions();
        for (i, j) in iproduct!(REFERENCE..dim, REFERENCE..dim) {
            if !subset && !superset {
                break;
            }

            let lhs = self[(i, j)];
            let rhs = other[(i, j)];
            subset = subset && (lhs <= rhs);
            superset = superset && (lhs >= rhs);
        }

        Ok(ZoneRelation::from_flags(subset, superset))
    }

    /// Returns true if self is a subset of other.
    pub fn is_subset_eq(&self, other: &Self) -> Result<bool> {
        Ok(self.relation(other)?.is_subset())
    }

    /// Returns true if self is a superset of other.
    pub fn is_superset_eq(&self, other: &Self) -> Result<bool> {
        Ok(self.relation(other)?.is_superset())
    }

    /// Returns true if all valuations of self are also in other and vice versa.
    pub fn are_equal(&self, other: &Self) -> Result<bool> {
        Ok(self.relation(other)? == ZoneRelation::Equal)
    }

    pub fn hash_code(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Returns true if the integer valuation is inside the zone, the
    /// point is indexed by clock with the reference clock at 0.
    pub fn is_point_included(&self, point: &[Limit]) -> Result<bool> {
        expect_length("point", self.dimensions(), point.len())?;
        if self.is_empty() {
            return Ok(false);
        }

        let dim = self.dimensions();
        Ok(iproduct!(REFERENCE..dim, REFERENCE..dim).all(|(i, j)| {
            let relation = self[(i, j)];
            if relation.is_infinity() {
                return true;
            }

            // The weak encoding of the difference, widened such that extreme points cannot wrap.
            let difference = i64::from(point[i]) - i64::from(point[j]);
            2 * difference + 1 <= i64::from(relation.raw())
        }))
    }

    pub fn is_real_point_included(&self, point: &[f64]) -> Result<bool> {
        expect_length("point", self.dimensions(), point.len())?;
        if self.is_empty() {
            return Ok(false);
        }

        let dim = self.dimensions();
        Ok(iproduct!(REFERENCE..dim, REFERENCE..dim).all(|(i, j)| {
            let relation = self[(i, j)];
            if i == j || relation.is_infinity() {
                return true;
            }

            let difference = point[i] - point[j];
            let limit = f64::from(relation.limit());
            if relation.is_strict() {
                return difference < limit;
            }
            difference <= limit
        }))
    }

    /// Returns true if all clocks' upper bound is infinity.
    pub fn is_unbounded(&self) -> bool {
        (REFERENCE + 1..self.dimensions()).all(|clock| self.upper(clock).is_infinity())
    }

    /// The largest magnitude of any finite bound between two distinct clocks.
    pub fn max_range(&self) -> Limit {
        let dim = self.dimensions();
        iproduct!(REFERENCE..dim, REFERENCE..dim)
            .filter(|(i, j)| i != j && !self[(*i, *j)].is_infinity())
            .map(|(i, j)| self[(i, j)].limit().abs())
            .max()
            .unwrap_or(0)
    }
}
