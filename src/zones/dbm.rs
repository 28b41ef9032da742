use std::{
    hash::{Hash, Hasher},
    ops::{Index, IndexMut},
};

use bitset::BitSet;
use itertools::Itertools;
use log::{debug, trace};

use super::{
    constraint::{Clock, Constraint, Limit, Relation, Strictness, LE_ZERO, LS_INFINITY, REFERENCE},
    error::{expect_dimension, expect_length, DbmError, Result},
};

/// A Difference Bound Matrix over `dimension` clocks where clock 0 is the
/// reference clock. Cell `(i, j)` bounds the difference `x_i - x_j`.
/// All empty DBMs of a dimension are equal and hash alike.
#[derive(Clone, Debug)]
pub struct DBM {
    /// The number of clocks inside the DBM including the reference clock.
    dimension: Clock,
    /// The relations between the clocks.
    relations: Box<[Relation]>,
}

impl DBM {
    /// Returns the number of clocks excluding the reference clock.
    pub const fn clocks(&self) -> Clock {
        self.dimension - 1
    }

    /// Returns the number of clocks including the reference clock.
    pub const fn dimensions(&self) -> Clock {
        self.dimension
    }

    pub const fn constraints(&self) -> usize {
        self.dimensions() * self.dimensions()
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Uses the row-wise indexing.
    ///
    /// Eg. 3 clocks (including the reference clock) DBM indexing "(row; column)-index":
    ///
    /// [(0; 0)-0, (0; 1)-1, (0; 2)-2]
    ///
    /// [(1; 0)-3, (1; 1)-4, (1; 2)-5]
    ///
    /// [(2; 0)-6, (2; 1)-7, (2; 2)-8]
    #[inline]
    pub const fn index(&self, i: Clock, j: Clock) -> usize {
        i * self.dimensions() + j
    }

    #[inline]
    pub const fn coordinates(&self, index: usize) -> (Clock, Clock) {
        (index / self.dimensions(), index % self.dimensions())
    }

    #[inline]
    pub fn get(&self, i: Clock, j: Clock) -> Relation {
        self.relations[self.index(i, j)]
    }

    #[inline]
    pub fn set(&mut self, i: Clock, j: Clock, relation: Relation) {
        let index = self.index(i, j);
        self.relations[index] = relation
    }

    /// The upper bound `x_clock - x_0`.
    #[inline]
    pub fn upper(&self, clock: Clock) -> Relation {
        self.get(clock, REFERENCE)
    }

    #[inline]
    pub(crate) fn set_upper(&mut self, clock: Clock, relation: Relation) {
        self.set(clock, REFERENCE, relation)
    }

    /// The negated lower bound `x_0 - x_clock`.
    #[inline]
    pub fn lower(&self, clock: Clock) -> Relation {
        self.get(REFERENCE, clock)
    }

    #[inline]
    pub(crate) fn set_lower(&mut self, clock: Clock, relation: Relation) {
        self.set(REFERENCE, clock, relation)
    }

    pub fn lower_relations(&self) -> Vec<Relation> {
        (REFERENCE..self.dimensions())
            .map(|clock| self.lower(clock))
            .collect()
    }

    pub fn upper_relations(&self) -> Vec<Relation> {
        (REFERENCE..self.dimensions())
            .map(|clock| self.upper(clock))
            .collect()
    }

    fn filled(dimension: Clock, relation: Relation) -> Self {
        assert!(dimension > 0, "a DBM requires the reference clock");
        Self {
            dimension,
            relations: vec![relation; dimension * dimension].into_boxed_slice(),
        }
    }

    /// Returns an unconstrained DBM where all clocks are non-negative.
    pub fn init(dimension: Clock) -> Self {
        let mut dbm = Self::filled(dimension, LS_INFINITY);
        for i in REFERENCE..dimension {
            dbm.set_lower(i, LE_ZERO);
            dbm.set(i, i, LE_ZERO);
        }
        dbm
    }

    /// Returns the most strictly constrained DBM, i.e. the origin where all clocks are zero.
    pub fn zero(dimension: Clock) -> Self {
        Self::filled(dimension, LE_ZERO)
    }

    /// Takes ownership of a row-major matrix. The dimension is derived from its length.
    pub fn from_relations(relations: Box<[Relation]>) -> Result<Self> {
        let mut dimension: usize = 0;
        while dimension * dimension < relations.len() {
            dimension += 1;
        }

        if dimension == 0 || dimension * dimension != relations.len() {
            return Err(DbmError::NotSquare(relations.len()));
        }

        Ok(Self {
            dimension,
            relations,
        })
    }

    /// Imports the row-major exchange format of encoded bounds.
    pub fn from_raw(dimension: Clock, raw: &[Limit]) -> Result<Self> {
        if dimension == 0 {
            return Err(DbmError::NotSquare(raw.len()));
        }
        expect_length("raw matrix", dimension * dimension, raw.len())?;

        let mut relations = Vec::with_capacity(raw.len());
        for (index, value) in raw.iter().enumerate() {
            let relation = Relation::from_raw(*value);
            if !relation.is_valid() {
                return Err(DbmError::InvalidRaw { index, raw: *value });
            }
            relations.push(relation);
        }

        trace!("imported {}x{} matrix", dimension, dimension);
        Ok(Self {
            dimension,
            relations: relations.into_boxed_slice(),
        })
    }

    /// Exports the row-major exchange format of encoded bounds.
    pub fn to_raw(&self) -> Vec<Limit> {
        self.relations.iter().map(|relation| relation.raw()).collect()
    }

    /// Overwrites self with the relations of other.
    pub fn copy_from(&mut self, other: &Self) -> Result<()> {
        expect_dimension(self.dimensions(), other.dimensions())?;
        self.relations.copy_from_slice(&other.relations);
        Ok(())
    }

    pub fn is_equal_to_init(&self) -> bool {
        *self == Self::init(self.dimensions())
    }

    /// Returns true if the origin (all clocks zero) is included.
    pub fn has_zero(&self) -> bool {
        self.relations.iter().all(|relation| *relation >= LE_ZERO)
    }

    pub fn is_equal_to_zero(&self) -> bool {
        self.relations.iter().all(|relation| relation.is_zero())
    }

    /// Overwrites the DBM with the canonical empty zone where every cell is (-1, <).
    #[inline]
    pub(crate) fn mark_empty(&mut self) {
        self.relations.fill(Relation::new(-1, Strictness::Strict));
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        (REFERENCE..self.dimensions()).any(|c| self[(c, c)] < LE_ZERO)
    }

    /// Floyd-Warshall with early exit. Returns false and marks the DBM empty
    /// if a negative cycle is found.
    pub fn close(&mut self) -> bool {
        let dim = self.dimensions();
        for k in REFERENCE..dim {
            if !self.close_pivot(k) {
                return false;
            }
        }

        if self.is_empty() {
            self.mark_empty();
            return false;
        }
        true
    }

    /// Closes with only the touched clocks as pivots.
    pub fn closex(&mut self, touched: &BitSet) -> bool {
        trace!("closex over {} touched clocks", touched.count());
        for k in REFERENCE..self.dimensions() {
            if touched.test(k) && !self.close_pivot(k) {
                return false;
            }
        }

        if self.is_empty() {
            self.mark_empty();
            return false;
        }
        true
    }

    /// One relaxation round of Floyd-Warshall through the pivot k.
    fn close_pivot(&mut self, k: Clock) -> bool {
        let dim = self.dimensions();
        for i in REFERENCE..dim {
            if i == k {
                continue;
            }

            let ik = self[(i, k)];
            if ik.is_infinity() {
                continue;
            }

            for j in REFERENCE..dim {
                let kj = self[(k, j)];
                if kj.is_infinity() {
                    continue;
                }

                let ikj = ik.add_finite(&kj);
                if self[(i, j)] > ikj {
                    self.set(i, j, ikj);
                }
            }

            if self[(i, i)] < LE_ZERO {
                debug!("negative cycle through clocks {} and {}", i, k);
                self.mark_empty();
                return false;
            }
        }
        true
    }

    /// Restores closure when only row and column k of a closed DBM changed.
    pub fn close1(&mut self, k: Clock) -> bool {
        trace!("close1 on clock {}", k);
        let dim = self.dimensions();

        // The row: shortest paths leaving k.
        for j in REFERENCE..dim {
            for m in REFERENCE..dim {
                let km = self[(k, m)];
                let mj = self[(m, j)];
                if km.is_infinity() || mj.is_infinity() {
                    continue;
                }

                let kmj = km.add_finite(&mj);
                if self[(k, j)] > kmj {
                    self.set(k, j, kmj);
                }
            }
        }

        // The column: shortest paths entering k.
        for i in REFERENCE..dim {
            for m in REFERENCE..dim {
                let im = self[(i, m)];
                let mk = self[(m, k)];
                if im.is_infinity() || mk.is_infinity() {
                    continue;
                }

                let imk = im.add_finite(&mk);
                if self[(i, k)] > imk {
                    self.set(i, k, imk);
                }
            }
        }

        if self[(k, k)] < LE_ZERO {
            debug!("negative cycle through clock {}", k);
            self.mark_empty();
            return false;
        }

        if !self.close_pivot(k) {
            return false;
        }

        if self.is_empty() {
            self.mark_empty();
            return false;
        }
        true
    }

    /// Restores closure when only the cell (i, j) of a closed DBM was tightened.
    pub fn close_ij(&mut self, i: Clock, j: Clock) -> bool {
        trace!("close_ij on ({}, {})", i, j);
        let ij = self[(i, j)];
        if ij.is_infinity() {
            return !self.is_empty();
        }

        if ij.add_finite_raw(&self[(j, i)]) < LE_ZERO {
            debug!("negative cycle through ({}, {})", i, j);
            self.mark_empty();
            return false;
        }

        let dim = self.dimensions();
        for p in REFERENCE..dim {
            let pi = self[(p, i)];
            if pi.is_infinity() {
                continue;
            }

            let pij = pi.add_finite(&ij);
            for q in REFERENCE..dim {
                let jq = self[(j, q)];
                if jq.is_infinity() {
                    continue;
                }

                let pq = pij.add_finite(&jq);
                if self[(p, q)] > pq {
                    self.set(p, q, pq);
                }
            }
        }

        !self.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        let mut closed = self.clone();
        closed.close() && closed.relations == self.relations
    }

    /// Returns true if no diagonal cell is looser than (0, ≤).
    pub fn is_diagonal_ok(&self) -> bool {
        (REFERENCE..self.dimensions()).all(|c| self[(c, c)] <= LE_ZERO)
    }

    /// Returns true if the DBM is a non-empty closed zone over non-negative
    /// clocks where every cell is a valid bound.
    pub fn is_valid(&self) -> bool {
        !self.is_empty()
            && self.relations.iter().all(|relation| relation.is_valid())
            && (REFERENCE..self.dimensions()).all(|c| self.lower(c) <= LE_ZERO)
            && self.is_closed()
    }

    /// Tightens a single cell without closing. The clocks of a changed cell
    /// are recorded in touched such that closure can be restored with [`DBM::closex`].
    pub fn constrain(&mut self, i: Clock, j: Clock, relation: Relation, touched: &mut BitSet) -> bool {
        if relation >= self[(i, j)] {
            return true;
        }

        if relation.negation() >= self[(j, i)] {
            debug!("constraining ({}, {}) to {} empties the zone", i, j, relation);
            self.mark_empty();
            return false;
        }

        self.set(i, j, relation);
        touched.set(i, true);
        touched.set(j, true);
        true
    }

    /// Only if the new relation tightens the existing relation
    /// is the relation updated and closed.
    pub fn constrain1(&mut self, i: Clock, j: Clock, relation: Relation) -> bool {
        if relation >= self[(i, j)] {
            return true;
        }

        if relation.negation() >= self[(j, i)] {
            debug!("constraining ({}, {}) to {} empties the zone", i, j, relation);
            self.mark_empty();
            return false;
        }

        self.set(i, j, relation);
        self.close_ij(i, j)
    }

    pub fn constrain_constraint(&mut self, constraint: &Constraint) -> bool {
        self.constrain1(constraint.i, constraint.j, constraint.value)
    }

    /// Applies all constraints followed by a single closure.
    pub fn constrain_n(&mut self, constraints: &[Constraint]) -> bool {
        let mut touched = BitSet::with_capacity(self.dimensions());
        for constraint in constraints {
            if !self.constrain(constraint.i, constraint.j, constraint.value, &mut touched) {
                return false;
            }
        }

        if !touched.any() {
            return true;
        }
        self.closex(&touched)
    }

    /// Like [`DBM::constrain_n`] but the clocks of the constraints are
    /// translated through the index table first.
    pub fn constrain_indexed_n(&mut self, table: &[Clock], constraints: &[Constraint]) -> Result<bool> {
        let mut translated = Vec::with_capacity(constraints.len());
        for constraint in constraints {
            let i = self.translate(table, constraint.i)?;
            let j = self.translate(table, constraint.j)?;
            translated.push(Constraint::new(i, j, constraint.value));
        }
        Ok(self.constrain_n(&translated))
    }

    fn translate(&self, table: &[Clock], index: Clock) -> Result<Clock> {
        let clock = table.get(index).copied().ok_or(DbmError::InvalidIndex {
            index,
            dim: table.len(),
        })?;

        if clock >= self.dimensions() {
            return Err(DbmError::InvalidIndex {
                index: clock,
                dim: self.dimensions(),
            });
        }
        Ok(clock)
    }

    /// Constrains the clock to be exactly the value.
    pub fn constrain_clock(&mut self, clock: Clock, value: Limit) -> bool {
        self.constrain_n(&[
            Constraint::upper(clock, Relation::weak(value)),
            Constraint::lower(clock, Relation::weak(-value)),
        ])
    }

    /// Returns true if the zone intersects `x_i - x_j ⋈ relation`.
    pub fn satisfies(&self, i: Clock, j: Clock, relation: Relation) -> bool {
        let ij = self[(i, j)];
        let ji = self[(j, i)];
        ij <= relation || ji > relation.negation()
    }

    pub fn satisfies_constraint(&self, constraint: &Constraint) -> bool {
        self.satisfies(constraint.i, constraint.j, constraint.value)
    }

    /// Returns false if a pair of bounds from the two DBMs refute each other.
    /// True means that they might intersect.
    pub fn maybe_intersects(&self, other: &Self) -> Result<bool> {
        expect_dimension(self.dimensions(), other.dimensions())?;

        for i in REFERENCE + 1..self.dimensions() {
            for j in REFERENCE..i {
                let ij1 = self[(i, j)];
                if !ij1.is_infinity() && ij1.negation() >= other[(j, i)] {
                    return Ok(false);
                }

                let ij2 = other[(i, j)];
                if !ij2.is_infinity() && ij2.negation() >= self[(j, i)] {
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }

    /// Exact intersection written into self. Returns false if it is empty.
    pub fn intersection(&mut self, other: &Self) -> Result<bool> {
        expect_dimension(self.dimensions(), other.dimensions())?;

        if self.is_empty() || other.is_empty() {
            self.mark_empty();
            return Ok(false);
        }

        let mut touched = BitSet::with_capacity(self.dimensions());
        for i in REFERENCE..self.dimensions() {
            for j in REFERENCE..self.dimensions() {
                let src = other[(i, j)];
                if self[(i, j)] > src {
                    self.set(i, j, src);
                    if src.negation() >= self[(j, i)] {
                        debug!("intersection refuted at ({}, {})", i, j);
                        self.mark_empty();
                        return Ok(false);
                    }
                    touched.set(i, true);
                    touched.set(j, true);
                }
            }
        }

        if !touched.any() {
            return Ok(true);
        }
        Ok(self.closex(&touched))
    }

    /// Returns true if the DBMs intersect without modifying either.
    pub fn have_intersection(&self, other: &Self) -> Result<bool> {
        if !self.maybe_intersects(other)? {
            return Ok(false);
        }
        self.clone().intersection(other)
    }

    /// The smallest zone containing both, the pointwise loosest bounds.
    /// This over-approximates the union and stays closed.
    pub fn convex_union(&mut self, other: &Self) -> Result<()> {
        expect_dimension(self.dimensions(), other.dimensions())?;

        if other.is_empty() {
            return Ok(());
        }

        if self.is_empty() {
            return self.copy_from(other);
        }

        for (lhs, rhs) in self.relations.iter_mut().zip(other.relations.iter()) {
            if *lhs < *rhs {
                *lhs = *rhs;
            }
        }
        Ok(())
    }

    /// Writes into self the closed intersection of a and b where every
    /// finite bound has been relaxed to its weak version.
    pub fn relaxed_intersection(&mut self, a: &Self, b: &Self) -> Result<bool> {
        expect_dimension(self.dimensions(), a.dimensions())?;
        expect_dimension(self.dimensions(), b.dimensions())?;

        if a.is_empty() || b.is_empty() {
            self.mark_empty();
            return Ok(false);
        }

        for (index, (lhs, rhs)) in a.relations.iter().zip(b.relations.iter()).enumerate() {
            self.relations[index] = relax(*lhs).min(relax(*rhs));
        }
        Ok(self.close())
    }

    /// Formats the zone as a conjunction of bounds, labels name the non-reference clocks.
    pub fn fmt_conjunctions(&self, labels: &[&str]) -> String {
        let mut conjunctions: Vec<String> = Vec::new();

        for i in REFERENCE + 1..self.dimensions() {
            // Lower bound: 0 - c R N.
            let lower = self.lower(i);
            if !lower.is_infinity() && !lower.is_zero() {
                conjunctions.push(format!(
                    "-{} {} {}",
                    labels[i - 1],
                    lower.strictness(),
                    lower.limit()
                ));
            }

            // Upper bound: c - 0 R N.
            let upper = self.upper(i);
            if !upper.is_infinity() {
                conjunctions.push(format!(
                    "{} {} {}",
                    labels[i - 1],
                    upper.strictness(),
                    upper.limit()
                ));
            }

            for j in REFERENCE + 1..self.dimensions() {
                let relation = self[(i, j)];
                if i == j || relation.is_infinity() {
                    continue;
                }

                // Difference constraints: c0 - c1 R N.
                conjunctions.push(format!(
                    "{} - {} {} {}",
                    labels[i - 1],
                    labels[j - 1],
                    relation.strictness(),
                    relation.limit()
                ));
            }
        }

        conjunctions.iter().join(" ∧ ")
    }
}

/// The weak version of finite bounds, infinity is kept as is.
#[inline]
pub(crate) fn relax(relation: Relation) -> Relation {
    if relation.is_infinity() {
        return relation;
    }
    relation.as_weak()
}

impl Index<(Clock, Clock)> for DBM {
    type Output = Relation;

    fn index(&self, index: (Clock, Clock)) -> &Self::Output {
        let (i, j) = index;
        &self.relations[self.index(i, j)]
    }
}

impl IndexMut<(Clock, Clock)> for DBM {
    fn index_mut(&mut self, index: (Clock, Clock)) -> &mut Self::Output {
        let (i, j) = index;
        let index = self.index(i, j);
        &mut self.relations[index]
    }
}

impl PartialEq for DBM {
    fn eq(&self, other: &Self) -> bool {
        if self.dimension != other.dimension {
            return false;
        }
        self.relations == other.relations || (self.is_empty() && other.is_empty())
    }
}

impl Eq for DBM {}

impl Hash for DBM {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dimension.hash(state);
        if self.is_empty() {
            // Leftover cells of an empty zone carry no meaning.
            return;
        }
        self.relations.hash(state);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use bitset::BitSet;
    use rand::Rng;
    use test_log::test;

    use crate::zones::{
        constraint::{
            Constraint, Relation, Strictness, LE_ZERO, LS_INFINITY, LS_NEGATIVE_OVERFLOW, OVERFLOW,
            REFERENCE,
        },
        error::DbmError,
    };

    use super::DBM;

    /// 1 < x < 3, 2 < y < 3, x - y < 1, y - x < 2.
    pub(crate) fn dbm1() -> DBM {
        let mut dbm = DBM::init(3);
        dbm.set_lower(1, Relation::new(-1, Strictness::Strict));
        dbm.set_upper(1, Relation::new(3, Strictness::Strict));
        dbm.set_lower(2, Relation::new(-2, Strictness::Strict));
        dbm.set_upper(2, Relation::new(3, Strictness::Strict));
        dbm.set(1, 2, Relation::new(1, Strictness::Strict));
        dbm.set(2, 1, Relation::new(2, Strictness::Strict));
        assert!(dbm.close(), "dbm1 invalid");
        dbm
    }

    /// x ≤ 3, y ≤ 4.
    pub(crate) fn dbm3() -> DBM {
        let mut dbm = DBM::init(3);
        dbm.set_upper(1, Relation::weak(3));
        dbm.set_upper(2, Relation::weak(4));
        assert!(dbm.close(), "dbm3 invalid");
        dbm
    }

    /// x ≤ 1, y ≤ 2.
    pub(crate) fn dbm4() -> DBM {
        let mut dbm = DBM::init(3);
        dbm.set_upper(1, Relation::weak(1));
        dbm.set_upper(2, Relation::weak(2));
        assert!(dbm.close(), "dbm4 invalid");
        dbm
    }

    /// Fills every off-diagonal cell with either a random finite relation or infinity.
    pub(crate) fn random_dbm(dimension: usize) -> DBM {
        let mut rng = rand::thread_rng();
        let mut dbm = DBM::init(dimension);
        for i in REFERENCE..dimension {
            for j in REFERENCE..dimension {
                if i != j && rng.gen_bool(0.5) {
                    let relation: Relation = rng.gen();
                    if relation < dbm[(i, j)] {
                        dbm[(i, j)] = relation;
                    }
                }
            }
        }
        dbm
    }

    #[test]
    fn init_is_unconstrained_and_closed() {
        let dbm = DBM::init(3);
        assert_eq!(3, dbm.dimensions());
        assert_eq!(2, dbm.clocks());
        assert_eq!(LE_ZERO, dbm[(0, 0)]);
        assert_eq!(LE_ZERO, dbm[(0, 2)]);
        assert_eq!(LS_INFINITY, dbm[(2, 0)]);
        assert_eq!(LS_INFINITY, dbm[(1, 2)]);
        assert!(dbm.is_closed());
        assert!(dbm.is_equal_to_init());
        assert!(dbm.has_zero());
        assert!(!dbm.is_equal_to_zero());
        assert!(dbm.is_valid());
        assert!(!dbm.is_empty());
    }

    #[test]
    fn zero_contains_only_the_origin() {
        let dbm = DBM::zero(3);
        assert!(dbm.is_equal_to_zero());
        assert!(dbm.has_zero());
        assert!(dbm.is_closed());
        assert!(!dbm.is_equal_to_init());
    }

    #[test]
    fn dimension_one_is_just_the_reference_clock() {
        let mut dbm = DBM::init(1);
        assert_eq!(0, dbm.clocks());
        assert!(dbm.close());
        assert_eq!(DBM::zero(1), dbm);
    }

    #[test]
    fn from_relations_must_be_square() {
        let relations = vec![LE_ZERO; 5].into_boxed_slice();
        assert_eq!(Err(DbmError::NotSquare(5)), DBM::from_relations(relations));

        let relations = vec![LE_ZERO; 9].into_boxed_slice();
        assert_eq!(DBM::zero(3), DBM::from_relations(relations).unwrap());
    }

    #[test]
    fn raw_exchange_format() {
        let dbm = dbm1();
        let raw = dbm.to_raw();
        assert_eq!(9, raw.len());
        assert_eq!(dbm, DBM::from_raw(3, &raw).unwrap());

        assert_eq!(
            Err(DbmError::SideArrayLength {
                name: "raw matrix",
                expected: 9,
                actual: 4
            }),
            DBM::from_raw(3, &raw[..4])
        );

        let mut invalid = raw.clone();
        invalid[4] = LS_INFINITY.raw() - 1;
        assert_eq!(
            Err(DbmError::InvalidRaw {
                index: 4,
                raw: LS_INFINITY.raw() - 1
            }),
            DBM::from_raw(3, &invalid)
        );
    }

    #[test]
    fn copy_from_requires_equal_dimension() {
        let mut dst = DBM::init(3);
        assert!(dst.copy_from(&dbm1()).is_ok());
        assert_eq!(dbm1(), dst);
        assert!(dst.copy_from(&DBM::init(2)).is_err());
    }

    #[test]
    fn dbm1_is_closed() {
        let dbm = dbm1();
        assert!(dbm.is_closed());
        assert_eq!(
            "-x < -1 ∧ x < 3 ∧ x - y < 1 ∧ -y < -2 ∧ y < 3 ∧ y - x < 2",
            dbm.fmt_conjunctions(&["x", "y"])
        );
    }

    #[test]
    fn close_derives_implied_bounds() {
        let mut dbm = DBM::init(3);
        dbm.set_upper(1, Relation::weak(10));
        dbm.set(2, 1, Relation::strict(5));
        assert!(!dbm.is_closed());
        assert!(dbm.close());
        assert_eq!(Relation::strict(15), dbm.upper(2));
        assert!(dbm.is_closed());
    }

    #[test]
    fn close_detects_negative_cycle() {
        let mut dbm = DBM::init(2);
        dbm.set_upper(1, Relation::weak(3));
        dbm.set_lower(1, Relation::strict(-5));
        assert!(!dbm.close());
        assert!(dbm.is_empty());
        assert!(!dbm.is_valid());
    }

    #[test]
    fn close_detects_strict_zero_cycle() {
        let mut dbm = DBM::init(2);
        dbm.set_upper(1, Relation::weak(3));
        dbm.set_lower(1, Relation::strict(-3));
        assert!(!dbm.close());
        assert!(dbm.is_empty());
    }

    #[test]
    fn closure_is_idempotent_on_random_dbms() {
        for _ in 0..500 {
            let mut dbm = random_dbm(4);
            if !dbm.close() {
                assert!(dbm.is_empty());
                continue;
            }

            let closed = dbm.clone();
            assert!(dbm.close());
            assert_eq!(closed, dbm);

            for i in REFERENCE..4 {
                for j in REFERENCE..4 {
                    for k in REFERENCE..4 {
                        assert!(dbm[(i, j)] <= dbm[(i, k)] + dbm[(k, j)]);
                    }
                }
            }
        }
    }

    #[test]
    fn closex_with_every_clock_touched_equals_close() {
        for _ in 0..200 {
            let mut full = random_dbm(4);
            let mut partial = full.clone();
            let mut touched = BitSet::with_capacity(4);
            for clock in REFERENCE..4 {
                touched.set(clock, true);
            }

            let nonempty = full.close();
            assert_eq!(nonempty, partial.closex(&touched));
            if nonempty {
                assert_eq!(full, partial);
            }
        }
    }

    #[test]
    fn close1_restores_closure_after_changing_one_clock() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let mut dbm = random_dbm(4);
            if !dbm.close() {
                continue;
            }

            let k = rng.gen_range(1..4);
            for other in REFERENCE..4 {
                if other != k && rng.gen_bool(0.5) {
                    let relation: Relation = rng.gen();
                    if relation < dbm[(k, other)] {
                        dbm[(k, other)] = relation;
                    }
                }
            }

            let mut expected = dbm.clone();
            let nonempty = expected.close();
            assert_eq!(nonempty, dbm.close1(k));
            if nonempty {
                assert_eq!(expected, dbm);
            }
        }
    }

    #[test]
    fn close_ij_restores_closure_after_tightening_one_cell() {
        let mut dbm = dbm3();
        dbm.set(1, 2, Relation::weak(-1));
        assert!(dbm.close_ij(1, 2));

        let mut expected = dbm3();
        expected.set(1, 2, Relation::weak(-1));
        assert!(expected.close());
        assert_eq!(expected, dbm);
        assert_eq!(Relation::weak(-1), dbm.lower(2));
    }

    #[test]
    fn constrain1_tightens_and_closes() {
        let mut dbm = DBM::init(3);
        assert!(dbm.constrain1(1, 0, Relation::weak(10)));
        assert!(dbm.constrain1(2, 1, Relation::strict(5)));
        assert_eq!(Relation::strict(15), dbm.upper(2));
        assert!(dbm.is_closed());

        // Looser constraints are no-ops.
        let before = dbm.clone();
        assert!(dbm.constrain1(1, 0, Relation::weak(20)));
        assert_eq!(before, dbm);

        assert!(!dbm.constrain1(0, 1, Relation::strict(-10)));
        assert!(dbm.is_empty());
    }

    #[test]
    fn constrain_defers_closure_to_closex() {
        let mut dbm = DBM::init(3);
        let mut touched = BitSet::with_capacity(3);
        assert!(dbm.constrain(1, 0, Relation::weak(10), &mut touched));
        assert!(dbm.constrain(2, 1, Relation::strict(5), &mut touched));
        assert!(touched.test(0) && touched.test(1) && touched.test(2));
        assert_eq!(LS_INFINITY, dbm.upper(2));

        assert!(dbm.closex(&touched));
        assert_eq!(Relation::strict(15), dbm.upper(2));
    }

    #[test]
    fn constrain_n_matches_one_at_a_time() {
        let constraints = [
            Constraint::bound(1, 0, 10, Strictness::Weak),
            Constraint::bound(2, 1, 5, Strictness::Strict),
            Constraint::bound(0, 2, -3, Strictness::Weak),
        ];

        let mut batch = DBM::init(3);
        assert!(batch.constrain_n(&constraints));

        let mut single = DBM::init(3);
        for constraint in constraints.iter() {
            assert!(single.constrain_constraint(constraint));
        }

        assert_eq!(single, batch);
    }

    #[test]
    fn constrain_indexed_n_translates_clocks() {
        let mut dbm = DBM::init(3);
        let table = [0, 2, 1];
        let constraints = [Constraint::bound(1, 0, 4, Strictness::Weak)];
        assert_eq!(Ok(true), dbm.constrain_indexed_n(&table, &constraints));
        assert_eq!(Relation::weak(4), dbm.upper(2));
        assert_eq!(LS_INFINITY, dbm.upper(1));

        let out_of_table = [Constraint::bound(3, 0, 4, Strictness::Weak)];
        assert_eq!(
            Err(DbmError::InvalidIndex { index: 3, dim: 3 }),
            dbm.constrain_indexed_n(&table, &out_of_table)
        );

        let out_of_dbm = [0, 5];
        assert_eq!(
            Err(DbmError::InvalidIndex { index: 5, dim: 3 }),
            dbm.constrain_indexed_n(&out_of_dbm, &constraints)
        );
    }

    #[test]
    fn constrain_clock_fixes_a_value() {
        let mut dbm = DBM::init(3);
        assert!(dbm.constrain_clock(1, 5));
        assert_eq!(Relation::weak(5), dbm.upper(1));
        assert_eq!(Relation::weak(-5), dbm.lower(1));
        assert!(!dbm.constrain_clock(1, 6));
        assert!(dbm.is_empty());
    }

    #[test]
    fn satisfies_bounds() {
        let dbm = dbm3();
        assert!(dbm.satisfies(1, 0, Relation::weak(3)));
        assert!(dbm.satisfies(1, 0, Relation::weak(0)));
        assert!(dbm.satisfies(0, 1, Relation::weak(-3)));
        assert!(!dbm.satisfies(0, 1, Relation::strict(-3)));
        assert!(!dbm.satisfies_constraint(&Constraint::bound(0, 2, -5, Strictness::Weak)));
    }

    #[test]
    fn intersection_of_overlapping_zones() {
        let mut dbm = dbm3();
        let mut other = DBM::init(3);
        assert!(other.constrain1(0, 1, Relation::weak(-2)));

        assert_eq!(Ok(true), dbm.have_intersection(&other));
        assert_eq!(Ok(true), dbm.intersection(&other));
        assert_eq!(Relation::weak(-2), dbm.lower(1));
        assert_eq!(Relation::weak(3), dbm.upper(1));
        assert!(dbm.is_closed());
    }

    #[test]
    fn intersection_of_disjoint_zones() {
        let mut dbm = dbm4();
        let mut other = DBM::init(3);
        assert!(other.constrain1(0, 1, Relation::strict(-1)));

        assert_eq!(Ok(false), dbm.maybe_intersects(&other));
        assert_eq!(Ok(false), dbm.have_intersection(&other));
        assert_eq!(dbm4(), dbm);
        assert_eq!(Ok(false), dbm.intersection(&other));
        assert!(dbm.is_empty());
    }

    #[test]
    fn intersection_requires_equal_dimensions() {
        let mut dbm = DBM::init(3);
        assert_eq!(
            Err(DbmError::DimensionMismatch {
                expected: 3,
                actual: 4
            }),
            dbm.intersection(&DBM::init(4))
        );
        assert!(dbm.have_intersection(&DBM::init(2)).is_err());
    }

    #[test]
    fn convex_union_contains_both() {
        let mut union = dbm4();
        let mut other = DBM::init(3);
        assert!(other.constrain_n(&[
            Constraint::bound(0, 1, -5, Strictness::Weak),
            Constraint::bound(1, 0, 6, Strictness::Weak),
        ]));

        assert!(union.convex_union(&other).is_ok());
        assert!(union.is_closed());
        assert_eq!(Relation::weak(6), union.upper(1));
        assert_eq!(LE_ZERO, union.lower(1));
        for (lhs, rhs) in union.relations().iter().zip(dbm4().relations()) {
            assert!(lhs >= rhs);
        }
        assert!(union.convex_union(&DBM::init(2)).is_err());
    }

    #[test]
    fn convex_union_with_empty() {
        let mut empty = DBM::init(3);
        empty.mark_empty();

        let mut dbm = dbm3();
        assert!(dbm.convex_union(&empty).is_ok());
        assert_eq!(dbm3(), dbm);

        assert!(empty.convex_union(&dbm3()).is_ok());
        assert_eq!(dbm3(), empty);
    }

    #[test]
    fn relaxed_intersection_weakens_strict_bounds() {
        let mut a = DBM::init(2);
        assert!(a.constrain1(1, 0, Relation::strict(3)));
        let mut b = DBM::init(2);
        assert!(b.constrain1(0, 1, Relation::strict(-3)));

        let mut exact = a.clone();
        assert_eq!(Ok(false), exact.intersection(&b));

        let mut relaxed = DBM::init(2);
        assert_eq!(Ok(true), relaxed.relaxed_intersection(&a, &b));
        assert_eq!(Relation::weak(3), relaxed.upper(1));
        assert_eq!(Relation::weak(-3), relaxed.lower(1));
    }

    #[test]
    fn close_saturates_chained_extreme_bounds() {
        // x1 ≥ OVERFLOW, x2 - x1 ≥ OVERFLOW and x3 - x2 ≥ OVERFLOW.
        let extreme = Relation::weak(-OVERFLOW);
        let mut raw = DBM::init(4).to_raw();
        for (i, j) in [(0, 1), (1, 2), (2, 3)] {
            raw[i * 4 + j] = extreme.raw();
        }

        let mut dbm = DBM::from_raw(4, &raw).unwrap();
        assert!(dbm.relations().iter().all(|relation| relation.is_valid()));
        assert!(dbm.close());
        assert_eq!(extreme, dbm.lower(1));
        assert_eq!(LS_NEGATIVE_OVERFLOW, dbm.lower(2));
        assert_eq!(LS_NEGATIVE_OVERFLOW, dbm.lower(3));
        assert_eq!(LS_NEGATIVE_OVERFLOW, dbm[(1, 3)]);
        assert!(dbm.relations().iter().all(|relation| relation.is_valid()));
        assert!(dbm.is_closed());

        // An upper bound on the last clock closes a negative cycle through the saturated cells.
        assert!(!dbm.constrain1(3, 0, Relation::weak(5)));
        assert!(dbm.is_empty());
    }

    #[test]
    fn empty_zones_are_equal_and_hash_alike() {
        let mut a = DBM::init(3);
        a.set_upper(1, Relation::weak(3));
        a.set_lower(1, Relation::weak(-5));
        let mut b = DBM::init(3);
        b.set_upper(2, Relation::weak(3));
        b.set_lower(2, Relation::weak(-5));

        assert!(!a.close());
        assert!(!b.close());
        assert_eq!(Ok(true), a.are_equal(&b));
        assert_eq!(a, b);
        assert_eq!(a.hash_code(), b.hash_code());

        let mut c = dbm3();
        assert!(!c.constrain1(0, 2, Relation::strict(-4)));
        assert_eq!(a, c);
        assert_eq!(a.hash_code(), c.hash_code());

        // Emptiness does not erase the dimension.
        let mut d = DBM::init(2);
        d.mark_empty();
        assert_ne!(a, d);
        assert_ne!(a, dbm3());
    }

    #[test]
    fn diagonal_checks() {
        let mut dbm = dbm1();
        assert!(dbm.is_diagonal_ok());
        dbm.set(1, 1, Relation::weak(1));
        assert!(!dbm.is_diagonal_ok());
    }
}
