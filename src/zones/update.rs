use bitset::BitSet;
use log::trace;

use super::{
    constraint::{Clock, Limit, Relation, LE_ZERO, LS_INFINITY, REFERENCE},
    dbm::{relax, DBM},
    error::{expect_dimension, expect_length, DbmError, Result},
};

impl DBM {
    /// The up operation computes the strongest postcondition of a zone with respect to delay.
    /// Afterwards the DBM contains the clock assignments that can be reached from by delay.
    /// up(D) = {u + d | u ∈ D, d ∈ ℝ+}.
    /// This operation preserves the canonical form thereby applying it on a canonical DBM
    /// will result in a new canonical DBM.
    pub fn up(&mut self) {
        for i in REFERENCE + 1..self.dimensions() {
            self.set_upper(i, LS_INFINITY);
        }
    }

    /// Delay where the stopped clocks keep their values. Only differences between
    /// a running clock and a stopped clock (or the reference) lose their bound.
    pub fn up_stop(&mut self, stopped: &BitSet) {
        let dim = self.dimensions();
        for i in REFERENCE + 1..dim {
            if stopped.test(i) {
                continue;
            }

            for j in REFERENCE..dim {
                if j != i && (j == REFERENCE || stopped.test(j)) {
                    self.set(i, j, LS_INFINITY);
                }
            }
        }
    }

    /// In contrast to up, down computes the weakest precondition of the DBM with respect to delay.
    /// down(D) = {u | u + d ∈ D, d ∈ ℝ+} such that the set of clock assignments that can reach D
    /// by some delay d. The lower bound of each clock is lowered until some clock hits zero.
    pub fn down(&mut self) {
        self.down_from(REFERENCE + 1)
    }

    /// Computes the predecessors for the clocks from j0 onwards.
    pub fn down_from(&mut self, j0: Clock) {
        let dim = self.dimensions();
        for j in j0.max(REFERENCE + 1)..dim {
            let mut lower = LE_ZERO;
            for i in REFERENCE + 1..dim {
                if self[(i, j)] < lower {
                    lower = self[(i, j)];
                }
            }
            self.set_lower(j, lower);
        }
    }

    /// Past where the stopped clocks keep their values.
    pub fn down_stop(&mut self, stopped: &BitSet) {
        let dim = self.dimensions();
        for j in REFERENCE + 1..dim {
            if stopped.test(j) {
                continue;
            }

            for i in REFERENCE..dim {
                if i != j && (i == REFERENCE || stopped.test(i)) {
                    self.set(i, j, LS_INFINITY);
                }
            }
            self.set_lower(j, LE_ZERO);
        }
        self.close();
    }

    /// Removes all constraints on a given clock, i.e., the clock may take any positive value.
    /// This is expressed as {u[x=d] | u ∈ D, d ∈ ℝ+}.
    pub fn free_clock(&mut self, clock: Clock) {
        for i in REFERENCE..self.dimensions() {
            if i != clock {
                self.set(clock, i, LS_INFINITY);
                self.set(i, clock, self.upper(i));
            }
        }
    }

    /// Removes the upper bounds of the clock.
    pub fn free_up(&mut self, clock: Clock) {
        for i in REFERENCE..self.dimensions() {
            if i != clock {
                self.set(clock, i, LS_INFINITY);
            }
        }
    }

    /// Removes the lower bounds of the clock, it may go down to zero.
    pub fn free_down(&mut self, clock: Clock) {
        for i in REFERENCE..self.dimensions() {
            if i != clock {
                self.set(i, clock, self.upper(i));
            }
        }
    }

    pub fn free_all_up(&mut self) {
        let dim = self.dimensions();
        for i in REFERENCE + 1..dim {
            for j in REFERENCE..dim {
                if i != j {
                    self.set(i, j, LS_INFINITY);
                }
            }
        }
    }

    pub fn is_freed_all_up(&self) -> bool {
        let dim = self.dimensions();
        (REFERENCE + 1..dim).all(|i| (REFERENCE..dim).all(|j| i == j || self[(i, j)].is_infinity()))
    }

    pub fn free_all_down(&mut self) {
        let dim = self.dimensions();
        for j in REFERENCE + 1..dim {
            self.set_lower(j, LE_ZERO);
        }

        for i in REFERENCE + 1..dim {
            let upper = self.upper(i);
            for j in REFERENCE + 1..dim {
                if i != j {
                    self.set(i, j, upper);
                }
            }
        }
    }

    /// Returns true if [`DBM::free_all_down`] would not change the DBM.
    pub fn is_freed_all_down(&self) -> bool {
        let dim = self.dimensions();
        (REFERENCE + 1..dim).all(|j| self.lower(j) == LE_ZERO)
            && (REFERENCE + 1..dim).all(|i| {
                (REFERENCE + 1..dim).all(|j| i == j || self[(i, j)] == self.upper(i))
            })
    }

    /// Sets the clock to be assigned to its limit. This is expressed as {u[x=m] | u ∈ D}.
    /// Negative values leave the zone empty as clocks cannot go below zero.
    pub fn update_value(&mut self, clock: Clock, value: Limit) -> bool {
        let positive = Relation::weak(value);
        let negative = Relation::weak(-value);
        for i in REFERENCE..self.dimensions() {
            if i != clock {
                self.set(clock, i, positive.add_finite_raw(&self.lower(i)));
                self.set(i, clock, self.upper(i).add_raw_finite(&negative));
            }
        }

        self.cut_negative(clock, value)
    }

    /// Sets the lhs to be equal to the rhs. This is expressed as {u[x=u(y)] | u ∈ D}
    pub fn update_clock(&mut self, lhs: Clock, rhs: Clock) {
        if lhs == rhs {
            return;
        }

        for i in REFERENCE..self.dimensions() {
            if i != lhs {
                self.set(lhs, i, self[(rhs, i)]);
                self.set(i, lhs, self[(i, rhs)]);
            }
        }

        self.set(lhs, rhs, LE_ZERO);
        self.set(rhs, lhs, LE_ZERO);
    }

    /// Compound addition assignment of the clock "clock := clock + value".
    pub fn update_increment(&mut self, clock: Clock, value: Limit) -> bool {
        let offset = value << 1;
        for i in REFERENCE..self.dimensions() {
            if i != clock {
                self.set(clock, i, self[(clock, i)].increment(offset));
                self.set(i, clock, self[(i, clock)].decrement(offset));
            }
        }

        self.cut_negative(clock, value)
    }

    /// The general update "lhs := rhs + value".
    pub fn update(&mut self, lhs: Clock, rhs: Clock, value: Limit) -> bool {
        if lhs == rhs {
            return self.update_increment(lhs, value);
        }

        let positive = Relation::weak(value);
        let negative = Relation::weak(-value);
        for k in REFERENCE..self.dimensions() {
            if k != lhs {
                self.set(lhs, k, self[(rhs, k)].add_raw_finite(&positive));
                self.set(k, lhs, self[(k, rhs)].add_raw_finite(&negative));
            }
        }
        self.set(lhs, lhs, LE_ZERO);

        self.cut_negative(lhs, value)
    }

    /// Clocks cannot become negative, decreasing updates are intersected with `x ≥ 0`.
    fn cut_negative(&mut self, clock: Clock, value: Limit) -> bool {
        if value < 0 {
            return self.constrain1(REFERENCE, clock, LE_ZERO);
        }
        !self.is_empty()
    }

    /// Renames the clocks x and y into each other.
    pub fn swap_clocks(&mut self, x: Clock, y: Clock) {
        if x == y {
            return;
        }

        let dim = self.dimensions();
        for k in REFERENCE..dim {
            let xk = self[(x, k)];
            self.set(x, k, self[(y, k)]);
            self.set(y, k, xk);
        }

        for k in REFERENCE..dim {
            let kx = self[(k, x)];
            self.set(k, x, self[(k, y)]);
            self.set(k, y, kx);
        }
    }

    fn relax_where(&mut self, affected: impl Fn(Clock, Clock) -> bool) {
        let dim = self.dimensions();
        for i in REFERENCE..dim {
            for j in REFERENCE..dim {
                if i != j && affected(i, j) {
                    self.set(i, j, relax(self[(i, j)]));
                }
            }
        }
        self.close();
    }

    /// Weakens the upper bounds of the clock.
    pub fn relax_up_clock(&mut self, clock: Clock) {
        self.relax_where(|i, _| i == clock)
    }

    /// Weakens the lower bounds of the clock.
    pub fn relax_down_clock(&mut self, clock: Clock) {
        self.relax_where(|_, j| j == clock)
    }

    pub fn relax_all(&mut self) {
        self.relax_where(|_, _| true)
    }

    pub fn relax_up(&mut self) {
        self.relax_where(|_, j| j == REFERENCE)
    }

    pub fn relax_down(&mut self) {
        self.relax_where(|i, _| i == REFERENCE)
    }

    /// Constrains `x_i - x_j` by the relation and restores closure.
    pub fn tighten(&mut self, i: Clock, j: Clock, relation: Relation) -> bool {
        self.constrain1(i, j, relation)
    }

    fn tighten_where(&mut self, affected: impl Fn(Clock, Clock) -> bool) -> bool {
        let dim = self.dimensions();
        for i in REFERENCE..dim {
            for j in REFERENCE..dim {
                let relation = self[(i, j)];
                if i != j && affected(i, j) && !relation.is_infinity() {
                    self.set(i, j, relation.as_strict());
                }
            }
        }
        self.close()
    }

    /// Makes every finite upper bound strict.
    pub fn tighten_up(&mut self) -> bool {
        self.tighten_where(|_, j| j == REFERENCE)
    }

    /// Makes every finite lower bound strict.
    pub fn tighten_down(&mut self) -> bool {
        self.tighten_where(|i, _| i == REFERENCE)
    }

    /// Projects the clocks shared by src_clocks and dst_clocks into dst. Both masks
    /// are indexed by global clock and sized by the table, the reference clock must be
    /// in both. Clocks only present in dst are freed. The table receives the position
    /// of every global clock inside dst. Returns the number of copied cells.
    pub fn shrink_expand(
        &self,
        dst: &mut DBM,
        src_clocks: &BitSet,
        dst_clocks: &BitSet,
        table: &mut [Option<Clock>],
    ) -> Result<usize> {
        let globals = table.len();
        if globals == 0 || !src_clocks.test(REFERENCE) || !dst_clocks.test(REFERENCE) {
            return Err(DbmError::InvalidIndex {
                index: REFERENCE,
                dim: globals,
            });
        }

        let src_positions = positions(src_clocks, globals);
        let dst_positions = positions(dst_clocks, globals);
        expect_dimension(self.dimensions(), count(&src_positions))?;
        expect_dimension(dst.dimensions(), count(&dst_positions))?;

        table.copy_from_slice(&dst_positions);
        *dst = DBM::init(dst.dimensions());

        let mut copied = 0;
        for g1 in REFERENCE..globals {
            let (Some(s1), Some(d1)) = (src_positions[g1], dst_positions[g1]) else {
                continue;
            };
            for g2 in REFERENCE..globals {
                let (Some(s2), Some(d2)) = (src_positions[g2], dst_positions[g2]) else {
                    continue;
                };
                dst.set(d1, d2, self[(s1, s2)]);
                copied += 1;
            }
        }

        for g in REFERENCE..globals {
            if let (None, Some(d)) = (src_positions[g], dst_positions[g]) {
                dst.free_clock(d);
            }
        }

        trace!("shrink_expand copied {} cells into dimension {}", copied, dst.dimensions());
        Ok(copied)
    }

    /// Rebuilds self from src where clock i of self is clock `cols[i]` of src.
    /// Clocks mapped to `None` become free.
    pub fn update_dbm(&mut self, src: &DBM, cols: &[Option<Clock>]) -> Result<()> {
        let dim = self.dimensions();
        expect_length("column table", dim, cols.len())?;
        if cols[REFERENCE] != Some(REFERENCE) {
            return Err(DbmError::InvalidIndex {
                index: REFERENCE,
                dim: src.dimensions(),
            });
        }
        if let Some(&index) = cols.iter().flatten().find(|c| **c >= src.dimensions()) {
            return Err(DbmError::InvalidIndex {
                index,
                dim: src.dimensions(),
            });
        }

        *self = DBM::init(dim);
        for i in REFERENCE..dim {
            let Some(si) = cols[i] else { continue };
            for j in REFERENCE..dim {
                let Some(sj) = cols[j] else { continue };
                self.set(i, j, src[(si, sj)]);
            }
        }

        for (i, col) in cols.iter().enumerate() {
            if col.is_none() {
                self.free_clock(i);
            }
        }
        Ok(())
    }
}

/// The position of every selected global clock among the selected clocks.
fn positions(clocks: &BitSet, globals: usize) -> Vec<Option<Clock>> {
    let mut next = 0;
    (REFERENCE..globals)
        .map(|g| {
            if !clocks.test(g) {
                return None;
            }
            next += 1;
            Some(next - 1)
        })
        .collect()
}

fn count(positions: &[Option<Clock>]) -> usize {
    positions.iter().flatten().count()
}
