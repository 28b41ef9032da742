//! Difference Bound Matrices for representing zones of real-valued clocks
//! under difference constraints `x_i - x_j ⋈ c`.

pub mod zones;

pub use zones::{
    bounds::Bounds,
    constraint::{Clock, Constraint, Limit, Relation, Strictness},
    dbm::DBM,
    error::{DbmError, Result},
    relation::ZoneRelation,
};
