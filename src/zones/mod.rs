pub mod bounds;
pub mod constraint;
pub mod dbm;
pub mod error;
pub mod extrapolation;
pub mod relation;
pub mod update;
