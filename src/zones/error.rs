use thiserror::Error;

use super::constraint::{Clock, Limit};

/// Failures of operations combining a DBM with another DBM or with
/// caller supplied side arrays. Infeasibility is not an error, it is
/// reported through the boolean results of the operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbmError {
    #[error("inconsistent DBM dimensions: expected {expected} but got {actual}")]
    DimensionMismatch { expected: Clock, actual: Clock },

    #[error("{name} has length {actual} but the DBM requires {expected}")]
    SideArrayLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{0} relations cannot form a square matrix")]
    NotSquare(usize),

    #[error("invalid raw bound {raw} at index {index}")]
    InvalidRaw { index: usize, raw: Limit },

    #[error("clock {index} is out of range for dimension {dim}")]
    InvalidIndex { index: Clock, dim: Clock },
}

pub type Result<T> = std::result::Result<T, DbmError>;

pub(crate) fn expect_dimension(expected: Clock, actual: Clock) -> Result<()> {
    if expected != actual {
        return Err(DbmError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

pub(crate) fn expect_length(name: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(DbmError::SideArrayLength {
            name,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn mismatch_messages() {
        assert_eq!(
            "inconsistent DBM dimensions: expected 3 but got 4",
            DbmError::DimensionMismatch {
                expected: 3,
                actual: 4
            }
            .to_string()
        );
        assert_eq!(
            "point has length 2 but the DBM requires 3",
            DbmError::SideArrayLength {
                name: "point",
                expected: 3,
                actual: 2
            }
            .to_string()
        );
        assert_eq!(
            "5 relations cannot form a square matrix",
            DbmError::NotSquare(5).to_string()
        );
    }

    #[test]
    fn expectations() {
        assert!(expect_dimension(3, 3).is_ok());
        assert_eq!(
            Err(DbmError::DimensionMismatch {
                expected: 3,
                actual: 2
            }),
            expect_dimension(3, 2)
        );
        assert!(expect_length("bounds", 2, 2).is_ok());
        assert!(expect_length("bounds", 2, 1).is_err());
    }
}
