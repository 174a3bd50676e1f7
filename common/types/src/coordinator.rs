use std::fmt;

use accounts_constants::{COORDINATOR_TYPE_MAX_LEN, COORDINATOR_TYPE_MIN_LEN};

/// ASCII string of length 1..30 naming the originating subsystem of a
/// transfer (`direct`, `interest`, `agent`, `issuing`, ...). Validated once
/// at construction so every later read can assume it fits the wire budget.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoordinatorType(String);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoordinatorTypeError {
    #[error("coordinator_type must be 1..30 ASCII bytes, got {0}")]
    InvalidLength(usize),
    #[error("coordinator_type must be ASCII")]
    NotAscii,
}

impl CoordinatorType {
    pub fn new(raw: impl Into<String>) -> Result<Self, CoordinatorTypeError> {
        let raw = raw.into();
        if !raw.is_ascii() {
            return Err(CoordinatorTypeError::NotAscii);
        }
        if raw.len() < COORDINATOR_TYPE_MIN_LEN || raw.len() > COORDINATOR_TYPE_MAX_LEN {
            return Err(CoordinatorTypeError::InvalidLength(raw.len()));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CoordinatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_oversized() {
        assert!(CoordinatorType::new("").is_err());
        assert!(CoordinatorType::new("x".repeat(31)).is_err());
        assert!(CoordinatorType::new("direct").is_ok());
    }

    #[test]
    fn rejects_non_ascii() {
        assert_eq!(
            CoordinatorType::new("dïrect"),
            Err(CoordinatorTypeError::NotAscii)
        );
    }
}
