// Outcome - explicit result for best-effort cleaning steps
//
// A cleaning step either produces a new value or leaves its input alone and
// says why. Callers decide what "unchanged" means for them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome<T> {
    Ok(T),
    Unchanged(String),
}

impl<T> Outcome<T> {
    pub fn unchanged(reason: impl Into<String>) -> Self {
        Outcome::Unchanged(reason.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    /// Reason the step did not apply, if it didn't
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Unchanged(reason) => Some(reason),
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(value) => Some(value),
            Outcome::Unchanged(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Ok(value) => Outcome::Ok(f(value)),
            Outcome::Unchanged(reason) => Outcome::Unchanged(reason),
        }
    }

    /// Take the produced value, or fall back to `original`
    pub fn unwrap_or(self, original: T) -> T {
        match self {
            Outcome::Ok(value) => value,
            Outcome::Unchanged(_) => original,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchanged_keeps_reason() {
        let outcome: Outcome<String> = Outcome::unchanged("no date shape matched");
        assert!(!outcome.is_ok());
        assert_eq!(outcome.reason(), Some("no date shape matched"));
        assert_eq!(outcome.unwrap_or("raw".to_string()), "raw");
    }

    #[test]
    fn test_map_applies_only_to_ok() {
        let doubled = Outcome::Ok(21).map(|v| v * 2);
        assert_eq!(doubled, Outcome::Ok(42));

        let skipped: Outcome<i32> = Outcome::<i32>::unchanged("skip").map(|v| v * 2);
        assert_eq!(skipped.reason(), Some("skip"));
    }
}
