use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;

/// Outcome of a learner's attempts on one lesson. One row per (user, lesson).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionFact {
    pub user_id: String,
    pub lesson_id: String,
    pub completed: bool,
    pub score: Option<i64>,
    pub attempts: u32,
    pub completed_at_ms: Option<i64>,
    pub updated_at_ms: i64,
}

impl CompletionFact {
    pub fn first_attempt(
        user_id: impl Into<String>,
        lesson_id: impl Into<String>,
        completed: bool,
        score: Option<i64>,
        now_ms: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            lesson_id: lesson_id.into(),
            completed,
            score,
            attempts: 1,
            completed_at_ms: completed.then_some(now_ms),
            updated_at_ms: now_ms,
        }
    }

    /// Applies a later attempt. `completed_at_ms` is stamped only on the
    /// false -> true transition and dropped when an attempt overwrites
    /// `completed` with false.
    pub fn apply_attempt(&mut self, completed: bool, score: Option<i64>, now_ms: i64) {
        self.attempts = self.attempts.saturating_add(1);
        self.completed_at_ms = match (self.completed, completed) {
            (false, true) => Some(now_ms),
            (true, true) => self.completed_at_ms.or(Some(now_ms)),
            (_, false) => None,
        };
        self.completed = completed;
        self.score = score;
        self.updated_at_ms = now_ms;
    }
}

pub fn validate_score(score: Option<i64>) -> DomainResult<()> {
    match score {
        Some(value) if !(MIN_SCORE..=MAX_SCORE).contains(&value) => {
            Err(DomainError::Validation(format!(
                "score must be between {MIN_SCORE} and {MAX_SCORE}"
            )))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_stamps_completion_only_when_completed() {
        let passed = CompletionFact::first_attempt("user-1", "l1", true, Some(90), 10);
        assert_eq!(passed.attempts, 1);
        assert_eq!(passed.completed_at_ms, Some(10));

        let failed = CompletionFact::first_attempt("user-1", "l2", false, Some(20), 10);
        assert_eq!(failed.completed_at_ms, None);
    }

    #[test]
    fn later_attempts_increment_and_overwrite() {
        let mut fact = CompletionFact::first_attempt("user-1", "l1", false, Some(40), 10);
        fact.apply_attempt(true, Some(80), 20);
        assert_eq!(fact.attempts, 2);
        assert!(fact.completed);
        assert_eq!(fact.score, Some(80));
        assert_eq!(fact.completed_at_ms, Some(20));

        fact.apply_attempt(true, Some(95), 30);
        assert_eq!(fact.attempts, 3);
        assert_eq!(fact.completed_at_ms, Some(20));
        assert_eq!(fact.updated_at_ms, 30);

        fact.apply_attempt(false, None, 40);
        assert!(!fact.completed);
        assert_eq!(fact.score, None);
        assert_eq!(fact.completed_at_ms, None);
    }

    #[test]
    fn score_bounds_are_enforced() {
        assert!(validate_score(None).is_ok());
        assert!(validate_score(Some(0)).is_ok());
        assert!(validate_score(Some(100)).is_ok());
        assert!(validate_score(Some(-1)).is_err());
        assert!(validate_score(Some(101)).is_err());
    }
}
