use std::collections::HashMap;

use crate::DomainResult;
use crate::completion::CompletionFact;
use crate::ports::BoxFuture;

pub trait CompletionFactRepository: Send + Sync {
    /// All facts recorded for the learner, keyed by lesson id.
    fn list_for_user(
        &self,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<HashMap<String, CompletionFact>>>;

    /// Records one attempt. Must be atomic per (user, lesson): concurrent
    /// calls never produce two rows and never lose an attempt increment.
    fn upsert(
        &self,
        user_id: &str,
        lesson_id: &str,
        completed: bool,
        score: Option<i64>,
    ) -> BoxFuture<'_, DomainResult<CompletionFact>>;
}
