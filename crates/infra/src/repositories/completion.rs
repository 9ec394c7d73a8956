use std::collections::HashMap;
use std::sync::Arc;

use lingua_domain::DomainResult;
use lingua_domain::completion::CompletionFact;
use lingua_domain::error::DomainError;
use lingua_domain::ports::BoxFuture;
use lingua_domain::ports::completion::CompletionFactRepository;
use lingua_domain::util::now_ms;
use metrics::counter;
use serde::Deserialize;
use serde_json::{Value, json};
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::Client;
use tokio::sync::RwLock;

const COMPLETION_UPSERTS_TOTAL: &str = "lingua_completion_upserts_total";

type FactKey = (String, String);

#[derive(Default)]
pub struct InMemoryCompletionFactRepository {
    store: Arc<RwLock<HashMap<FactKey, CompletionFact>>>,
}

impl InMemoryCompletionFactRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompletionFactRepository for InMemoryCompletionFactRepository {
    fn list_for_user(
        &self,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<HashMap<String, CompletionFact>>> {
        let user_id = user_id.to_string();
        let store = self.store.clone();
        Box::pin(async move {
            let items = store.read().await;
            Ok(items
                .iter()
                .filter(|((owner, _), _)| *owner == user_id)
                .map(|((_, lesson_id), fact)| (lesson_id.clone(), fact.clone()))
                .collect())
        })
    }

    fn upsert(
        &self,
        user_id: &str,
        lesson_id: &str,
        completed: bool,
        score: Option<i64>,
    ) -> BoxFuture<'_, DomainResult<CompletionFact>> {
        let key = (user_id.to_string(), lesson_id.to_string());
        let store = self.store.clone();
        Box::pin(async move {
            // The write guard spans the read-modify-write.
            let mut items = store.write().await;
            let now = now_ms();
            let fact = match items.get_mut(&key) {
                Some(fact) => {
                    fact.apply_attempt(completed, score, now);
                    fact.clone()
                }
                None => {
                    let fact = CompletionFact::first_attempt(&key.0, &key.1, completed, score, now);
                    items.insert(key, fact.clone());
                    fact
                }
            };
            counter!(COMPLETION_UPSERTS_TOTAL, "backend" => "memory").increment(1);
            Ok(fact)
        })
    }
}

#[derive(Clone)]
pub struct SurrealCompletionFactRepository {
    client: Arc<Surreal<Client>>,
}

impl SurrealCompletionFactRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    /// Array record id `[user_id, lesson_id]`; ids containing separators
    /// cannot collide.
    fn fact_key(user_id: &str, lesson_id: &str) -> Value {
        json!([user_id, lesson_id])
    }

    fn map_surreal_error(err: surrealdb::Error) -> DomainError {
        DomainError::UpstreamUnavailable(format!("surreal query failed: {err}"))
    }

    fn decode_row(row: Value) -> DomainResult<CompletionFact> {
        let row = serde_json::from_value::<SurrealCompletionRow>(row)
            .map_err(|err| DomainError::Validation(format!("invalid completion row: {err}")))?;
        Ok(CompletionFact {
            user_id: row.user_id,
            lesson_id: row.lesson_id,
            completed: row.completed,
            score: row.score,
            attempts: row.attempts,
            completed_at_ms: row.completed_at_ms,
            updated_at_ms: row.updated_at_ms,
        })
    }

    /// Rows that fail to decode are dropped, so their lessons read as not
    /// completed.
    fn decode_rows(rows: Vec<Value>) -> HashMap<String, CompletionFact> {
        rows.into_iter()
            .filter_map(|row| match Self::decode_row(row) {
                Ok(fact) => Some((fact.lesson_id.clone(), fact)),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping undecodable completion row");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SurrealCompletionRow {
    user_id: String,
    lesson_id: String,
    #[serde(default)]
    completed: bool,
    score: Option<i64>,
    #[serde(default)]
    attempts: u32,
    completed_at_ms: Option<i64>,
    #[serde(default)]
    updated_at_ms: i64,
}

impl CompletionFactRepository for SurrealCompletionFactRepository {
    fn list_for_user(
        &self,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<HashMap<String, CompletionFact>>> {
        let user_id = user_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "SELECT user_id, lesson_id, completed, score, attempts, completed_at_ms, updated_at_ms \
                     FROM lesson_completion WHERE user_id = $user_id",
                )
                .bind(("user_id", user_id))
                .await
                .map_err(Self::map_surreal_error)?;
            let rows: Vec<Value> = response
                .take(0)
                .map_err(|err| DomainError::Validation(format!("invalid query result: {err}")))?;
            Ok(Self::decode_rows(rows))
        })
    }

    fn upsert(
        &self,
        user_id: &str,
        lesson_id: &str,
        completed: bool,
        score: Option<i64>,
    ) -> BoxFuture<'_, DomainResult<CompletionFact>> {
        let fact_key = Self::fact_key(user_id, lesson_id);
        let user_id = user_id.to_string();
        let lesson_id = lesson_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            // Single statement on a deterministic record id: concurrent
            // attempts serialize on the record and never duplicate it.
            // completed_at_ms is assigned before completed is overwritten.
            let mut response = client
                .query(
                    "UPSERT type::record('lesson_completion', $fact_key) SET \
                        user_id = $user_id, \
                        lesson_id = $lesson_id, \
                        attempts = (attempts ?? 0) + 1, \
                        completed_at_ms = IF $completed { \
                            IF completed = true { completed_at_ms ?? $now_ms } ELSE { $now_ms } \
                        } ELSE { NONE }, \
                        completed = $completed, \
                        score = $score, \
                        updated_at_ms = $now_ms \
                     RETURN user_id, lesson_id, completed, score, attempts, completed_at_ms, updated_at_ms",
                )
                .bind(("fact_key", fact_key))
                .bind(("user_id", user_id))
                .bind(("lesson_id", lesson_id))
                .bind(("completed", completed))
                .bind(("score", json!(score)))
                .bind(("now_ms", now_ms()))
                .await
                .map_err(Self::map_surreal_error)?;
            let mut rows: Vec<Value> = response
                .take(0)
                .map_err(|err| DomainError::Validation(format!("invalid query result: {err}")))?;
            let row = rows
                .pop()
                .ok_or_else(|| DomainError::Validation("upsert returned no row".to_string()))?;
            let fact = Self::decode_row(row)?;
            counter!(COMPLETION_UPSERTS_TOTAL, "backend" => "surreal").increment(1);
            Ok(fact)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_upsert_keeps_one_fact_per_lesson() {
        let repo = InMemoryCompletionFactRepository::new();
        let first = repo
            .upsert("user-1", "l1", false, Some(40))
            .await
            .expect("first attempt");
        assert_eq!(first.attempts, 1);
        assert_eq!(first.completed_at_ms, None);

        let second = repo
            .upsert("user-1", "l1", true, Some(85))
            .await
            .expect("second attempt");
        assert_eq!(second.attempts, 2);
        assert!(second.completed);
        assert!(second.completed_at_ms.is_some());

        repo.upsert("user-2", "l1", true, None)
            .await
            .expect("other learner");

        let facts = repo.list_for_user("user-1").await.expect("facts");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts["l1"].score, Some(85));
    }

    #[tokio::test]
    async fn concurrent_upserts_do_not_lose_attempts() {
        let repo = Arc::new(InMemoryCompletionFactRepository::new());
        let handles: Vec<_> = (0..16)
            .map(|index| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.upsert("user-1", "l1", index % 2 == 0, Some(index))
                        .await
                        .expect("upsert")
                })
            })
            .collect();
        for handle in handles {
            handle.await.expect("join");
        }

        let facts = repo.list_for_user("user-1").await.expect("facts");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts["l1"].attempts, 16);
    }

    #[test]
    fn completion_rows_decode_with_defaults() {
        let rows = vec![
            json!({
                "user_id": "user-1",
                "lesson_id": "l1",
                "completed": true,
                "score": 90,
                "attempts": 3,
                "completed_at_ms": 1_739_750_400_000_i64,
                "updated_at_ms": 1_739_750_400_000_i64,
            }),
            json!({
                "user_id": "user-1",
                "lesson_id": "l2",
                "score": null,
            }),
            json!({ "lesson_id": "l3" }),
        ];
        let facts = SurrealCompletionFactRepository::decode_rows(rows);
        assert_eq!(facts.len(), 2);
        assert_eq!(facts["l1"].attempts, 3);
        assert!(!facts["l2"].completed);
        assert_eq!(facts["l2"].completed_at_ms, None);
    }

    #[test]
    fn fact_keys_keep_user_and_lesson_apart() {
        let key = SurrealCompletionFactRepository::fact_key("u1", "a:b");
        assert_eq!(key, json!(["u1", "a:b"]));
        assert_ne!(key, SurrealCompletionFactRepository::fact_key("u1:a", "b"));
    }
}
