use std::collections::HashMap;
use std::sync::Arc;

use lingua_domain::DomainResult;
use lingua_domain::catalog::{LessonNode, ModuleNode, decode_id_list, decode_id_set};
use lingua_domain::error::DomainError;
use lingua_domain::ports::BoxFuture;
use lingua_domain::ports::content::ContentGraphRepository;
use metrics::counter;
use serde::Deserialize;
use serde_json::Value;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::Client;
use tokio::sync::RwLock;

const CONTENT_ROWS_SKIPPED_TOTAL: &str = "lingua_content_rows_skipped_total";

#[derive(Default)]
pub struct InMemoryContentGraphRepository {
    lessons: Arc<RwLock<HashMap<String, LessonNode>>>,
    modules: Arc<RwLock<HashMap<String, ModuleNode>>>,
}

impl InMemoryContentGraphRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(lessons: Vec<LessonNode>, modules: Vec<ModuleNode>) -> Self {
        Self {
            lessons: Arc::new(RwLock::new(
                lessons
                    .into_iter()
                    .map(|lesson| (lesson.lesson_id.clone(), lesson))
                    .collect(),
            )),
            modules: Arc::new(RwLock::new(
                modules
                    .into_iter()
                    .map(|module| (module.module_id.clone(), module))
                    .collect(),
            )),
        }
    }

    /// Inserts or replaces a lesson.
    pub async fn put_lesson(&self, lesson: LessonNode) {
        self.lessons
            .write()
            .await
            .insert(lesson.lesson_id.clone(), lesson);
    }

    /// Inserts or replaces a module.
    pub async fn put_module(&self, module: ModuleNode) {
        self.modules
            .write()
            .await
            .insert(module.module_id.clone(), module);
    }

    pub async fn remove_lesson(&self, lesson_id: &str) -> Option<LessonNode> {
        self.lessons.write().await.remove(lesson_id)
    }
}

impl ContentGraphRepository for InMemoryContentGraphRepository {
    fn list_lessons(
        &self,
        language: &str,
        active_only: bool,
    ) -> BoxFuture<'_, DomainResult<Vec<LessonNode>>> {
        let language = language.to_string();
        let lessons = self.lessons.clone();
        Box::pin(async move {
            let mut items: Vec<_> = lessons
                .read()
                .await
                .values()
                .filter(|lesson| lesson.language == language)
                .filter(|lesson| !active_only || lesson.is_active)
                .cloned()
                .collect();
            items.sort_by(|left, right| {
                left.order
                    .cmp(&right.order)
                    .then_with(|| left.lesson_id.cmp(&right.lesson_id))
            });
            Ok(items)
        })
    }

    fn list_modules(
        &self,
        language: &str,
        active_only: bool,
    ) -> BoxFuture<'_, DomainResult<Vec<ModuleNode>>> {
        let language = language.to_string();
        let modules = self.modules.clone();
        Box::pin(async move {
            let mut items: Vec<_> = modules
                .read()
                .await
                .values()
                .filter(|module| module.language == language)
                .filter(|module| !active_only || module.is_active)
                .cloned()
                .collect();
            items.sort_by(|left, right| {
                left.order
                    .cmp(&right.order)
                    .then_with(|| left.module_id.cmp(&right.module_id))
            });
            Ok(items)
        })
    }
}

#[derive(Clone)]
pub struct SurrealContentGraphRepository {
    client: Arc<Surreal<Client>>,
}

impl SurrealContentGraphRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    fn map_surreal_error(err: surrealdb::Error) -> DomainError {
        DomainError::UpstreamUnavailable(format!("surreal query failed: {err}"))
    }

    fn decode_lessons(rows: Vec<Value>) -> Vec<LessonNode> {
        rows.into_iter()
            .filter_map(|row| {
                let decoded = serde_json::from_value::<SurrealLessonRow>(row)
                    .map_err(|err| DomainError::Validation(format!("invalid lesson row: {err}")))
                    .and_then(SurrealLessonRow::into_node);
                skip_invalid("lesson", decoded)
            })
            .collect()
    }

    fn decode_modules(rows: Vec<Value>) -> Vec<ModuleNode> {
        rows.into_iter()
            .filter_map(|row| {
                let decoded = serde_json::from_value::<SurrealModuleRow>(row)
                    .map_err(|err| DomainError::Validation(format!("invalid module row: {err}")))
                    .and_then(SurrealModuleRow::into_node);
                skip_invalid("module", decoded)
            })
            .collect()
    }
}

/// A node whose stored lists cannot be decoded is left out of the graph,
/// which keeps it and everything depending on it locked.
fn skip_invalid<T>(table: &'static str, decoded: DomainResult<T>) -> Option<T> {
    match decoded {
        Ok(node) => Some(node),
        Err(err) => {
            counter!(CONTENT_ROWS_SKIPPED_TOTAL, "table" => table).increment(1);
            tracing::warn!(table, error = %err, "skipping undecodable content row");
            None
        }
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct SurrealLessonRow {
    lesson_id: String,
    language: String,
    title: String,
    #[serde(default)]
    prerequisites: Value,
    #[serde(default)]
    position: i64,
    #[serde(default = "default_active")]
    is_active: bool,
}

impl SurrealLessonRow {
    fn into_node(self) -> DomainResult<LessonNode> {
        let prerequisites = decode_id_set(&self.prerequisites).map_err(|err| {
            DomainError::Validation(format!("lesson '{}': {err}", self.lesson_id))
        })?;
        Ok(LessonNode {
            lesson_id: self.lesson_id,
            language: self.language,
            title: self.title,
            prerequisites,
            order: self.position,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SurrealModuleRow {
    module_id: String,
    language: String,
    title: String,
    #[serde(default)]
    member_lessons: Value,
    #[serde(default)]
    prerequisites: Value,
    #[serde(default)]
    position: i64,
    #[serde(default = "default_active")]
    is_active: bool,
}

impl SurrealModuleRow {
    fn into_node(self) -> DomainResult<ModuleNode> {
        let member_lessons = decode_id_list(&self.member_lessons).map_err(|err| {
            DomainError::Validation(format!("module '{}': {err}", self.module_id))
        })?;
        let prerequisites = decode_id_set(&self.prerequisites).map_err(|err| {
            DomainError::Validation(format!("module '{}': {err}", self.module_id))
        })?;
        Ok(ModuleNode {
            module_id: self.module_id,
            language: self.language,
            title: self.title,
            order: self.position,
            member_lessons,
            prerequisites,
            is_active: self.is_active,
        })
    }
}

impl ContentGraphRepository for SurrealContentGraphRepository {
    fn list_lessons(
        &self,
        language: &str,
        active_only: bool,
    ) -> BoxFuture<'_, DomainResult<Vec<LessonNode>>> {
        let language = language.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "SELECT lesson_id, language, title, prerequisites, position, is_active \
                     FROM lesson \
                     WHERE language = $language AND ($active_only = false OR is_active = true) \
                     ORDER BY position ASC, lesson_id ASC",
                )
                .bind(("language", language))
                .bind(("active_only", active_only))
                .await
                .map_err(Self::map_surreal_error)?;
            let rows: Vec<Value> = response
                .take(0)
                .map_err(|err| DomainError::Validation(format!("invalid query result: {err}")))?;
            Ok(Self::decode_lessons(rows))
        })
    }

    fn list_modules(
        &self,
        language: &str,
        active_only: bool,
    ) -> BoxFuture<'_, DomainResult<Vec<ModuleNode>>> {
        let language = language.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "SELECT module_id, language, title, member_lessons, prerequisites, position, is_active \
                     FROM module \
                     WHERE language = $language AND ($active_only = false OR is_active = true) \
                     ORDER BY position ASC, module_id ASC",
                )
                .bind(("language", language))
                .bind(("active_only", active_only))
                .await
                .map_err(Self::map_surreal_error)?;
            let rows: Vec<Value> = response
                .take(0)
                .map_err(|err| DomainError::Validation(format!("invalid query result: {err}")))?;
            Ok(Self::decode_modules(rows))
        })
    }
}
