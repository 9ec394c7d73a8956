use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures_util::future::{try_join, try_join3};
use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::catalog::{ContentKind, LessonNode, ModuleNode};
use crate::completion::{CompletionFact, validate_score};
use crate::error::DomainError;
use crate::integrity::{GraphIntegrityReport, check_integrity};
use crate::ports::completion::CompletionFactRepository;
use crate::ports::content::ContentGraphRepository;
use crate::prerequisites::{PrerequisiteDetail, PrerequisiteLookup, UnlockView, resolve};
use crate::progress::{ModuleProgress, aggregate, completion_percentage};
use crate::util::format_ms_rfc3339;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Completed,
    Unlocked,
    Locked,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Unlocked => "unlocked",
            Self::Locked => "locked",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::Unlocked => 1,
            Self::Locked => 2,
        }
    }

    fn from_flags(is_completed: bool, is_unlocked: bool) -> Self {
        if is_completed {
            Self::Completed
        } else if is_unlocked {
            Self::Unlocked
        } else {
            Self::Locked
        }
    }
}

/// One catalog entry as the presentation layer consumes it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemView {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    pub order: i64,
    pub status: ItemStatus,
    pub is_unlocked: bool,
    pub is_completed: bool,
    pub unmet_prerequisites: Vec<String>,
    pub prerequisite_details: Vec<PrerequisiteDetail>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_references: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ModuleProgress>,
}

impl ItemView {
    fn new(
        kind: ContentKind,
        title: &str,
        order: i64,
        unlock: UnlockView,
        is_completed: bool,
        progress: Option<ModuleProgress>,
    ) -> Self {
        Self {
            id: unlock.item_id,
            kind,
            title: title.to_string(),
            order,
            status: ItemStatus::from_flags(is_completed, unlock.is_unlocked),
            is_unlocked: unlock.is_unlocked,
            is_completed,
            unmet_prerequisites: unlock.unmet_prerequisites,
            prerequisite_details: unlock.prerequisite_details,
            missing_references: unlock.missing_references,
            progress,
        }
    }

    pub fn unlock_view(&self) -> UnlockView {
        UnlockView {
            item_id: self.id.clone(),
            is_unlocked: self.is_unlocked,
            unmet_prerequisites: self.unmet_prerequisites.clone(),
            prerequisite_details: self.prerequisite_details.clone(),
            missing_references: self.missing_references.clone(),
        }
    }

    fn key(&self) -> (ContentKind, &str) {
        (self.kind, self.id.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemRef {
    pub id: String,
    pub kind: ContentKind,
}

#[derive(Clone, Debug)]
pub struct AttemptInput {
    pub language: String,
    pub lesson_id: String,
    pub completed: bool,
    pub score: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub fact: CompletionFact,
    pub newly_completed: bool,
    pub newly_unlocked: Vec<ItemRef>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LanguageProgressSummary {
    pub language: String,
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub unlocked_lessons: usize,
    pub completion_percentage: u8,
    pub total_modules: usize,
    pub completed_modules: usize,
}

/// Lesson half of the content graph plus the learner's facts. A lesson
/// counts as completed only while it is present in the graph.
struct LessonGraph<'a> {
    lessons: HashMap<&'a str, &'a LessonNode>,
    facts: &'a HashMap<String, CompletionFact>,
}

impl<'a> LessonGraph<'a> {
    fn new(lessons: &'a [LessonNode], facts: &'a HashMap<String, CompletionFact>) -> Self {
        Self {
            lessons: lessons
                .iter()
                .filter(|lesson| lesson.is_active)
                .map(|lesson| (lesson.lesson_id.as_str(), lesson))
                .collect(),
            facts,
        }
    }

    fn contains(&self, lesson_id: &str) -> bool {
        self.lessons.contains_key(lesson_id)
    }
}

impl PrerequisiteLookup for LessonGraph<'_> {
    fn title(&self, id: &str) -> Option<&str> {
        self.lessons.get(id).map(|lesson| lesson.title.as_str())
    }

    fn is_completed(&self, id: &str) -> bool {
        self.contains(id) && self.facts.get(id).is_some_and(|fact| fact.completed)
    }
}

/// Completion state of every active module. A module's completion depends
/// only on its own member lessons, so it is known before any unlock is
/// resolved.
struct ModuleGraph<'a> {
    titles: HashMap<&'a str, &'a str>,
    progress: HashMap<&'a str, ModuleProgress>,
}

impl PrerequisiteLookup for ModuleGraph<'_> {
    fn title(&self, id: &str) -> Option<&str> {
        self.titles.get(id).copied()
    }

    fn is_completed(&self, id: &str) -> bool {
        self.progress
            .get(id)
            .is_some_and(|progress| progress.is_completed)
    }
}

/// Builds the per-learner view of one catalog scope. Pure: the same nodes
/// and facts always produce the same, identically ordered, items.
pub fn build_catalog(
    lessons: &[LessonNode],
    modules: &[ModuleNode],
    facts: &HashMap<String, CompletionFact>,
) -> Vec<ItemView> {
    let graph = LessonGraph::new(lessons, facts);

    let mut items: Vec<ItemView> = lessons
        .iter()
        .filter(|lesson| lesson.is_active)
        .map(|lesson| {
            let unlock = resolve(&lesson.lesson_id, &lesson.prerequisites, &graph);
            let is_completed = graph.is_completed(&lesson.lesson_id);
            ItemView::new(
                ContentKind::Lesson,
                &lesson.title,
                lesson.order,
                unlock,
                is_completed,
                None,
            )
        })
        .collect();

    let mut ordered: Vec<&ModuleNode> = modules.iter().filter(|module| module.is_active).collect();
    ordered.sort_by(|left, right| {
        left.order
            .cmp(&right.order)
            .then_with(|| left.module_id.cmp(&right.module_id))
    });

    // Absent or inactive members still count toward the total and are never
    // completed, so removing content cannot complete a module.
    let module_graph = ModuleGraph {
        titles: ordered
            .iter()
            .copied()
            .map(|module| (module.module_id.as_str(), module.title.as_str()))
            .collect(),
        progress: ordered
            .iter()
            .copied()
            .map(|module| {
                let progress = aggregate(&module.module_id, &module.member_lessons, |lesson_id| {
                    graph.is_completed(lesson_id)
                });
                (module.module_id.as_str(), progress)
            })
            .collect(),
    };

    // The ordered fold only carries the previous module for the chain rule.
    let (_, module_items) = ordered.into_iter().fold(
        (None::<&str>, Vec::new()),
        |(previous, mut module_items), module| {
            let unlock = if !module.prerequisites.is_empty() {
                resolve(&module.module_id, &module.prerequisites, &module_graph)
            } else if let Some(previous) = previous {
                let chain = BTreeSet::from([previous.to_string()]);
                resolve(&module.module_id, &chain, &module_graph)
            } else {
                UnlockView::unlocked(&module.module_id)
            };

            let progress = module_graph
                .progress
                .get(module.module_id.as_str())
                .cloned()
                .unwrap_or_else(|| aggregate(&module.module_id, &[], |_| false));
            module_items.push(ItemView::new(
                ContentKind::Module,
                &module.title,
                module.order,
                unlock,
                progress.is_completed,
                Some(progress),
            ));
            (Some(module.module_id.as_str()), module_items)
        },
    );

    items.extend(module_items);
    sort_items(&mut items);
    items
}

/// Completed first, then unlocked, then locked; ties by order, kind, id.
pub fn sort_items(items: &mut [ItemView]) {
    items.sort_by(|left, right| {
        left.status
            .rank()
            .cmp(&right.status.rank())
            .then_with(|| left.order.cmp(&right.order))
            .then_with(|| left.kind.cmp(&right.kind))
            .then_with(|| left.id.cmp(&right.id))
    });
}

pub fn summarize(language: &str, items: &[ItemView]) -> LanguageProgressSummary {
    let lessons = items.iter().filter(|item| item.kind == ContentKind::Lesson);
    let modules = items.iter().filter(|item| item.kind == ContentKind::Module);

    let total_lessons = lessons.clone().count();
    let completed_lessons = lessons.clone().filter(|item| item.is_completed).count();
    let unlocked_lessons = lessons.filter(|item| item.is_unlocked).count();

    LanguageProgressSummary {
        language: language.to_string(),
        total_lessons,
        completed_lessons,
        unlocked_lessons,
        completion_percentage: completion_percentage(completed_lessons, total_lessons),
        total_modules: modules.clone().count(),
        completed_modules: modules.filter(|item| item.is_completed).count(),
    }
}

/// Items whose `is_unlocked` flipped from false to true. Status is not
/// used: a locked module whose lessons are all done reports `Completed`.
fn newly_unlocked(before: &[ItemView], after: &[ItemView]) -> Vec<ItemRef> {
    let locked_before: BTreeSet<(ContentKind, &str)> = before
        .iter()
        .filter(|item| !item.is_unlocked)
        .map(ItemView::key)
        .collect();
    after
        .iter()
        .filter(|item| item.is_unlocked && locked_before.contains(&item.key()))
        .map(|item| ItemRef {
            id: item.id.clone(),
            kind: item.kind,
        })
        .collect()
}

struct CatalogSnapshot {
    lessons: Vec<LessonNode>,
    modules: Vec<ModuleNode>,
    facts: HashMap<String, CompletionFact>,
}

impl CatalogSnapshot {
    fn build(&self) -> Vec<ItemView> {
        build_catalog(&self.lessons, &self.modules, &self.facts)
    }
}

#[derive(Clone)]
pub struct ProgressionService {
    content: Arc<dyn ContentGraphRepository>,
    completions: Arc<dyn CompletionFactRepository>,
}

impl ProgressionService {
    pub fn new(
        content: Arc<dyn ContentGraphRepository>,
        completions: Arc<dyn CompletionFactRepository>,
    ) -> Self {
        Self {
            content,
            completions,
        }
    }

    pub async fn catalog_view(&self, user_id: &str, language: &str) -> DomainResult<Vec<ItemView>> {
        let snapshot = self.load(user_id, language).await?;
        let items = snapshot.build();
        log_missing_references(user_id, language, &items);
        Ok(items)
    }

    pub async fn lesson_unlock(
        &self,
        user_id: &str,
        language: &str,
        lesson_id: &str,
    ) -> DomainResult<UnlockView> {
        let items = self.catalog_view(user_id, language).await?;
        find_item(&items, ContentKind::Lesson, lesson_id)
            .map(ItemView::unlock_view)
            .ok_or(DomainError::NotFound)
    }

    pub async fn module_progress(
        &self,
        user_id: &str,
        language: &str,
        module_id: &str,
    ) -> DomainResult<ModuleProgress> {
        let items = self.catalog_view(user_id, language).await?;
        find_item(&items, ContentKind::Module, module_id)
            .and_then(|item| item.progress.clone())
            .ok_or(DomainError::NotFound)
    }

    pub async fn language_summary(
        &self,
        user_id: &str,
        language: &str,
    ) -> DomainResult<LanguageProgressSummary> {
        let items = self.catalog_view(user_id, language).await?;
        Ok(summarize(language, &items))
    }

    pub async fn record_attempt(
        &self,
        user_id: &str,
        input: AttemptInput,
    ) -> DomainResult<AttemptOutcome> {
        let lesson_id = normalize_non_empty(&input.lesson_id, "lesson_id")?;
        validate_score(input.score)?;

        let mut snapshot = self.load(user_id, &input.language).await?;
        let before = snapshot.build();
        let lesson = find_item(&before, ContentKind::Lesson, &lesson_id).ok_or(DomainError::NotFound)?;
        if !lesson.is_unlocked {
            return Err(DomainError::Validation(format!(
                "lesson '{lesson_id}' is locked"
            )));
        }
        let was_completed = lesson.is_completed;

        let fact = self
            .completions
            .upsert(user_id, &lesson_id, input.completed, input.score)
            .await?;
        snapshot.facts.insert(lesson_id.clone(), fact.clone());
        let after = snapshot.build();

        let outcome = AttemptOutcome {
            newly_completed: fact.completed && !was_completed,
            newly_unlocked: newly_unlocked(&before, &after),
            fact,
        };
        tracing::info!(
            user_id,
            lesson_id = %lesson_id,
            attempts = outcome.fact.attempts,
            completed = outcome.fact.completed,
            completed_at = outcome.fact.completed_at_ms.map(format_ms_rfc3339).as_deref(),
            newly_unlocked = outcome.newly_unlocked.len(),
            "lesson attempt recorded"
        );
        Ok(outcome)
    }

    pub async fn integrity_report(&self, language: &str) -> DomainResult<GraphIntegrityReport> {
        let language = normalize_non_empty(language, "language")?;
        let (lessons, modules) = try_join(
            self.content.list_lessons(&language, true),
            self.content.list_modules(&language, true),
        )
        .await?;
        Ok(check_integrity(&lessons, &modules))
    }

    /// Content and facts are read concurrently; any store failure fails the
    /// whole request.
    async fn load(&self, user_id: &str, language: &str) -> DomainResult<CatalogSnapshot> {
        let user_id = normalize_non_empty(user_id, "user_id")?;
        let language = normalize_non_empty(language, "language")?;
        let (lessons, modules, facts) = try_join3(
            self.content.list_lessons(&language, true),
            self.content.list_modules(&language, true),
            self.completions.list_for_user(&user_id),
        )
        .await
        .inspect_err(|err| {
            tracing::error!(
                user_id = %user_id,
                language = %language,
                error = %err,
                "progression load failed"
            );
        })?;
        Ok(CatalogSnapshot {
            lessons,
            modules,
            facts,
        })
    }
}

fn find_item<'a>(items: &'a [ItemView], kind: ContentKind, id: &str) -> Option<&'a ItemView> {
    items.iter().find(|item| item.kind == kind && item.id == id)
}

fn log_missing_references(user_id: &str, language: &str, items: &[ItemView]) {
    for item in items.iter().filter(|item| !item.missing_references.is_empty()) {
        tracing::warn!(
            user_id,
            language,
            item_id = %item.id,
            kind = item.kind.as_str(),
            missing = ?item.missing_references,
            "prerequisite references missing content"
        );
    }
}

fn normalize_non_empty(value: &str, field_name: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::Validation(format!("{field_name} is required")));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(lesson_id: &str, completed: bool) -> (String, CompletionFact) {
        (
            lesson_id.to_string(),
            CompletionFact::first_attempt("user-1", lesson_id, completed, None, 1),
        )
    }

    fn facts(entries: &[(&str, bool)]) -> HashMap<String, CompletionFact> {
        entries
            .iter()
            .map(|(lesson_id, completed)| fact(lesson_id, *completed))
            .collect()
    }

    fn item<'a>(items: &'a [ItemView], kind: ContentKind, id: &str) -> &'a ItemView {
        find_item(items, kind, id).expect("item present")
    }

    fn scenario() -> (Vec<LessonNode>, Vec<ModuleNode>) {
        let lessons = vec![
            LessonNode::new("l1", "es", "Saludos", 1),
            LessonNode::new("l2", "es", "Números", 2).with_prerequisites(["l1"]),
            LessonNode::new("l3", "es", "Colores", 3),
        ];
        let modules = vec![
            ModuleNode::new("a", "es", "Basics", 1).with_lessons(["l1", "l2"]),
            ModuleNode::new("b", "es", "Everyday", 2)
                .with_lessons(["l3"])
                .with_prerequisites(["a"]),
        ];
        (lessons, modules)
    }

    #[test]
    fn module_b_unlocks_once_module_a_completes() {
        let (lessons, modules) = scenario();

        let items = build_catalog(&lessons, &modules, &HashMap::new());
        assert!(item(&items, ContentKind::Module, "a").is_unlocked);
        let b = item(&items, ContentKind::Module, "b");
        assert!(!b.is_unlocked);
        assert_eq!(b.unmet_prerequisites, vec!["a"]);

        let items = build_catalog(&lessons, &modules, &facts(&[("l1", true), ("l2", true)]));
        let a = item(&items, ContentKind::Module, "a");
        assert_eq!(
            a.progress,
            Some(ModuleProgress {
                module_id: "a".to_string(),
                total_lessons: 2,
                completed_lessons: 2,
                completion_percentage: 100,
                is_completed: true,
            })
        );
        assert!(item(&items, ContentKind::Module, "b").is_unlocked);

        let items = build_catalog(
            &lessons,
            &modules,
            &facts(&[("l1", true), ("l2", true), ("l3", true)]),
        );
        let b = item(&items, ContentKind::Module, "b");
        assert_eq!(b.status, ItemStatus::Completed);
        let progress = b.progress.as_ref().expect("module progress");
        assert_eq!(
            (
                progress.total_lessons,
                progress.completed_lessons,
                progress.completion_percentage,
                progress.is_completed
            ),
            (1, 1, 100, true)
        );
    }

    #[test]
    fn chain_fallback_requires_previous_module() {
        let lessons = vec![
            LessonNode::new("l1", "es", "One", 1),
            LessonNode::new("l2", "es", "Two", 2),
        ];
        let modules = vec![
            ModuleNode::new("second", "es", "Second", 20).with_lessons(["l2"]),
            ModuleNode::new("first", "es", "First", 10).with_lessons(["l1"]),
        ];

        let items = build_catalog(&lessons, &modules, &HashMap::new());
        assert!(item(&items, ContentKind::Module, "first").is_unlocked);
        let second = item(&items, ContentKind::Module, "second");
        assert!(!second.is_unlocked);
        assert_eq!(second.unmet_prerequisites, vec!["first"]);

        let items = build_catalog(&lessons, &modules, &facts(&[("l1", true)]));
        assert!(item(&items, ContentKind::Module, "second").is_unlocked);
    }

    #[test]
    fn explicit_prerequisites_override_chain() {
        let lessons = vec![
            LessonNode::new("l1", "es", "One", 1),
            LessonNode::new("l2", "es", "Two", 2),
        ];
        let modules = vec![
            ModuleNode::new("m1", "es", "First", 1).with_lessons(["l1"]),
            ModuleNode::new("m2", "es", "Second", 2).with_lessons(["l2"]),
            ModuleNode::new("m3", "es", "Third", 3).with_prerequisites(["m1"]),
        ];
        let items = build_catalog(&lessons, &modules, &facts(&[("l1", true)]));
        assert!(!item(&items, ContentKind::Module, "m2").is_completed);
        assert!(item(&items, ContentKind::Module, "m3").is_unlocked);

        let items = build_catalog(&lessons, &modules, &HashMap::new());
        let m3 = item(&items, ContentKind::Module, "m3");
        assert_eq!(m3.unmet_prerequisites, vec!["m1"]);
    }

    #[test]
    fn later_ordered_prerequisite_uses_its_completion() {
        let lessons = vec![
            LessonNode::new("l1", "es", "One", 1),
            LessonNode::new("l2", "es", "Two", 2),
        ];
        let modules = vec![
            ModuleNode::new("m1", "es", "First", 1)
                .with_lessons(["l1"])
                .with_prerequisites(["m2"]),
            ModuleNode::new("m2", "es", "Second", 2).with_lessons(["l2"]),
        ];

        let items = build_catalog(&lessons, &modules, &HashMap::new());
        let m1 = item(&items, ContentKind::Module, "m1");
        assert!(!m1.is_unlocked);
        assert_eq!(m1.unmet_prerequisites, vec!["m2"]);

        let items = build_catalog(&lessons, &modules, &facts(&[("l2", true)]));
        let m2 = item(&items, ContentKind::Module, "m2");
        let m1 = item(&items, ContentKind::Module, "m1");
        assert!(m2.is_completed);
        assert!(m1.is_unlocked);
        assert!(m1.unmet_prerequisites.is_empty());
        assert_eq!(
            m1.prerequisite_details,
            vec![PrerequisiteDetail {
                id: "m2".to_string(),
                title: Some("Second".to_string()),
                completed: true,
            }]
        );
    }

    #[test]
    fn inactive_and_unknown_members_count_as_incomplete() {
        let lessons = vec![
            LessonNode::new("l1", "es", "One", 1),
            LessonNode::new("l2", "es", "Two", 2).inactive(),
        ];
        let modules = vec![ModuleNode::new("m1", "es", "First", 1).with_lessons(["l1", "l2", "gone"])];
        let items = build_catalog(&lessons, &modules, &facts(&[("l1", true), ("l2", true)]));
        let progress = item(&items, ContentKind::Module, "m1")
            .progress
            .clone()
            .expect("module progress");
        assert_eq!(
            (
                progress.total_lessons,
                progress.completed_lessons,
                progress.completion_percentage,
                progress.is_completed
            ),
            (3, 1, 33, false)
        );
        assert!(find_item(&items, ContentKind::Lesson, "l2").is_none());
    }

    #[test]
    fn removed_member_keeps_next_module_locked() {
        let lessons = vec![
            LessonNode::new("l1", "es", "One", 1),
            LessonNode::new("l3", "es", "Three", 3),
        ];
        let modules = vec![
            ModuleNode::new("a", "es", "First", 1).with_lessons(["l1", "gone"]),
            ModuleNode::new("b", "es", "Second", 2).with_lessons(["l3"]),
        ];
        let items = build_catalog(&lessons, &modules, &facts(&[("l1", true)]));
        let a = item(&items, ContentKind::Module, "a");
        assert_eq!(
            a.progress,
            Some(ModuleProgress {
                module_id: "a".to_string(),
                total_lessons: 2,
                completed_lessons: 1,
                completion_percentage: 50,
                is_completed: false,
            })
        );
        let b = item(&items, ContentKind::Module, "b");
        assert!(!b.is_unlocked);
        assert_eq!(b.unmet_prerequisites, vec!["a"]);
    }

    #[test]
    fn stale_fact_for_removed_lesson_does_not_unlock() {
        let lessons = vec![LessonNode::new("l2", "es", "Two", 2).with_prerequisites(["l1"])];
        let items = build_catalog(&lessons, &[], &facts(&[("l1", true)]));
        let l2 = item(&items, ContentKind::Lesson, "l2");
        assert!(!l2.is_unlocked);
        assert_eq!(l2.missing_references, vec!["l1"]);
    }

    #[test]
    fn items_sort_by_status_then_order() {
        let lessons = vec![
            LessonNode::new("l1", "es", "One", 1),
            LessonNode::new("l2", "es", "Two", 2).with_prerequisites(["l4"]),
            LessonNode::new("l3", "es", "Three", 3),
            LessonNode::new("l4", "es", "Four", 4),
        ];
        let items = build_catalog(&lessons, &[], &facts(&[("l3", true)]));
        let ids: Vec<_> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["l3", "l1", "l4", "l2"]);
        let statuses: Vec<_> = items.iter().map(|item| item.status.as_str()).collect();
        assert_eq!(statuses, vec!["completed", "unlocked", "unlocked", "locked"]);
    }

    #[test]
    fn empty_scope_builds_empty_catalog() {
        assert!(build_catalog(&[], &[], &facts(&[("l1", true)])).is_empty());
    }

    #[test]
    fn summary_counts_lessons_and_modules() {
        let (lessons, modules) = scenario();
        let items = build_catalog(&lessons, &modules, &facts(&[("l1", true), ("l2", true)]));
        let summary = summarize("es", &items);
        assert_eq!(summary.total_lessons, 3);
        assert_eq!(summary.completed_lessons, 2);
        assert_eq!(summary.unlocked_lessons, 3);
        assert_eq!(summary.completion_percentage, 67);
        assert_eq!(summary.total_modules, 2);
        assert_eq!(summary.completed_modules, 1);
    }

    #[test]
    fn diff_reports_items_leaving_locked_state() {
        let (lessons, modules) = scenario();
        let before = build_catalog(&lessons, &modules, &facts(&[("l1", true)]));
        let after = build_catalog(&lessons, &modules, &facts(&[("l1", true), ("l2", true)]));
        let unlocked = newly_unlocked(&before, &after);
        assert_eq!(
            unlocked,
            vec![ItemRef {
                id: "b".to_string(),
                kind: ContentKind::Module,
            }]
        );
    }

    #[test]
    fn completed_but_locked_module_is_not_reported_as_unlocked() {
        let (lessons, modules) = scenario();
        let before = build_catalog(&lessons, &modules, &HashMap::new());
        let after = build_catalog(&lessons, &modules, &facts(&[("l3", true)]));

        let b = item(&after, ContentKind::Module, "b");
        assert_eq!(b.status, ItemStatus::Completed);
        assert!(!b.is_unlocked);
        assert!(newly_unlocked(&before, &after).is_empty());
    }
}
