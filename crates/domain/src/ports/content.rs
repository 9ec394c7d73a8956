use crate::DomainResult;
use crate::catalog::{LessonNode, ModuleNode};
use crate::ports::BoxFuture;

/// Read side of the content graph. Implementations decode stored
/// prerequisite lists into typed sets before handing nodes to the engine.
pub trait ContentGraphRepository: Send + Sync {
    fn list_lessons(
        &self,
        language: &str,
        active_only: bool,
    ) -> BoxFuture<'_, DomainResult<Vec<LessonNode>>>;

    fn list_modules(
        &self,
        language: &str,
        active_only: bool,
    ) -> BoxFuture<'_, DomainResult<Vec<ModuleNode>>>;
}
