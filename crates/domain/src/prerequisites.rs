use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Answers the two questions the resolver asks about a prerequisite id.
/// `title` returning `None` means the id is not part of the content graph.
pub trait PrerequisiteLookup {
    fn title(&self, id: &str) -> Option<&str>;
    fn is_completed(&self, id: &str) -> bool;
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrerequisiteDetail {
    pub id: String,
    pub title: Option<String>,
    pub completed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnlockView {
    pub item_id: String,
    pub is_unlocked: bool,
    pub unmet_prerequisites: Vec<String>,
    pub prerequisite_details: Vec<PrerequisiteDetail>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_references: Vec<String>,
}

impl UnlockView {
    pub fn unlocked(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            is_unlocked: true,
            unmet_prerequisites: Vec::new(),
            prerequisite_details: Vec::new(),
            missing_references: Vec::new(),
        }
    }
}

/// Checks every prerequisite of `item_id` against `lookup`.
///
/// Resolution is flat: it never follows a prerequisite's own prerequisites,
/// so cycles cannot make it loop. Missing ids and self-references are
/// always unmet.
pub fn resolve<L>(item_id: &str, prerequisites: &BTreeSet<String>, lookup: &L) -> UnlockView
where
    L: PrerequisiteLookup + ?Sized,
{
    if prerequisites.is_empty() {
        return UnlockView::unlocked(item_id);
    }

    let mut unmet_prerequisites = Vec::new();
    let mut missing_references = Vec::new();
    let mut prerequisite_details = Vec::with_capacity(prerequisites.len());

    for id in prerequisites {
        let title = lookup.title(id);
        if title.is_none() {
            missing_references.push(id.clone());
        }
        let completed = id != item_id && title.is_some() && lookup.is_completed(id);
        if !completed {
            unmet_prerequisites.push(id.clone());
        }
        prerequisite_details.push(PrerequisiteDetail {
            id: id.clone(),
            title: title.map(str::to_string),
            completed,
        });
    }

    UnlockView {
        item_id: item_id.to_string(),
        is_unlocked: unmet_prerequisites.is_empty(),
        unmet_prerequisites,
        prerequisite_details,
        missing_references,
    }
}
