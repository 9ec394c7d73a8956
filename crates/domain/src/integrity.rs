use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::catalog::{ContentKind, LessonNode, ModuleNode};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceRole {
    Prerequisite,
    MemberLesson,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct DanglingReference {
    pub kind: ContentKind,
    pub item_id: String,
    pub role: ReferenceRole,
    pub missing_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct PrerequisiteCycle {
    pub kind: ContentKind,
    /// Rotated so the smallest id comes first.
    pub members: Vec<String>,
}

/// Authoring diagnostics for one catalog scope. Resolution never consults
/// this; a cycle simply leaves its members locked.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphIntegrityReport {
    pub dangling_references: Vec<DanglingReference>,
    pub self_references: Vec<(ContentKind, String)>,
    pub cycles: Vec<PrerequisiteCycle>,
}

impl GraphIntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.dangling_references.is_empty()
            && self.self_references.is_empty()
            && self.cycles.is_empty()
    }
}

pub fn check_integrity(lessons: &[LessonNode], modules: &[ModuleNode]) -> GraphIntegrityReport {
    let lesson_ids: BTreeSet<&str> = lessons
        .iter()
        .filter(|lesson| lesson.is_active)
        .map(|lesson| lesson.lesson_id.as_str())
        .collect();
    let module_ids: BTreeSet<&str> = modules
        .iter()
        .filter(|module| module.is_active)
        .map(|module| module.module_id.as_str())
        .collect();

    let mut report = GraphIntegrityReport::default();
    let mut lesson_edges: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut module_edges: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for lesson in lessons.iter().filter(|lesson| lesson.is_active) {
        let edges = lesson_edges.entry(lesson.lesson_id.as_str()).or_default();
        for prerequisite in &lesson.prerequisites {
            if *prerequisite == lesson.lesson_id {
                report
                    .self_references
                    .push((ContentKind::Lesson, lesson.lesson_id.clone()));
            } else if lesson_ids.contains(prerequisite.as_str()) {
                edges.push(prerequisite.as_str());
            } else {
                report.dangling_references.push(DanglingReference {
                    kind: ContentKind::Lesson,
                    item_id: lesson.lesson_id.clone(),
                    role: ReferenceRole::Prerequisite,
                    missing_id: prerequisite.clone(),
                });
            }
        }
    }

    for module in modules.iter().filter(|module| module.is_active) {
        let edges = module_edges.entry(module.module_id.as_str()).or_default();
        for prerequisite in &module.prerequisites {
            if *prerequisite == module.module_id {
                report
                    .self_references
                    .push((ContentKind::Module, module.module_id.clone()));
            } else if module_ids.contains(prerequisite.as_str()) {
                edges.push(prerequisite.as_str());
            } else {
                report.dangling_references.push(DanglingReference {
                    kind: ContentKind::Module,
                    item_id: module.module_id.clone(),
                    role: ReferenceRole::Prerequisite,
                    missing_id: prerequisite.clone(),
                });
            }
        }
        for lesson_id in &module.member_lessons {
            if !lesson_ids.contains(lesson_id.as_str()) {
                report.dangling_references.push(DanglingReference {
                    kind: ContentKind::Module,
                    item_id: module.module_id.clone(),
                    role: ReferenceRole::MemberLesson,
                    missing_id: lesson_id.clone(),
                });
            }
        }
    }

    report.cycles = find_cycles(&lesson_edges)
        .into_iter()
        .map(|members| PrerequisiteCycle {
            kind: ContentKind::Lesson,
            members,
        })
        .chain(
            find_cycles(&module_edges)
                .into_iter()
                .map(|members| PrerequisiteCycle {
                    kind: ContentKind::Module,
                    members,
                }),
        )
        .collect();
    report.dangling_references.sort();
    report.dangling_references.dedup();
    report.self_references.sort();
    report.self_references.dedup();
    report
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Active,
    Done,
}

/// Iterative depth-first search; every back edge yields one cycle.
fn find_cycles(edges: &BTreeMap<&str, Vec<&str>>) -> Vec<Vec<String>> {
    let mut visits: HashMap<&str, Visit> = HashMap::with_capacity(edges.len());
    let mut found: BTreeSet<Vec<String>> = BTreeSet::new();

    for &start in edges.keys() {
        if visits.contains_key(start) {
            continue;
        }
        visits.insert(start, Visit::Active);
        let mut path: Vec<&str> = vec![start];
        let mut cursors: Vec<usize> = vec![0];

        while let Some(&node) = path.last() {
            let depth = path.len() - 1;
            let next = edges
                .get(node)
                .and_then(|targets| targets.get(cursors[depth]))
                .copied();
            let Some(next) = next else {
                visits.insert(node, Visit::Done);
                path.pop();
                cursors.pop();
                continue;
            };
            cursors[depth] += 1;

            match visits.get(next) {
                None => {
                    visits.insert(next, Visit::Active);
                    path.push(next);
                    cursors.push(0);
                }
                Some(Visit::Active) => {
                    if let Some(position) = path.iter().position(|member| *member == next) {
                        found.insert(normalize_cycle(&path[position..]));
                    }
                }
                Some(Visit::Done) => {}
            }
        }
    }

    found.into_iter().collect()
}

fn normalize_cycle(members: &[&str]) -> Vec<String> {
    let pivot = members
        .iter()
        .enumerate()
        .min_by_key(|(_, member)| **member)
        .map(|(index, _)| index)
        .unwrap_or(0);
    members[pivot..]
        .iter()
        .chain(members[..pivot].iter())
        .map(|member| member.to_string())
        .collect()
}
