use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleProgress {
    pub module_id: String,
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub completion_percentage: u8,
    pub is_completed: bool,
}

/// `round(completed / total * 100)` with halves rounded up; 0 for an empty
/// total. Plain rounding would report 100 for 199 of 200 lessons, so an
/// incomplete module is capped at 99 to keep `100` meaning `is_completed`.
pub fn completion_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    let rounded = ((completed * 100 + total / 2) / total) as u8;
    if completed < total {
        rounded.min(99)
    } else {
        rounded
    }
}

/// Counts completed member lessons. Recomputed on every read.
pub fn aggregate<F>(module_id: &str, member_lessons: &[String], is_completed: F) -> ModuleProgress
where
    F: Fn(&str) -> bool,
{
    let total_lessons = member_lessons.len();
    let completed_lessons = member_lessons
        .iter()
        .filter(|lesson_id| is_completed(lesson_id))
        .count();

    ModuleProgress {
        module_id: module_id.to_string(),
        total_lessons,
        completed_lessons,
        completion_percentage: completion_percentage(completed_lessons, total_lessons),
        is_completed: total_lessons > 0 && completed_lessons == total_lessons,
    }
}
