use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DomainResult;
use crate::error::DomainError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Module,
    Lesson,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Lesson => "lesson",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LessonNode {
    pub lesson_id: String,
    pub language: String,
    pub title: String,
    pub prerequisites: BTreeSet<String>,
    pub order: i64,
    pub is_active: bool,
}

impl LessonNode {
    pub fn new(
        lesson_id: impl Into<String>,
        language: impl Into<String>,
        title: impl Into<String>,
        order: i64,
    ) -> Self {
        Self {
            lesson_id: lesson_id.into(),
            language: language.into(),
            title: title.into(),
            prerequisites: BTreeSet::new(),
            order,
            is_active: true,
        }
    }

    pub fn with_prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleNode {
    pub module_id: String,
    pub language: String,
    pub title: String,
    pub order: i64,
    pub member_lessons: Vec<String>,
    pub prerequisites: BTreeSet<String>,
    pub is_active: bool,
}

impl ModuleNode {
    pub fn new(
        module_id: impl Into<String>,
        language: impl Into<String>,
        title: impl Into<String>,
        order: i64,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            language: language.into(),
            title: title.into(),
            order,
            member_lessons: Vec::new(),
            prerequisites: BTreeSet::new(),
            is_active: true,
        }
    }

    pub fn with_lessons<I, S>(mut self, lessons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.member_lessons = lessons.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Decodes a stored id list. Accepts a JSON array of strings or numbers,
/// a string holding such an array, or null.
pub fn decode_id_set(raw: &Value) -> DomainResult<BTreeSet<String>> {
    match raw {
        Value::Null => Ok(BTreeSet::new()),
        Value::Array(items) => decode_id_array(items),
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(BTreeSet::new());
            }
            let parsed: Value = serde_json::from_str(text).map_err(|err| {
                DomainError::Validation(format!("invalid id list '{text}': {err}"))
            })?;
            match parsed {
                Value::Null => Ok(BTreeSet::new()),
                Value::Array(items) => decode_id_array(&items),
                other => Err(DomainError::Validation(format!(
                    "id list must be an array, got {other}"
                ))),
            }
        }
        other => Err(DomainError::Validation(format!(
            "id list must be an array, got {other}"
        ))),
    }
}

/// Same rules as [`decode_id_set`], preserving order and dropping duplicates.
pub fn decode_id_list(raw: &Value) -> DomainResult<Vec<String>> {
    let items = match raw {
        Value::String(text) if !text.trim().is_empty() => {
            serde_json::from_str::<Value>(text.trim()).map_err(|err| {
                DomainError::Validation(format!("invalid id list '{}': {err}", text.trim()))
            })?
        }
        Value::String(_) => Value::Null,
        other => other.clone(),
    };
    let items = match items {
        Value::Array(items) => items,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(DomainError::Validation(format!(
                "id list must be an array, got {other}"
            )));
        }
    };

    let mut seen = BTreeSet::new();
    let mut ids = Vec::with_capacity(items.len());
    for item in &items {
        let id = decode_id(item)?;
        if seen.insert(id.clone()) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn decode_id_array(items: &[Value]) -> DomainResult<BTreeSet<String>> {
    items.iter().map(decode_id).collect()
}

fn decode_id(item: &Value) -> DomainResult<String> {
    let id = match item {
        Value::String(value) => value.trim().to_string(),
        Value::Number(value) => value.to_string(),
        other => {
            return Err(DomainError::Validation(format!(
                "id list entry must be a string or number, got {other}"
            )));
        }
    };
    if id.is_empty() {
        return Err(DomainError::Validation("id list entry is empty".into()));
    }
    Ok(id)
}
