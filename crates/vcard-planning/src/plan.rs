//! Task plan data structures

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;
use vcard_core::coerce::{self, get_any};

/// Task lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Todo,
    Doing,
    Done,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Doing => "doing",
            Self::Done => "done",
            Self::Blocked => "blocked",
        }
    }

    /// Parse a status, falling back to `todo`
    pub fn from_str_lossy(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "todo" | "open" | "pending" => Ok(Self::Todo),
            "doing" | "in_progress" | "active" => Ok(Self::Doing),
            "done" | "completed" | "complete" => Ok(Self::Done),
            "blocked" => Ok(Self::Blocked),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

/// One unit of work in a plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub depends_on: Vec<String>,
    pub kind_hint: String,
    pub patch_hints: Vec<String>,
    pub done_criteria: Vec<String>,
    pub notes: String,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

/// Plan cursor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub current_task_id: Option<String>,
}

/// A task graph stored inside a draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VibePlan {
    pub version: i64,
    pub goal: String,
    pub created_at: String,
    pub updated_at: String,
    pub tasks: Vec<Task>,
    pub cursor: Cursor,
}

impl Default for VibePlan {
    fn default() -> Self {
        Self {
            version: VibePlan::VERSION,
            goal: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
            tasks: Vec::new(),
            cursor: Cursor::default(),
        }
    }
}

impl VibePlan {
    pub const VERSION: i64 = 1;

    /// First task carrying the given id
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Array position of the first task carrying the given id
    pub fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// True when every task is done (and there is at least one)
    pub fn is_complete(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(Task::is_done)
    }

    /// Copy with `updatedAt` (and a missing `createdAt`) set to `now`
    pub fn touched(&self, now: DateTime<Utc>) -> Self {
        let stamp = timestamp(now);
        let mut next = self.clone();
        if next.created_at.is_empty() {
            next.created_at = stamp.clone();
        }
        next.updated_at = stamp;
        next
    }

    /// Copy with the first task matching `id` set to `status`
    pub fn with_task_status(&self, id: &str, status: TaskStatus) -> Self {
        let mut next = self.clone();
        if let Some(pos) = self.position(id) {
            next.tasks[pos].status = status;
        }
        next
    }

    /// Copy with the cursor moved
    pub fn with_cursor(&self, current_task_id: Option<String>) -> Self {
        let mut next = self.clone();
        next.cursor.current_task_id = current_task_id;
        next
    }

    /// Serialize to a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize plan: {}", e);
            Value::Null
        })
    }
}

/// RFC 3339 UTC timestamp with millisecond precision
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Ordered, trimmed, de-duplicated non-empty ids
fn id_list(value: Option<&Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    coerce::string_list(value)
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

fn normalize_task(value: &Value, position: usize) -> Task {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);

    let mut id = coerce::string(obj.get("id")).trim().to_string();
    if id.is_empty() {
        id = format!("task-{}", position + 1);
    }

    Task {
        id,
        title: coerce::string(get_any(obj, &["title", "name"])),
        status: TaskStatus::from_str_lossy(&coerce::string(obj.get("status"))),
        depends_on: id_list(get_any(obj, &["dependsOn", "depends_on"])),
        kind_hint: coerce::string(get_any(obj, &["kindHint", "kind_hint"])),
        patch_hints: coerce::string_list(get_any(obj, &["patchHints", "patch_hints"])),
        done_criteria: coerce::string_list(get_any(obj, &["doneCriteria", "done_criteria"])),
        notes: coerce::string(obj.get("notes")),
    }
}

/// Normalize arbitrary JSON into a [`VibePlan`]
///
/// Duplicate task ids are suffixed in list order (`T1`, `T1-2`, `T1-3`);
/// empty ids become `task-<n>` with `n` the 1-based position. Dependencies
/// are kept as written, even when they point nowhere.
pub fn normalize_vibe_plan(raw: &Value) -> VibePlan {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let mut tasks: Vec<Task> = match obj.get("tasks") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(pos, item)| normalize_task(item, pos))
            .collect(),
        _ => Vec::new(),
    };

    let mut seen = HashSet::new();
    for task in &mut tasks {
        if seen.insert(task.id.clone()) {
            continue;
        }
        let base = task.id.clone();
        let mut suffix = 2;
        while seen.contains(&format!("{}-{}", base, suffix)) {
            suffix += 1;
        }
        task.id = format!("{}-{}", base, suffix);
        debug!("Renamed duplicate task id {} to {}", base, task.id);
        seen.insert(task.id.clone());
    }

    let cursor_obj = coerce::object(obj.get("cursor"));
    let current = coerce::string(get_any(&cursor_obj, &["currentTaskId", "current_task_id"]));

    VibePlan {
        version: coerce::int_or(obj.get("version"), VibePlan::VERSION),
        goal: coerce::string(obj.get("goal")),
        created_at: coerce::string(get_any(obj, &["createdAt", "created_at"])),
        updated_at: coerce::string(get_any(obj, &["updatedAt", "updated_at"])),
        tasks,
        cursor: Cursor {
            current_task_id: Some(current.trim().to_string()).filter(|s| !s.is_empty()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_status_parsing_is_lenient() {
        assert_eq!(TaskStatus::from_str_lossy("In-Progress"), TaskStatus::Doing);
        assert_eq!(TaskStatus::from_str_lossy("completed"), TaskStatus::Done);
        assert_eq!(TaskStatus::from_str_lossy("nonsense"), TaskStatus::Todo);
        assert_eq!(TaskStatus::from_str_lossy("BLOCKED"), TaskStatus::Blocked);
    }

    #[test]
    fn test_duplicate_ids_are_suffixed() {
        let plan = normalize_vibe_plan(&json!({
            "tasks": [{"id": "T1"}, {"id": "T1"}, {"id": "T1"}, {"id": "T1-2"}]
        }));
        let ids: Vec<&str> = plan.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T1-2", "T1-3", "T1-2-2"]);
    }

    #[test]
    fn test_empty_ids_use_position() {
        let plan = normalize_vibe_plan(&json!({"tasks": [{"title": "a"}, "junk", {"id": "  "}]}));
        let ids: Vec<&str> = plan.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["task-1", "task-2", "task-3"]);
    }

    #[test]
    fn test_depends_on_is_coerced() {
        let plan = normalize_vibe_plan(&json!({
            "tasks": [{"id": "b", "depends_on": ["a", " a ", "", "ghost"]}]
        }));
        assert_eq!(plan.tasks[0].depends_on, vec!["a", "ghost"]);

        let single = normalize_vibe_plan(&json!({"tasks": [{"id": "b", "dependsOn": "a"}]}));
        assert_eq!(single.tasks[0].depends_on, vec!["a"]);
    }

    #[test]
    fn test_plan_round_trips_through_json() {
        let plan = normalize_vibe_plan(&json!({
            "goal": "A ghost story",
            "tasks": [{"id": "T1", "status": "doing", "kindHint": "card", "doneCriteria": ["x"]}],
            "cursor": {"currentTaskId": "T1"}
        }));
        assert_eq!(normalize_vibe_plan(&plan.to_value()), plan);
        assert_eq!(plan.to_value()["tasks"][0]["kindHint"], "card");
        assert_eq!(plan.to_value()["cursor"]["currentTaskId"], "T1");
    }

    #[test]
    fn test_touched_sets_timestamps() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let plan = VibePlan::default().touched(now);
        assert_eq!(plan.created_at, "2024-05-01T12:00:00.000Z");
        assert_eq!(plan.updated_at, plan.created_at);

        let later = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        let again = plan.touched(later);
        assert_eq!(again.created_at, "2024-05-01T12:00:00.000Z");
        assert_eq!(again.updated_at, "2024-05-02T12:00:00.000Z");
    }

    #[test]
    fn test_with_task_status_leaves_original() {
        let plan = normalize_vibe_plan(&json!({"tasks": [{"id": "T1"}]}));
        let done = plan.with_task_status("T1", TaskStatus::Done);
        assert_eq!(plan.tasks[0].status, TaskStatus::Todo);
        assert!(done.is_complete());
    }
}
