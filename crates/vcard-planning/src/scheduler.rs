//! Dependency-graph scheduler over a [`VibePlan`]
//!
//! Pure functions, no I/O. Resolution is deterministic for a given plan and
//! cursor, and every walk carries a visited trail so malformed graphs cannot
//! make it loop.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::plan::{Task, TaskStatus, VibePlan};

/// Outcome of asking a plan what to work on next
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    /// The plan has no tasks
    NeedPlan,
    /// The dependency graph has a cycle; the path repeats its first id at the end
    Cycle { cycle: Vec<String> },
    /// This task is actionable
    Ok {
        #[serde(rename = "taskId")]
        task_id: String,
    },
    /// The nearest relevant task is blocked
    Blocked {
        #[serde(rename = "taskId")]
        task_id: String,
    },
    /// A task depends on an id that does not exist
    InvalidDep {
        #[serde(rename = "taskId")]
        task_id: String,
        #[serde(rename = "missingId")]
        missing_id: String,
    },
    /// Every task is done
    AllDone,
}

impl Resolution {
    /// Task the resolution points at, if any
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Ok { task_id } | Self::Blocked { task_id } | Self::InvalidDep { task_id, .. } => {
                Some(task_id.as_str())
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::NeedPlan => "need_plan",
            Self::Cycle { .. } => "cycle",
            Self::Ok { .. } => "ok",
            Self::Blocked { .. } => "blocked",
            Self::InvalidDep { .. } => "invalid_dep",
            Self::AllDone => "all_done",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NeedPlan => write!(f, "no plan"),
            Self::Cycle { cycle } => write!(f, "dependency cycle: {}", cycle.join(" -> ")),
            Self::Ok { task_id } => write!(f, "next task: {}", task_id),
            Self::Blocked { task_id } => write!(f, "blocked on task: {}", task_id),
            Self::InvalidDep {
                task_id,
                missing_id,
            } => write!(f, "task {} depends on missing task {}", task_id, missing_id),
            Self::AllDone => write!(f, "all tasks done"),
        }
    }
}

/// Id lookup where the first task carrying an id wins
fn index_tasks(plan: &VibePlan) -> HashMap<&str, &Task> {
    let mut index = HashMap::with_capacity(plan.tasks.len());
    for task in &plan.tasks {
        index.entry(task.id.as_str()).or_insert(task);
    }
    index
}

/// Iterative depth-first walk from `root`; each frame holds the index of the
/// next dependency to follow
fn visit<'a>(
    index: &HashMap<&'a str, &'a Task>,
    root: &'a str,
    visited: &mut HashSet<&'a str>,
) -> Option<Vec<String>> {
    if !visited.insert(root) {
        return None;
    }
    let task = *index.get(root)?;

    let mut path: Vec<&'a str> = vec![root];
    let mut on_path: HashSet<&'a str> = HashSet::from([root]);
    let mut frames: Vec<(&'a Task, usize)> = vec![(task, 0)];

    while let Some(frame) = frames.last_mut() {
        let (task, next) = *frame;
        frame.1 += 1;

        let Some(dep) = task.depends_on.get(next) else {
            frames.pop();
            if let Some(id) = path.pop() {
                on_path.remove(id);
            }
            continue;
        };
        let dep = dep.as_str();

        if on_path.contains(dep) {
            let start = path.iter().position(|s| *s == dep).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
            cycle.push(dep.to_string());
            return Some(cycle);
        }
        if !visited.insert(dep) {
            continue;
        }

        // Missing dependencies are not part of any cycle
        if let Some(dep_task) = index.get(dep) {
            path.push(dep);
            on_path.insert(dep);
            frames.push((*dep_task, 0));
        }
    }

    None
}

/// Depth-first cycle search starting at one task
///
/// Returns the cycle as an id path that ends with its first id repeated,
/// e.g. `["A", "B", "A"]`.
pub fn detect_cycle_from(plan: &VibePlan, start: &str) -> Option<Vec<String>> {
    let index = index_tasks(plan);
    let start = index.get_key_value(start).map(|(k, _)| *k)?;
    visit(&index, start, &mut HashSet::new())
}

/// Cycle search over the whole plan, trying roots in task order
pub fn detect_cycle(plan: &VibePlan) -> Option<Vec<String>> {
    let index = index_tasks(plan);
    let mut visited = HashSet::new();

    plan.tasks
        .iter()
        .find_map(|task| visit(&index, task.id.as_str(), &mut visited))
}

/// Walk from a task toward the nearest actionable ancestor
fn resolve_task<'a>(index: &HashMap<&'a str, &'a Task>, start: &'a Task) -> Resolution {
    let mut trail: Vec<&'a str> = Vec::new();
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut task = start;

    loop {
        let id = task.id.as_str();
        if !seen.insert(id) {
            let start = trail.iter().position(|s| *s == id).unwrap_or(0);
            let mut cycle: Vec<String> = trail[start..].iter().map(|s| s.to_string()).collect();
            cycle.push(id.to_string());
            return Resolution::Cycle { cycle };
        }
        trail.push(id);

        if task.status == TaskStatus::Blocked {
            return Resolution::Blocked {
                task_id: task.id.clone(),
            };
        }

        if let Some(missing) = task
            .depends_on
            .iter()
            .find(|dep| !index.contains_key(dep.as_str()))
        {
            return Resolution::InvalidDep {
                task_id: task.id.clone(),
                missing_id: missing.clone(),
            };
        }

        let pending = task
            .depends_on
            .iter()
            .filter_map(|dep| index.get(dep.as_str()).copied())
            .find(|dep| !dep.is_done());

        match pending {
            Some(dep) => task = dep,
            None => {
                return Resolution::Ok {
                    task_id: task.id.clone(),
                }
            }
        }
    }
}

/// Decide which task the plan should work on now
///
/// 1. No tasks: [`Resolution::NeedPlan`].
/// 2. Any dependency cycle: [`Resolution::Cycle`], before selecting anything.
/// 3. Starting at the cursor (or the first task) and wrapping around, the
///    first task that is not done is resolved through its dependencies. The
///    result may name an ancestor rather than the task itself.
/// 4. Otherwise [`Resolution::AllDone`].
pub fn pick_vibe_plan_current(plan: &VibePlan) -> Resolution {
    if plan.tasks.is_empty() {
        return Resolution::NeedPlan;
    }

    if let Some(cycle) = detect_cycle(plan) {
        debug!("Plan has a dependency cycle: {}", cycle.join(" -> "));
        return Resolution::Cycle { cycle };
    }

    let index = index_tasks(plan);
    let count = plan.tasks.len();
    let start = plan
        .cursor
        .current_task_id
        .as_deref()
        .and_then(|id| plan.position(id))
        .unwrap_or(0);

    (0..count)
        .map(|step| &plan.tasks[(start + step) % count])
        .find(|task| !task.is_done())
        .map(|task| resolve_task(&index, task))
        .unwrap_or(Resolution::AllDone)
}

/// Mark a task done and re-seat the cursor
///
/// The cursor first moves to the task after the finished one (wrapping),
/// then follows the new resolution: it lands on the resolved task, stays put
/// on a cycle, and is cleared once nothing remains. An unknown id leaves the
/// plan unchanged.
pub fn advance_vibe_plan(plan: &VibePlan, finished_task_id: &str) -> VibePlan {
    let Some(pos) = plan.position(finished_task_id) else {
        warn!("Cannot advance plan: no task with id {}", finished_task_id);
        return plan.clone();
    };

    let mut next = plan.with_task_status(finished_task_id, TaskStatus::Done);
    let following = next.tasks[(pos + 1) % next.tasks.len()].id.clone();
    next.cursor.current_task_id = Some(following);

    let resolution = pick_vibe_plan_current(&next);
    debug!("Advanced past {}: {}", finished_task_id, resolution);

    match resolution {
        Resolution::Ok { task_id }
        | Resolution::Blocked { task_id }
        | Resolution::InvalidDep { task_id, .. } => next.with_cursor(Some(task_id)),
        Resolution::Cycle { .. } => next,
        Resolution::AllDone | Resolution::NeedPlan => next.with_cursor(None),
    }
}
