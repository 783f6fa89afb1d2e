//! Progress state machine
//!
//! Pure mapping from a scheduler [`Resolution`] plus lint errors to a
//! [`Progress`] report. All instruction text is templated.

use serde::Serialize;
use serde_json::Value;
use vcard_planning::{Resolution, Task, TaskStatus, VibePlan};

/// Lint errors quoted in a model instruction
const MAX_QUOTED_ERRORS: usize = 3;

/// Overall plan state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    NoPlan,
    AllDone,
    DependencyCycle,
    DependencyMissing,
    Executing,
}

impl ProgressState {
    pub fn from_resolution(resolution: &Resolution) -> Self {
        match resolution {
            Resolution::NeedPlan => Self::NoPlan,
            Resolution::AllDone => Self::AllDone,
            Resolution::Cycle { .. } => Self::DependencyCycle,
            Resolution::InvalidDep { .. } => Self::DependencyMissing,
            Resolution::Ok { .. } | Resolution::Blocked { .. } => Self::Executing,
        }
    }
}

/// Who should act next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextActionKind {
    AskModel,
    AskUser,
}

/// Instruction for the driving loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextAction {
    #[serde(rename = "type")]
    pub kind: NextActionKind,
    pub text: String,
}

/// One plan task as seen by the progress report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStep {
    /// 1-based position in the plan
    pub index: usize,
    pub id: String,
    pub name: String,
    pub status: TaskStatus,
    pub done_criteria: Vec<String>,
    /// Dependencies that are not done yet, or missing
    pub blockers: Vec<String>,
    pub next_action: String,
}

/// Derived progress, stored in `meta.progress`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub state: ProgressState,
    /// 1-based index of the current step, when there is one
    pub step_index: Option<usize>,
    pub step_name: String,
    pub total_steps: usize,
    pub steps: Vec<ProgressStep>,
    pub next_action: NextAction,
}

impl Progress {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize progress: {}", e);
            Value::Null
        })
    }
}

fn step_blockers(plan: &VibePlan, task: &Task) -> Vec<String> {
    task.depends_on
        .iter()
        .filter_map(|dep| match plan.task(dep) {
            Some(t) if t.is_done() => None,
            Some(_) => Some(dep.clone()),
            None => Some(format!("{} (missing)", dep)),
        })
        .collect()
}

fn step_next_action(task: &Task, blockers: &[String], current: Option<&str>) -> String {
    match task.status {
        TaskStatus::Done => "none".to_string(),
        TaskStatus::Blocked => "ask the user how to unblock".to_string(),
        _ if !blockers.is_empty() => format!("finish {} first", blockers.join(", ")),
        _ if current == Some(task.id.as_str()) => "work on this now".to_string(),
        _ => "pending".to_string(),
    }
}

fn build_steps(plan: &VibePlan, current: Option<&str>) -> Vec<ProgressStep> {
    plan.tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| {
            let blockers = step_blockers(plan, task);
            let next_action = step_next_action(task, &blockers, current);
            ProgressStep {
                index: idx + 1,
                id: task.id.clone(),
                name: task.title.clone(),
                status: task.status,
                done_criteria: task.done_criteria.clone(),
                blockers,
                next_action,
            }
        })
        .collect()
}

fn task_label(task: &Task) -> String {
    if task.title.trim().is_empty() {
        task.id.clone()
    } else {
        format!("{} ({})", task.title, task.id)
    }
}

/// Model instruction with up to three lint errors appended
fn ask_model(mut text: String, errors: &[String]) -> NextAction {
    if !errors.is_empty() {
        text.push_str("\n\nFix these lint errors:");
        for error in errors.iter().take(MAX_QUOTED_ERRORS) {
            text.push_str(&format!("\n- {}", error));
        }
        if errors.len() > MAX_QUOTED_ERRORS {
            text.push_str(&format!(
                "\n- ... and {} more",
                errors.len() - MAX_QUOTED_ERRORS
            ));
        }
    }
    NextAction {
        kind: NextActionKind::AskModel,
        text,
    }
}

fn ask_user(text: String) -> NextAction {
    NextAction {
        kind: NextActionKind::AskUser,
        text,
    }
}

fn executing_text(task: &Task, index: usize, total: usize) -> String {
    let mut text = format!("Step {}/{}: {}.", index, total, task_label(task));
    if !task.patch_hints.is_empty() {
        text.push_str(&format!(" Edit: {}.", task.patch_hints.join(", ")));
    }
    if !task.done_criteria.is_empty() {
        text.push_str(&format!(" Done when: {}.", task.done_criteria.join("; ")));
    }
    text.push_str(" Mark the task done when finished.");
    text
}

/// Build the progress report for a plan and its resolution
pub fn build_progress(
    plan: Option<&VibePlan>,
    resolution: &Resolution,
    errors: &[String],
) -> Progress {
    let state = ProgressState::from_resolution(resolution);
    let current_id = resolution.task_id();

    let (steps, total_steps) = match plan {
        Some(plan) => (build_steps(plan, current_id), plan.tasks.len()),
        None => (Vec::new(), 0),
    };

    let current = plan.and_then(|p| {
        let id = current_id?;
        let pos = p.position(id)?;
        Some((pos + 1, &p.tasks[pos]))
    });

    let next_action = match resolution {
        Resolution::NeedPlan => ask_model(
            "No plan yet. Write a vibePlan into raw.dataExtensions with small, ordered tasks \
             for this card, then start on the first one."
                .to_string(),
            errors,
        ),
        Resolution::AllDone if errors.is_empty() => ask_user(format!(
            "All {} tasks are done and lint is clean. Ask the user to review the card or set a new goal.",
            total_steps
        )),
        Resolution::AllDone => ask_model(
            "All tasks are done but lint still reports errors.".to_string(),
            errors,
        ),
        Resolution::Cycle { cycle } => ask_model(
            format!(
                "The plan has a dependency cycle: {}. Edit dependsOn to break it.",
                cycle.join(" -> ")
            ),
            errors,
        ),
        Resolution::InvalidDep {
            task_id,
            missing_id,
        } => ask_model(
            format!(
                "Task {} depends on {}, which does not exist. Add that task or fix dependsOn.",
                task_id, missing_id
            ),
            errors,
        ),
        Resolution::Blocked { task_id } => {
            let label = current
                .map(|(_, task)| task_label(task))
                .unwrap_or_else(|| task_id.clone());
            ask_user(format!(
                "Task {} is blocked. Ask the user how to proceed.",
                label
            ))
        }
        Resolution::Ok { task_id } => {
            let text = match current {
                Some((index, task)) => executing_text(task, index, total_steps),
                None => format!("Work on task {}.", task_id),
            };
            ask_model(text, errors)
        }
    };

    Progress {
        state,
        step_index: current.map(|(index, _)| index),
        step_name: current
            .map(|(_, task)| task.title.clone())
            .unwrap_or_default(),
        total_steps,
        steps,
        next_action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vcard_planning::{normalize_vibe_plan, pick_vibe_plan_current};

    fn progress_for(plan: serde_json::Value, errors: &[String]) -> Progress {
        let plan = normalize_vibe_plan(&plan);
        let resolution = pick_vibe_plan_current(&plan);
        build_progress(Some(&plan), &resolution, errors)
    }

    #[test]
    fn test_no_plan() {
        let progress = build_progress(None, &Resolution::NeedPlan, &[]);
        assert_eq!(progress.state, ProgressState::NoPlan);
        assert_eq!(progress.total_steps, 0);
        assert_eq!(progress.next_action.kind, NextActionKind::AskModel);
        assert_eq!(progress.step_index, None);
    }

    #[test]
    fn test_executing_step() {
        let progress = progress_for(
            json!({"tasks": [
                {"id": "T1", "title": "Identity", "status": "done"},
                {"id": "T2", "title": "Greeting", "dependsOn": ["T1"], "patchHints": ["card.first_mes"]},
                {"id": "T3", "title": "Lore", "dependsOn": ["T2"]}
            ], "cursor": {"currentTaskId": "T2"}}),
            &[],
        );
        assert_eq!(progress.state, ProgressState::Executing);
        assert_eq!(progress.step_index, Some(2));
        assert_eq!(progress.step_name, "Greeting");
        assert_eq!(progress.total_steps, 3);
        assert!(progress.next_action.text.starts_with("Step 2/3: Greeting (T2)."));
        assert!(progress.next_action.text.contains("card.first_mes"));
        assert_eq!(progress.steps[1].next_action, "work on this now");
        assert_eq!(progress.steps[2].blockers, vec!["T2"]);
        assert_eq!(progress.steps[0].next_action, "none");
    }

    #[test]
    fn test_lint_errors_are_appended() {
        let errors: Vec<String> = (1..=5).map(|i| format!("error {}", i)).collect();
        let progress = progress_for(json!({"tasks": [{"id": "T1"}]}), &errors);
        let text = &progress.next_action.text;
        assert!(text.contains("- error 1"));
        assert!(text.contains("- error 3"));
        assert!(!text.contains("- error 4"));
        assert!(text.contains("and 2 more"));
    }

    #[test]
    fn test_blocked_asks_user() {
        let progress = progress_for(json!({"tasks": [{"id": "T1", "status": "blocked"}]}), &[]);
        assert_eq!(progress.state, ProgressState::Executing);
        assert_eq!(progress.next_action.kind, NextActionKind::AskUser);
    }

    #[test]
    fn test_all_done_depends_on_errors() {
        let plan = json!({"tasks": [{"id": "T1", "status": "done"}]});
        let clean = progress_for(plan.clone(), &[]);
        assert_eq!(clean.state, ProgressState::AllDone);
        assert_eq!(clean.next_action.kind, NextActionKind::AskUser);

        let dirty = progress_for(plan, &["card.name is required".to_string()]);
        assert_eq!(dirty.next_action.kind, NextActionKind::AskModel);
        assert!(dirty.next_action.text.contains("card.name is required"));
    }

    #[test]
    fn test_missing_dependency_state() {
        let progress = progress_for(json!({"tasks": [{"id": "T1", "dependsOn": ["T9"]}]}), &[]);
        assert_eq!(progress.state, ProgressState::DependencyMissing);
        assert_eq!(progress.steps[0].blockers, vec!["T9 (missing)"]);
        assert!(progress.next_action.text.contains("T9"));
    }

    #[test]
    fn test_progress_serializes_camel_case() {
        let progress = progress_for(json!({"tasks": [{"id": "T1", "doneCriteria": ["x"]}]}), &[]);
        let value = progress.to_value();
        assert_eq!(value["state"], "executing");
        assert_eq!(value["stepIndex"], 1);
        assert_eq!(value["nextAction"]["type"], "ask_model");
        assert_eq!(value["steps"][0]["doneCriteria"], json!(["x"]));
    }
}
