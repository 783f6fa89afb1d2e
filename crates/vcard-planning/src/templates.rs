//! Template plans for new cards

use chrono::{DateTime, Utc};

use crate::plan::*;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn task(
    id: &str,
    title: &str,
    depends_on: &[&str],
    kind_hint: &str,
    patch_hints: &[&str],
    done_criteria: &[&str],
) -> Task {
    Task {
        id: id.to_string(),
        title: title.to_string(),
        status: TaskStatus::Todo,
        depends_on: strings(depends_on),
        kind_hint: kind_hint.to_string(),
        patch_hints: strings(patch_hints),
        done_criteria: strings(done_criteria),
        notes: String::new(),
    }
}

/// Five-step plan covering identity, greeting, examples, lore and review
pub fn starter_plan(goal: impl Into<String>, now: DateTime<Utc>) -> VibePlan {
    let stamp = timestamp(now);
    VibePlan {
        version: VibePlan::VERSION,
        goal: goal.into(),
        created_at: stamp.clone(),
        updated_at: stamp,
        tasks: vec![
            task(
                "T1",
                "Define the character's identity",
                &[],
                "card",
                &["card.name", "card.description", "card.personality"],
                &[
                    "card.name is set",
                    "card.description establishes appearance and background",
                ],
            ),
            task(
                "T2",
                "Write the opening message",
                &["T1"],
                "card",
                &["card.first_mes", "card.alternate_greetings", "card.scenario"],
                &["card.first_mes sets the scene in the character's voice"],
            ),
            task(
                "T3",
                "Add example dialogue",
                &["T1"],
                "card",
                &["card.mes_example"],
                &["card.mes_example shows at least two exchanges"],
            ),
            task(
                "T4",
                "Build worldbook entries",
                &["T1"],
                "worldbook",
                &["worldbook.entries"],
                &["Key people, places and terms have entries with keys"],
            ),
            task(
                "T5",
                "Review and polish",
                &["T2", "T3", "T4"],
                "review",
                &["card.creator_notes", "card.tags"],
                &["Lint reports no errors", "card.creator_notes explains usage"],
            ),
        ],
        cursor: Cursor {
            current_task_id: Some("T1".to_string()),
        },
    }
}

/// Single-task plan for quick edits
pub fn minimal_plan(goal: impl Into<String>, now: DateTime<Utc>) -> VibePlan {
    let goal = goal.into();
    let stamp = timestamp(now);
    VibePlan {
        version: VibePlan::VERSION,
        created_at: stamp.clone(),
        updated_at: stamp,
        tasks: vec![task("T1", &goal, &[], "card", &[], &["Lint reports no errors"])],
        goal,
        cursor: Cursor {
            current_task_id: Some("T1".to_string()),
        },
    }
}
