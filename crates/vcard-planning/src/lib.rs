//! vcard Planning - task plans embedded in a draft
//!
//! A [`VibePlan`] lives inside the draft's passthrough bag under `vibePlan`.
//! This crate normalizes it, resolves which task is actionable next and
//! advances the cursor when a task finishes. Nothing here repairs a broken
//! dependency graph; cycles and missing ids are reported, never fixed.

pub mod draft_ext;
pub mod plan;
pub mod scheduler;
pub mod templates;

pub use draft_ext::DraftPlanExt;
pub use plan::{normalize_vibe_plan, timestamp, Cursor, Task, TaskStatus, VibePlan};
pub use scheduler::{
    advance_vibe_plan, detect_cycle, detect_cycle_from, pick_vibe_plan_current, Resolution,
};
pub use templates::{minimal_plan, starter_plan};
