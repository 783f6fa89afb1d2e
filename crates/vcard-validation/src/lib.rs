//! vcard Validation - lint rules and progress reporting
//!
//! Lint never fails: findings accumulate as error and warning strings in a
//! fixed order (card, worldbook, regex scripts, plan). Progress is derived
//! from the embedded plan's scheduler resolution and carries the templated
//! instruction for whoever drives the next edit.

pub mod lint;
pub mod progress;

pub use lint::{apply_lint, apply_lint_with, lint_card_draft, lint_card_draft_with, LintReport};
pub use progress::{
    build_progress, NextAction, NextActionKind, Progress, ProgressState, ProgressStep,
};
