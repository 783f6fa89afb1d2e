//! Human-readable parts of a board

use vcard_core::{Card, Draft};
use vcard_validation::{NextActionKind, Progress, ProgressState};

fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Card name, field sizes, collection counts and validation findings
pub fn render_preview(draft: &Draft) -> String {
    let card = &draft.card;
    let mut md = String::new();

    let name = card.name.trim();
    md.push_str(&format!(
        "## Draft: {}\n\n",
        if name.is_empty() { "(unnamed)" } else { name }
    ));

    md.push_str("| Field | Chars |\n|---|---|\n");
    for field in Card::TEXT_FIELDS.iter().skip(1) {
        let text = card.text_field(field).unwrap_or_default();
        md.push_str(&format!("| {} | {} |\n", field, char_count(text)));
    }
    md.push('\n');

    md.push_str(&format!(
        "- Alternate greetings: {}\n",
        card.alternate_greetings.len()
    ));
    if card.tags.is_empty() {
        md.push_str("- Tags: none\n");
    } else {
        md.push_str(&format!("- Tags: {}\n", card.tags.join(", ")));
    }

    let entries = &draft.worldbook.entries;
    let enabled = entries.iter().filter(|e| e.enabled).count();
    md.push_str(&format!(
        "- Worldbook entries: {} ({} enabled)\n",
        entries.len(),
        enabled
    ));
    md.push_str(&format!("- Regex scripts: {}\n", draft.regex_scripts.len()));
    md.push_str(&format!(
        "- Helper scripts: {}, variables: {}\n",
        draft.tavern_helper.scripts.len(),
        draft.tavern_helper.variables.len()
    ));
    md.push('\n');

    md.push_str("### Validation\n\n");
    let validation = &draft.validation;
    if validation.errors.is_empty() && validation.warnings.is_empty() {
        md.push_str("No issues.\n");
    } else {
        for error in &validation.errors {
            md.push_str(&format!("- Error: {}\n", error));
        }
        for warning in &validation.warnings {
            md.push_str(&format!("- Warning: {}\n", warning));
        }
    }

    md
}

/// Blockquote with plan state and the next instruction
pub fn render_progress_banner(progress: &Progress) -> String {
    let mut md = String::new();

    let state = match progress.state {
        ProgressState::NoPlan => "no plan",
        ProgressState::AllDone => "all done",
        ProgressState::DependencyCycle => "dependency cycle",
        ProgressState::DependencyMissing => "missing dependency",
        ProgressState::Executing => "executing",
    };

    match progress.step_index {
        Some(index) => md.push_str(&format!(
            "> **Progress:** {} | step {}/{}: {}\n",
            state, index, progress.total_steps, progress.step_name
        )),
        None => md.push_str(&format!("> **Progress:** {}\n", state)),
    }

    let who = match progress.next_action.kind {
        NextActionKind::AskModel => "model",
        NextActionKind::AskUser => "user",
    };
    md.push_str(&format!("> **Next ({}):**", who));
    for line in progress.next_action.text.lines() {
        if line.is_empty() {
            md.push_str("\n>");
        } else {
            md.push_str(&format!("\n> {}", line));
        }
    }
    md.push('\n');

    md
}
