//! Board serialization and transcript parsing
//!
//! Wire format:
//!
//! ````````text
//! <preview and progress banner>
//! <!-- VCARD_DRAFT_JSON_START -->
//! ``````json
//! { ...normalized draft... }
//! ``````
//! <!-- VCARD_DRAFT_JSON_END -->
//! ````````
//!
//! The payload escapes `<`, `>` and the backtick as JSON unicode escapes, so
//! neither a sentinel nor a fence can appear inside it.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use vcard_core::{normalize_card_draft, Draft, DraftError, Result};
use vcard_planning::timestamp;
use vcard_validation::{apply_lint, lint_card_draft};

use crate::render::{render_preview, render_progress_banner};

pub const BOARD_START: &str = "<!-- VCARD_DRAFT_JSON_START -->";
pub const BOARD_END: &str = "<!-- VCARD_DRAFT_JSON_END -->";
/// Six backticks; long enough that no three-backtick fence inside a card closes it
pub const BOARD_FENCE: &str = "``````";

/// A draft recovered from a transcript
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    /// Re-normalized and re-linted draft
    pub draft: Draft,
    /// JSON text exactly as it appeared inside the fence
    pub raw_json: String,
}

/// Escape the characters that could form a sentinel or a fence
fn escape_payload(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '`' => out.push_str("\\u0060"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a board for `draft`, stamped with the current time
pub fn build_draft_board_markdown(draft: &Draft) -> Result<String> {
    build_draft_board_markdown_at(draft, Utc::now())
}

/// Render a board for `draft`, stamped with `now`
///
/// The snapshot is re-normalized and re-linted first, refreshing
/// `meta.updatedAt`, `validation` and `meta.progress`.
#[instrument(skip_all, fields(card = %draft.card.name))]
pub fn build_draft_board_markdown_at(draft: &Draft, now: DateTime<Utc>) -> Result<String> {
    let mut snapshot = normalize_card_draft(&draft.to_value());
    snapshot.meta.updated_at = timestamp(now);

    let report = lint_card_draft(&snapshot);
    snapshot.meta.progress = Some(report.progress.to_value());
    snapshot.validation.errors = report.errors;
    snapshot.validation.warnings = report.warnings;

    let payload = escape_payload(&serde_json::to_string_pretty(&snapshot)?);

    let mut md = String::new();
    md.push_str(&render_preview(&snapshot));
    md.push('\n');
    md.push_str(&render_progress_banner(&report.progress));
    md.push('\n');
    md.push_str(BOARD_START);
    md.push('\n');
    md.push_str(BOARD_FENCE);
    md.push_str("json\n");
    md.push_str(&payload);
    md.push('\n');
    md.push_str(BOARD_FENCE);
    md.push('\n');
    md.push_str(BOARD_END);
    md.push('\n');

    debug!("Built board ({} bytes)", md.len());
    Ok(md)
}

/// Append a fresh board to a transcript
pub fn append_board(transcript: &str, draft: &Draft) -> Result<String> {
    let board = build_draft_board_markdown(draft)?;
    let trimmed = transcript.trim_end();
    if trimmed.is_empty() {
        Ok(board)
    } else {
        Ok(format!("{}\n\n{}", trimmed, board))
    }
}

/// Text between the last END marker and the START marker preceding it
fn last_complete_block(text: &str) -> Option<&str> {
    let end = text.rfind(BOARD_END)?;
    let start = text[..end].rfind(BOARD_START)?;
    Some(&text[start + BOARD_START.len()..end])
}

/// Body of the first fenced block (three or more backticks)
fn extract_fenced_json(block: &str) -> Option<&str> {
    let open = block.find("```")?;
    let fence_len = block[open..].chars().take_while(|c| *c == '`').count();
    let fence = &block[open..open + fence_len];

    // Skip the info string (`json`) on the opening line
    let after_open = &block[open + fence_len..];
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];

    let close = body.rfind(fence)?;
    Some(body[..close].trim())
}

/// Recover the current draft from a transcript
///
/// The last complete START/END pair wins. A newer START with no END is
/// ignored in favour of the last complete pair, and is only an error when
/// there is no complete pair at all.
#[instrument(skip_all, fields(len = markdown.len()))]
pub fn parse_draft_from_board_markdown(markdown: &str) -> Result<BoardSnapshot> {
    if !markdown.contains(BOARD_START) {
        return Err(DraftError::BoardUninitialized);
    }

    let block = last_complete_block(markdown).ok_or(DraftError::BoardUnterminated)?;

    let last_start = markdown.rfind(BOARD_START);
    let last_end = markdown.rfind(BOARD_END);
    if let (Some(last_start), Some(last_end)) = (last_start, last_end) {
        if last_start > last_end {
            warn!("Ignoring unterminated board after the last complete one");
        }
    }

    let raw_json = extract_fenced_json(block).ok_or(DraftError::BoardMissingFence)?;

    let value: Value = serde_json::from_str(raw_json).map_err(|e| DraftError::BoardInvalidJson {
        message: e.to_string(),
        raw_json: raw_json.to_string(),
    })?;
    if !value.is_object() {
        return Err(DraftError::BoardInvalidJson {
            message: "snapshot is not a JSON object".to_string(),
            raw_json: raw_json.to_string(),
        });
    }

    Ok(BoardSnapshot {
        draft: apply_lint(&normalize_card_draft(&value)),
        raw_json: raw_json.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(json: &str) -> String {
        format!("{}\n``````json\n{}\n``````\n{}\n", BOARD_START, json, BOARD_END)
    }

    #[test]
    fn test_escape_payload() {
        assert_eq!(
            escape_payload(r#"{"a":"<b>`x`</b>"}"#),
            r#"{"a":"\u003cb\u003e\u0060x\u0060\u003c/b\u003e"}"#
        );
    }

    #[test]
    fn test_no_board_is_uninitialized() {
        let err = parse_draft_from_board_markdown("just chatting").unwrap_err();
        assert!(err.is_uninitialized());
    }

    #[test]
    fn test_unterminated_board() {
        let md = format!("{}\n``````json\n{{}}\n", BOARD_START);
        assert!(matches!(
            parse_draft_from_board_markdown(&md),
            Err(DraftError::BoardUnterminated)
        ));
    }

    #[test]
    fn test_missing_fence() {
        let md = format!("{}\n{{}}\n{}", BOARD_START, BOARD_END);
        assert!(matches!(
            parse_draft_from_board_markdown(&md),
            Err(DraftError::BoardMissingFence)
        ));
    }

    #[test]
    fn test_invalid_json_keeps_raw_text() {
        let err = parse_draft_from_board_markdown(&board_with("{\"card\": ")).unwrap_err();
        assert_eq!(err.raw_json(), Some("{\"card\":"));

        let err = parse_draft_from_board_markdown(&board_with("[1, 2]")).unwrap_err();
        assert_eq!(err.raw_json(), Some("[1, 2]"));
    }

    #[test]
    fn test_three_backtick_fence_is_accepted() {
        let md = format!(
            "{}\n```json\n{{\"card\": {{\"name\": \"Short\"}}}}\n```\n{}",
            BOARD_START, BOARD_END
        );
        let snapshot = parse_draft_from_board_markdown(&md).unwrap();
        assert_eq!(snapshot.draft.card.name, "Short");
    }

    #[test]
    fn test_parse_relints() {
        let snapshot = parse_draft_from_board_markdown(&board_with("{}")).unwrap();
        assert_eq!(snapshot.draft.validation.errors.len(), 3);
        assert!(snapshot.draft.meta.progress.is_some());
    }
}
