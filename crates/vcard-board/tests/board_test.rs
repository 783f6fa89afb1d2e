//! Integration tests for the board transcript protocol
//!
//! Tests the full build/parse cycle including:
//! - Snapshot round trip through Markdown
//! - Last-board-wins over an append-only transcript
//! - Payloads that contain sentinels and fences
//! - Diffing consecutive boards

use chrono::{TimeZone, Utc};
use serde_json::json;
use vcard_board::{
    append_board, build_draft_board_markdown_at, draft_artifact_diff,
    parse_draft_from_board_markdown, BOARD_END, BOARD_START,
};
use vcard_core::{normalize_card_draft, Draft, DraftError};

/// Helper to create a draft with a small plan
fn sample_draft(name: &str) -> Draft {
    normalize_card_draft(&json!({
        "card": {"name": name, "description": "desc", "first_mes": "hello"},
        "worldbook": {"entries": [{"id": 1, "keys": ["k"], "content": "lore"}]},
        "raw": {"dataExtensions": {"vibePlan": {"tasks": [
            {"id": "T1", "title": "Identity", "status": "done"},
            {"id": "T2", "title": "Greeting", "dependsOn": ["T1"]}
        ]}}}
    }))
}

#[test]
fn test_board_round_trip() {
    let now = Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap();
    let draft = sample_draft("Lily");
    let md = build_draft_board_markdown_at(&draft, now).unwrap();

    assert!(md.contains(BOARD_START));
    assert!(md.contains(BOARD_END));
    assert!(md.contains("step 2/2: Greeting"));

    let snapshot = parse_draft_from_board_markdown(&md).unwrap();
    assert_eq!(snapshot.draft.card, draft.card);
    assert_eq!(snapshot.draft.worldbook, draft.worldbook);
    assert_eq!(snapshot.draft.meta.updated_at, "2024-03-09T08:30:00.000Z");

    let progress = snapshot.draft.meta.progress.as_ref().unwrap();
    assert_eq!(progress["state"], "executing");
    assert_eq!(progress["stepIndex"], 2);
}

#[test]
fn test_board_is_stable_when_rebuilt() {
    let now = Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap();
    let md = build_draft_board_markdown_at(&sample_draft("Lily"), now).unwrap();
    let snapshot = parse_draft_from_board_markdown(&md).unwrap();
    let rebuilt = build_draft_board_markdown_at(&snapshot.draft, now).unwrap();
    assert_eq!(md, rebuilt);
}

#[test]
fn test_last_board_wins() {
    let transcript = append_board("User: make a card", &sample_draft("First")).unwrap();
    let transcript = format!("{}\nAssistant: updated it.\n", transcript);
    let transcript = append_board(&transcript, &sample_draft("Second")).unwrap();

    let snapshot = parse_draft_from_board_markdown(&transcript).unwrap();
    assert_eq!(snapshot.draft.card.name, "Second");
    assert!(transcript.starts_with("User: make a card\n\n"));
}

#[test]
fn test_unterminated_latest_board_falls_back() {
    let transcript = append_board("", &sample_draft("Complete")).unwrap();
    let transcript = format!("{}\n{}\n``````json\n{{\"card\": ", transcript, BOARD_START);

    let snapshot = parse_draft_from_board_markdown(&transcript).unwrap();
    assert_eq!(snapshot.draft.card.name, "Complete");
}

#[test]
fn test_payload_with_sentinels_and_fences() {
    let mut draft = sample_draft("Tricky");
    draft.card.description = format!(
        "before {} ``````json {{}} `````` {} after <b>bold</b>",
        BOARD_END, BOARD_START
    );

    let md = build_draft_board_markdown_at(&draft, Utc::now()).unwrap();
    assert_eq!(md.matches(BOARD_START).count(), 1);
    assert_eq!(md.matches(BOARD_END).count(), 1);

    let snapshot = parse_draft_from_board_markdown(&md).unwrap();
    assert_eq!(snapshot.draft.card.description, draft.card.description);
    assert!(snapshot.raw_json.contains("\\u003cb\\u003e"));
}

#[test]
fn test_preview_text_is_not_mistaken_for_a_board() {
    let err =
        parse_draft_from_board_markdown("VCARD_DRAFT_JSON_START without the comment").unwrap_err();
    assert!(matches!(err, DraftError::BoardUninitialized));
}

#[test]
fn test_diff_between_boards() {
    let before = parse_draft_from_board_markdown(
        &build_draft_board_markdown_at(&sample_draft("Lily"), Utc::now()).unwrap(),
    )
    .unwrap()
    .draft;

    let mut edited = before.clone();
    edited.card.first_mes = "Welcome back".to_string();
    let after = parse_draft_from_board_markdown(
        &build_draft_board_markdown_at(&edited, Utc::now()).unwrap(),
    )
    .unwrap()
    .draft;

    let diff = draft_artifact_diff(&before, &after);
    assert_eq!(diff.changed_paths, vec!["card.first_mes"]);
}
