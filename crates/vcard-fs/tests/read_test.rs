//! Integration tests for the read protocol
//!
//! Tests a consumer walking a large draft:
//! - Discovering folders before reading leaves
//! - Paging through a long text with nextOffset
//! - Mixed slash and dotted addressing in one batch
//! - Request/result exchange through transcript markers

use serde_json::json;
use vcard_core::{normalize_card_draft, Draft};
use vcard_fs::{
    build_file_tree, build_read_result, build_read_result_text, normalize_read_request,
    parse_read_request_text, parse_read_result_text, ReadItemRequest, ReadItemType, ReadRequest,
};

/// Helper to create a draft with a long description
fn large_draft() -> Draft {
    let description: String = (0..500).map(|i| format!("line {} ", i)).collect();
    normalize_card_draft(&json!({
        "card": {"name": "Archivist", "description": description, "first_mes": "Welcome."},
        "worldbook": {"entries": [
            {"id": 1, "comment": "Library", "keys": ["books"], "content": "Endless shelves."},
            {"id": 2, "comment": "Vault/Lower", "content": "Locked."}
        ]},
        "regex_scripts": [{"id": "r-1", "name": "hide", "find": "/secret/gi", "replace": ""}]
    }))
}

fn read(path: &str, offset: usize, limit: usize) -> ReadRequest {
    ReadRequest::new(vec![ReadItemRequest {
        path: path.to_string(),
        offset,
        limit,
    }])
}

#[test]
fn test_discover_then_read() {
    let draft = large_draft();

    let listing = &build_read_result(&draft, &read("worldbook", 0, 1200)).items[0];
    assert_eq!(listing.kind, ReadItemType::Dir);
    assert_eq!(listing.value, Some(json!(["Library", "Vault_Lower"])));

    let request = read("Archivist/worldbook/Vault_Lower/content.md", 0, 1200);
    let content = &build_read_result(&draft, &request).items[0];
    assert_eq!(content.text(), Some("Locked."));
}

#[test]
fn test_paging_reassembles_text() {
    let draft = large_draft();
    let mut offset = 0;
    let mut assembled = String::new();
    let mut pages = 0;

    loop {
        let item = build_read_result(&draft, &read("description.md", offset, 1000))
            .items
            .remove(0);
        assembled.push_str(item.text().unwrap());
        pages += 1;
        match item.next_offset {
            Some(next) => offset = next,
            None => break,
        }
    }

    assert_eq!(assembled, draft.card.description);
    assert_eq!(pages, draft.card.description.chars().count().div_ceil(1000));
}

#[test]
fn test_mixed_addressing() {
    let draft = large_draft();
    let request = normalize_read_request(&json!({
        "kind": "read",
        "reads": [
            "regex_scripts/hide/flags",
            {"path": "card.worldbook.entries[0].keys"},
            {"path": "worldbook.entries[5]"},
            {"path": "first_mes"}
        ]
    }))
    .unwrap();
    let result = build_read_result(&draft, &request);

    assert_eq!(result.items[0].text(), Some("gi"));
    assert_eq!(result.items[1].value, Some(json!(["books"])));
    assert!(result.items[2].is_error());
    assert_eq!(result.items[3].text(), Some("Welcome."));
}

#[test]
fn test_transcript_exchange() {
    let draft = large_draft();
    let transcript = "Assistant: let me look.\n\
        VCARD_READ: {\"kind\":\"read\",\"reads\":[\"name.md\",\"worldbook\"]}\n";

    let request = parse_read_request_text(transcript).unwrap();
    let reply = build_read_result_text(&draft, &request).unwrap();
    let result = parse_read_result_text(&format!("{}{}\n", transcript, reply)).unwrap();

    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0].text(), Some("Archivist"));
    assert_eq!(result.items[1].kind, ReadItemType::Dir);
}

#[test]
fn test_tree_lists_sanitized_names() {
    let tree = build_file_tree(&large_draft());
    assert!(tree.starts_with("Archivist/\n"));
    assert!(tree.contains("    Vault_Lower (7)\n"));
    assert!(tree.contains("    hide (6)\n"));
}
