//! Batched bounded reads
//!
//! A consumer asks for slices of a draft with a request envelope and gets
//! one result item per read. Failures are reported per item and never abort
//! the batch.
//!
//! ```text
//! VCARD_READ: {"kind":"read","reads":[{"path":"description.md","offset":0,"limit":1200}]}
//! VCARD_READ_RESULT: {"kind":"read.result","items":[{"path":"description.md","type":"text",...}]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use vcard_core::coerce::{get_any, int, string};
use vcard_core::{Draft, DraftError, ReadConfig, Result};

use crate::dotted::is_dotted_path;
use crate::resolve::{resolve_path, Resolved};

pub const READ_REQUEST_MARKER: &str = "VCARD_READ:";
pub const READ_RESULT_MARKER: &str = "VCARD_READ_RESULT:";

const REQUEST_KIND: &str = "read";
const RESULT_KIND: &str = "read.result";

/// Number of narrower paths suggested when a value is too large
const HINT_PATHS: usize = 5;

/// One normalized read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadItemRequest {
    pub path: String,
    pub offset: usize,
    pub limit: usize,
}

/// Request envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRequest {
    pub kind: String,
    pub reads: Vec<ReadItemRequest>,
}

impl ReadRequest {
    pub fn new(reads: Vec<ReadItemRequest>) -> Self {
        Self {
            kind: REQUEST_KIND.to_string(),
            reads,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadItemType {
    Text,
    Json,
    Dir,
    Error,
}

/// Outcome of a single read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResultItem {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ReadItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReadResultItem {
    fn new(path: &str, kind: ReadItemType) -> Self {
        Self {
            path: path.to_string(),
            kind,
            offset: None,
            limit: None,
            total_len: None,
            has_more: None,
            next_offset: None,
            value: None,
            error: None,
        }
    }

    fn failed(path: &str, error: &DraftError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(path, ReadItemType::Error)
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == ReadItemType::Error
    }

    /// Text value of a text item
    pub fn text(&self) -> Option<&str> {
        match (&self.kind, &self.value) {
            (ReadItemType::Text, Some(Value::String(text))) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResult {
    pub kind: String,
    pub items: Vec<ReadResultItem>,
}

/// Normalize a request with the default limits
pub fn normalize_read_request(value: &Value) -> Result<ReadRequest> {
    normalize_read_request_with(value, &ReadConfig::default())
}

/// Normalize `{kind:"read", reads:[...]}` or a bare array of reads
///
/// Items may be path strings or objects. At most `max_reads` are kept,
/// `limit` is clamped to `[1, max_limit]` and a negative `offset` becomes 0.
pub fn normalize_read_request_with(value: &Value, config: &ReadConfig) -> Result<ReadRequest> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(obj) => {
            let kind = string(obj.get("kind"));
            if !kind.is_empty() && kind != REQUEST_KIND {
                return Err(DraftError::ReadRequest(format!(
                    "unexpected kind '{}'",
                    kind
                )));
            }
            get_any(obj, &["reads", "items"])
                .and_then(Value::as_array)
                .ok_or_else(|| DraftError::ReadRequest("missing 'reads' array".to_string()))?
        }
        _ => {
            return Err(DraftError::ReadRequest(
                "expected an object or an array".to_string(),
            ))
        }
    };

    if items.len() > config.max_reads {
        warn!(
            "Read request has {} items, keeping the first {}",
            items.len(),
            config.max_reads
        );
    }

    let max_limit = config.max_limit.max(1);
    let reads: Vec<ReadItemRequest> = items
        .iter()
        .take(config.max_reads)
        .map(|item| match item {
            Value::Object(obj) => ReadItemRequest {
                path: string(obj.get("path")).trim().to_string(),
                offset: int(obj.get("offset")).unwrap_or(0).max(0) as usize,
                limit: int(obj.get("limit"))
                    .map(|l| l.clamp(1, max_limit as i64) as usize)
                    .unwrap_or_else(|| config.default_limit.clamp(1, max_limit)),
            },
            other => ReadItemRequest {
                path: string(Some(other)).trim().to_string(),
                offset: 0,
                limit: config.default_limit.clamp(1, max_limit),
            },
        })
        .collect();

    if reads.is_empty() {
        return Err(DraftError::ReadRequest("no reads requested".to_string()));
    }
    Ok(ReadRequest::new(reads))
}

/// Answer every read in `request`
#[instrument(skip_all, fields(reads = request.reads.len()))]
pub fn build_read_result(draft: &Draft, request: &ReadRequest) -> ReadResult {
    let items: Vec<ReadResultItem> = request
        .reads
        .iter()
        .map(|read| read_one(draft, read))
        .collect();
    debug!(
        "Answered {} reads ({} failed)",
        items.len(),
        items.iter().filter(|i| i.is_error()).count()
    );
    ReadResult {
        kind: RESULT_KIND.to_string(),
        items,
    }
}

/// Answer a request as a marker-prefixed transcript line
pub fn build_read_result_text(draft: &Draft, request: &ReadRequest) -> Result<String> {
    let result = build_read_result(draft, request);
    Ok(format!("{} {}", READ_RESULT_MARKER, serde_json::to_string(&result)?))
}

/// Marker-prefixed request line
pub fn format_read_request(request: &ReadRequest) -> Result<String> {
    Ok(format!("{} {}", READ_REQUEST_MARKER, serde_json::to_string(request)?))
}

/// First JSON value after the last occurrence of `marker`
fn json_after_last_marker(text: &str, marker: &str) -> Result<Value> {
    let start = text
        .rfind(marker)
        .ok_or_else(|| DraftError::ReadRequest(format!("no {} marker found", marker)))?;
    let rest = &text[start + marker.len()..];

    serde_json::Deserializer::from_str(rest)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| DraftError::ReadRequest(format!("no JSON after {}", marker)))?
        .map_err(|e| DraftError::ReadRequest(e.to_string()))
}

/// Extract and normalize the last read request in a transcript
pub fn parse_read_request_text(text: &str) -> Result<ReadRequest> {
    normalize_read_request(&json_after_last_marker(text, READ_REQUEST_MARKER)?)
}

/// Extract the last read result in a transcript
pub fn parse_read_result_text(text: &str) -> Result<ReadResult> {
    let value = json_after_last_marker(text, READ_RESULT_MARKER)?;
    let result: ReadResult = serde_json::from_value(value)?;
    if result.kind != RESULT_KIND {
        return Err(DraftError::ReadRequest(format!(
            "unexpected kind '{}'",
            result.kind
        )));
    }
    Ok(result)
}

fn read_one(draft: &Draft, read: &ReadItemRequest) -> ReadResultItem {
    if read.path.is_empty() {
        let error = DraftError::InvalidPath("empty path".to_string());
        return ReadResultItem::failed(&read.path, &error);
    }

    match resolve_path(draft, &read.path) {
        Ok(Resolved::Text(text)) => slice_text(&read.path, &text, read.offset, read.limit),
        Ok(Resolved::Json(value)) => inline_json(&read.path, value, read.limit),
        Ok(Resolved::Dir(entries)) => ReadResultItem {
            value: Some(Value::from(entries)),
            ..ReadResultItem::new(&read.path, ReadItemType::Dir)
        },
        Err(e) => {
            debug!("Read of {} failed: {}", read.path, e);
            ReadResultItem::failed(&read.path, &e)
        }
    }
}

fn slice_text(path: &str, text: &str, offset: usize, limit: usize) -> ReadResultItem {
    let total = text.chars().count();
    let start = offset.min(total);
    let end = start.saturating_add(limit).min(total);
    let slice: String = text.chars().skip(start).take(end - start).collect();
    let has_more = end < total;

    ReadResultItem {
        offset: Some(start),
        limit: Some(limit),
        total_len: Some(total),
        has_more: Some(has_more),
        next_offset: has_more.then_some(end),
        value: Some(Value::String(slice)),
        ..ReadResultItem::new(path, ReadItemType::Text)
    }
}

fn inline_json(path: &str, value: Value, limit: usize) -> ReadResultItem {
    let size = serde_json::to_string(&value)
        .map(|s| s.chars().count())
        .unwrap_or(usize::MAX);

    if size <= limit {
        return ReadResultItem {
            total_len: Some(size),
            value: Some(value),
            ..ReadResultItem::new(path, ReadItemType::Json)
        };
    }

    let error = DraftError::ValueTooLarge {
        path: path.to_string(),
        size,
        limit,
        hint: narrower_paths(path, &value),
    };
    ReadResultItem::failed(path, &error)
}

/// A few child paths of `value`, in the same addressing style as `path`
fn narrower_paths(path: &str, value: &Value) -> String {
    let dotted = is_dotted_path(path);
    let base = path.trim_end_matches('/');

    let children: Vec<String> = match value {
        Value::Object(obj) => obj
            .keys()
            .take(HINT_PATHS)
            .map(|key| {
                if dotted {
                    format!("{}.{}", base, key)
                } else {
                    format!("{}/{}", base, key)
                }
            })
            .collect(),
        Value::Array(items) => (0..items.len().min(HINT_PATHS))
            .map(|idx| {
                if dotted {
                    format!("{}[{}]", base, idx)
                } else {
                    format!("{}/{}", base, idx)
                }
            })
            .collect(),
        _ => Vec::new(),
    };

    if children.is_empty() {
        format!("{} with a smaller limit", base)
    } else {
        children.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vcard_core::normalize_card_draft;

    fn draft() -> Draft {
        normalize_card_draft(&json!({
            "card": {"name": "Lily", "description": "héllo wörld", "tags": ["a", "b"]},
            "worldbook": {"entries": [{"id": 1, "comment": "Harbor", "content": "Boats"}]}
        }))
    }

    #[test]
    fn test_normalize_envelope() {
        let request = normalize_read_request(&json!({
            "kind": "read",
            "reads": [
                {"path": " name.md ", "offset": -5, "limit": 0},
                {"path": "description.md", "limit": 999999},
                "tags.json"
            ]
        }))
        .unwrap();

        assert_eq!(request.kind, "read");
        assert_eq!(
            request.reads,
            vec![
                ReadItemRequest { path: "name.md".to_string(), offset: 0, limit: 1 },
                ReadItemRequest { path: "description.md".to_string(), offset: 0, limit: 6000 },
                ReadItemRequest { path: "tags.json".to_string(), offset: 0, limit: 1200 },
            ]
        );
    }

    #[test]
    fn test_normalize_bare_array_and_cap() {
        let reads: Vec<Value> = (0..12)
            .map(|i| json!(format!("alternate_greetings/{}", i)))
            .collect();
        let request = normalize_read_request(&Value::from(reads)).unwrap();
        assert_eq!(request.reads.len(), 8);
        assert_eq!(request.reads[7].path, "alternate_greetings/7");
    }

    #[test]
    fn test_normalize_rejects_bad_envelopes() {
        let envelopes = [
            json!("name.md"),
            json!({"kind": "write", "reads": []}),
            json!({}),
            json!([]),
        ];
        for value in envelopes {
            assert!(matches!(
                normalize_read_request(&value),
                Err(DraftError::ReadRequest(_))
            ));
        }
    }

    #[test]
    fn test_text_slicing_counts_chars() {
        let d = draft();
        let request = ReadRequest::new(vec![ReadItemRequest {
            path: "description.md".to_string(),
            offset: 3,
            limit: 4,
        }]);
        let item = &build_read_result(&d, &request).items[0];

        assert_eq!(item.kind, ReadItemType::Text);
        assert_eq!(item.text(), Some("lo w"));
        assert_eq!(item.total_len, Some(11));
        assert_eq!(item.has_more, Some(true));
        assert_eq!(item.next_offset, Some(7));
    }

    #[test]
    fn test_offset_past_end() {
        let d = draft();
        let request = ReadRequest::new(vec![ReadItemRequest {
            path: "name.md".to_string(),
            offset: 50,
            limit: 10,
        }]);
        let item = &build_read_result(&d, &request).items[0];
        assert_eq!(item.text(), Some(""));
        assert_eq!(item.offset, Some(4));
        assert_eq!(item.has_more, Some(false));
        assert_eq!(item.next_offset, None);
    }

    #[test]
    fn test_json_over_limit_suggests_children() {
        let d = draft();
        let request = ReadRequest::new(vec![ReadItemRequest {
            path: "worldbook/Harbor".to_string(),
            offset: 0,
            limit: 10,
        }]);
        let item = &build_read_result(&d, &request).items[0];

        assert!(item.is_error());
        let error = item.error.as_deref().unwrap();
        assert!(error.contains("worldbook/Harbor/id"), "{}", error);
    }

    #[test]
    fn test_failures_are_per_item() {
        let d = draft();
        let request =
            normalize_read_request(&json!(["nope.md", "tags.json", "", "worldbook"])).unwrap();
        let result = build_read_result(&d, &request);

        assert_eq!(result.kind, "read.result");
        let kinds: Vec<ReadItemType> = result.items.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![ReadItemType::Error, ReadItemType::Json, ReadItemType::Error, ReadItemType::Dir]
        );
        assert_eq!(result.items[1].value, Some(json!(["a", "b"])));
    }

    #[test]
    fn test_last_request_marker_wins() {
        let transcript = format!(
            "{} [\"name.md\"]\nsome chat\n{}\n{{\"kind\":\"read\",\"reads\":[\"tags.json\"]}} trailing words",
            READ_REQUEST_MARKER, READ_REQUEST_MARKER
        );
        let request = parse_read_request_text(&transcript).unwrap();
        assert_eq!(request.reads[0].path, "tags.json");

        assert!(parse_read_request_text("no marker here").is_err());
        assert!(parse_read_request_text("VCARD_READ: not json").is_err());
    }

    #[test]
    fn test_result_text_parses_back() {
        let d = draft();
        let request = normalize_read_request(&json!(["name.md", "card.tags"])).unwrap();
        let text = build_read_result_text(&d, &request).unwrap();
        assert!(text.starts_with(READ_RESULT_MARKER));

        let parsed = parse_read_result_text(&text).unwrap();
        assert_eq!(parsed, build_read_result(&d, &request));
    }

    #[test]
    fn test_result_marker_is_not_a_request() {
        let d = draft();
        let request = normalize_read_request(&json!(["name.md"])).unwrap();
        let text = build_read_result_text(&d, &request).unwrap();
        assert!(parse_read_request_text(&text).is_err());
    }

    #[test]
    fn test_format_request_parses_back() {
        let request = normalize_read_request(&json!(["name.md"])).unwrap();
        let line = format_read_request(&request).unwrap();
        assert_eq!(parse_read_request_text(&line).unwrap(), request);
    }
}
