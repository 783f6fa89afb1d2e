//! Dotted JSON addressing: `worldbook.entries[0].content`

use serde_json::Value;
use vcard_core::{Draft, DraftError, Result};

use crate::path::FILE_EXTENSIONS;

/// Top-level keys a dotted path may start from
pub const DOTTED_ROOTS: [&str; 5] = ["card", "worldbook", "regex_scripts", "tavern_helper", "raw"];

#[derive(Debug, PartialEq)]
enum Step {
    Key(String),
    Index(usize),
}

fn first_token(path: &str) -> &str {
    let end = path.find(['.', '[']).unwrap_or(path.len());
    &path[..end]
}

/// True for `card.name`, `worldbook.entries[0]` and the like
///
/// Slash paths, bare names and `<root>.md` style file names are not dotted.
pub fn is_dotted_path(path: &str) -> bool {
    let path = path.trim();
    if path.contains(['/', '\\']) || !DOTTED_ROOTS.contains(&first_token(path)) {
        return false;
    }
    let rest = &path[first_token(path).len()..];
    if rest.is_empty() {
        return false;
    }
    !FILE_EXTENSIONS.contains(&rest)
}

fn parse_steps(path: &str) -> Result<Vec<Step>> {
    let invalid = || DraftError::InvalidPath(path.to_string());
    let mut steps = Vec::new();

    for token in path.split('.') {
        let (key, mut rest) = match token.find('[') {
            Some(pos) => (&token[..pos], &token[pos..]),
            None => (token, ""),
        };
        if key.is_empty() && rest.is_empty() {
            return Err(invalid());
        }
        if !key.is_empty() {
            steps.push(Step::Key(key.to_string()));
        }
        while !rest.is_empty() {
            let close = rest.find(']').ok_or_else(invalid)?;
            let index = rest
                .get(1..close)
                .and_then(|s| s.trim().parse::<usize>().ok())
                .ok_or_else(invalid)?;
            steps.push(Step::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(invalid());
            }
        }
    }
    Ok(steps)
}

/// Walk the draft's JSON along a dotted path
///
/// A leading `card.` in front of another root is dropped, so
/// `card.worldbook.entries` and `worldbook.entries` are the same value.
pub fn resolve_dotted_path(draft: &Draft, path: &str) -> Result<Value> {
    let path = path.trim();
    let mut steps = parse_steps(path)?;

    match steps.first() {
        Some(Step::Key(root)) if DOTTED_ROOTS.contains(&root.as_str()) => {}
        _ => {
            return Err(DraftError::InvalidPath(format!(
                "{} (must start with one of: {})",
                path,
                DOTTED_ROOTS.join(", ")
            )))
        }
    }
    if let [Step::Key(first), Step::Key(second), ..] = steps.as_slice() {
        if first == "card" && second != "card" && DOTTED_ROOTS.contains(&second.as_str()) {
            steps.remove(0);
        }
    }

    let root = draft.to_value();
    let mut current = &root;
    let mut walked = String::new();

    for step in &steps {
        current = match step {
            Step::Key(key) => {
                if !walked.is_empty() {
                    walked.push('.');
                }
                walked.push_str(key);
                current
                    .as_object()
                    .and_then(|obj| obj.get(key))
                    .ok_or_else(|| DraftError::PathNotFound(walked.clone()))?
            }
            Step::Index(index) => {
                let items = current
                    .as_array()
                    .ok_or_else(|| DraftError::PathNotFound(format!("{}[{}]", walked, index)))?;
                let item = items.get(*index).ok_or_else(|| DraftError::IndexOutOfRange {
                    path: walked.clone(),
                    index: *index,
                    len: items.len(),
                })?;
                walked.push_str(&format!("[{}]", index));
                item
            }
        };
    }

    Ok(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vcard_core::normalize_card_draft;

    fn draft() -> Draft {
        normalize_card_draft(&json!({
            "card": {"name": "Lily", "tags": ["a", "b"]},
            "worldbook": {"entries": [{"id": 1, "content": "lore"}]},
            "raw": {"dataExtensions": {"custom": {"grid": [[1, 2], [3]]}}}
        }))
    }

    #[test]
    fn test_is_dotted_path() {
        assert!(is_dotted_path("card.name"));
        assert!(is_dotted_path("worldbook.entries[0].content"));
        assert!(is_dotted_path("card[0]"));
        assert!(!is_dotted_path("worldbook"));
        assert!(!is_dotted_path("name.md"));
        assert!(!is_dotted_path("card.md"));
        assert!(!is_dotted_path("worldbook/Harbor.md"));
        assert!(!is_dotted_path("meta.updatedAt"));
    }

    #[test]
    fn test_resolve() {
        let d = draft();
        assert_eq!(resolve_dotted_path(&d, "card.name").unwrap(), "Lily");
        assert_eq!(resolve_dotted_path(&d, "card.tags[1]").unwrap(), "b");
        assert_eq!(
            resolve_dotted_path(&d, "worldbook.entries[0].content").unwrap(),
            "lore"
        );
        assert_eq!(
            resolve_dotted_path(&d, "card.worldbook.entries[0].content").unwrap(),
            "lore"
        );
        assert_eq!(
            resolve_dotted_path(&d, "raw.dataExtensions.custom.grid[0][1]").unwrap(),
            2
        );
    }

    #[test]
    fn test_errors() {
        let d = draft();
        assert!(matches!(
            resolve_dotted_path(&d, "meta.spec"),
            Err(DraftError::InvalidPath(_))
        ));
        assert!(matches!(
            resolve_dotted_path(&d, "card.missing"),
            Err(DraftError::PathNotFound(p)) if p == "card.missing"
        ));
        assert!(matches!(
            resolve_dotted_path(&d, "worldbook.entries[3]"),
            Err(DraftError::IndexOutOfRange { index: 3, len: 1, .. })
        ));
        assert!(matches!(
            resolve_dotted_path(&d, "card.tags[x]"),
            Err(DraftError::InvalidPath(_))
        ));
        assert!(matches!(
            resolve_dotted_path(&d, "card..name"),
            Err(DraftError::InvalidPath(_))
        ));
    }
}
