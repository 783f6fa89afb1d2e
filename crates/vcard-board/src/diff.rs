//! Structural diff over the exported parts of a draft

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;
use vcard_core::{DiffConfig, Draft};

/// Subtrees that make up the exported artifact
pub const ARTIFACT_ROOTS: [&str; 4] = ["card", "worldbook", "regex_scripts", "tavern_helper"];

/// Changed artifact paths between two drafts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDiff {
    pub artifact_changed: bool,
    /// Sorted, de-duplicated and capped
    pub changed_paths: Vec<String>,
}

/// Diff with the default path cap
pub fn draft_artifact_diff(before: &Draft, after: &Draft) -> ArtifactDiff {
    draft_artifact_diff_with(before, after, &DiffConfig::default())
}

/// Diff two drafts, reporting at most `config.max_paths` paths
pub fn draft_artifact_diff_with(
    before: &Draft,
    after: &Draft,
    config: &DiffConfig,
) -> ArtifactDiff {
    let before = before.to_value();
    let after = after.to_value();

    let mut paths = BTreeSet::new();
    for root in ARTIFACT_ROOTS {
        walk(root.to_string(), before.get(root), after.get(root), &mut paths);
    }

    if paths.len() > config.max_paths {
        debug!(
            "Artifact diff truncated: {} paths, cap {}",
            paths.len(),
            config.max_paths
        );
    }

    ArtifactDiff {
        artifact_changed: !paths.is_empty(),
        changed_paths: paths.into_iter().take(config.max_paths).collect(),
    }
}

fn walk(path: String, before: Option<&Value>, after: Option<&Value>, out: &mut BTreeSet<String>) {
    match (before, after) {
        (Some(Value::Object(b)), Some(Value::Object(a))) => {
            let keys: BTreeSet<&String> = b.keys().chain(a.keys()).collect();
            for key in keys {
                walk(format!("{}.{}", path, key), b.get(key), a.get(key), out);
            }
        }
        (Some(Value::Array(b)), Some(Value::Array(a))) => {
            if b.len() != a.len() {
                out.insert(path);
                return;
            }
            for (idx, (x, y)) in b.iter().zip(a).enumerate() {
                walk(format!("{}[{}]", path, idx), Some(x), Some(y), out);
            }
        }
        (b, a) if b == a => {}
        _ => {
            out.insert(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vcard_core::normalize_card_draft;

    fn draft(value: Value) -> Draft {
        normalize_card_draft(&value)
    }

    #[test]
    fn test_identical_drafts() {
        let d = draft(json!({"card": {"name": "A"}, "worldbook": {"entries": [{"id": 1}]}}));
        assert_eq!(draft_artifact_diff(&d, &d), ArtifactDiff::default());
    }

    #[test]
    fn test_leaf_paths() {
        let before = draft(json!({
            "card": {"name": "A"},
            "worldbook": {"entries": [{"id": 1, "content": "x"}]}
        }));
        let after = draft(json!({
            "card": {"name": "B"},
            "worldbook": {"entries": [{"id": 1, "content": "y"}]}
        }));
        let diff = draft_artifact_diff(&before, &after);
        assert!(diff.artifact_changed);
        assert_eq!(
            diff.changed_paths,
            vec!["card.name", "worldbook.entries[0].content"]
        );
    }

    #[test]
    fn test_length_change_reports_array_path() {
        let before = draft(json!({"card": {"tags": ["a"]}}));
        let after = draft(json!({"card": {"tags": ["a", "b"]}}));
        assert_eq!(
            draft_artifact_diff(&before, &after).changed_paths,
            vec!["card.tags"]
        );
    }

    #[test]
    fn test_non_artifact_changes_are_ignored() {
        let before = draft(json!({"card": {"name": "A"}}));
        let mut after = before.clone();
        after.meta.updated_at = "2024-01-01T00:00:00.000Z".to_string();
        after.validation.errors.push("x".to_string());
        after.raw.data_extensions.insert("vibePlan".to_string(), json!({}));
        assert!(!draft_artifact_diff(&before, &after).artifact_changed);
    }

    #[test]
    fn test_cap() {
        let plain: Vec<_> = (0..10).map(|i| json!({"id": i})).collect();
        let filled: Vec<_> = (0..10).map(|i| json!({"id": i, "content": "c"})).collect();
        let before = draft(json!({"worldbook": {"entries": plain}}));
        let after = draft(json!({"worldbook": {"entries": filled}}));
        let diff = draft_artifact_diff_with(&before, &after, &DiffConfig { max_paths: 3 });
        assert!(diff.artifact_changed);
        assert_eq!(diff.changed_paths.len(), 3);
    }
}
