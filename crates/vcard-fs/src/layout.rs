//! Folder naming for the collections of a draft

use std::collections::HashMap;
use vcard_core::Draft;

use crate::path::{sanitize_name, strip_extension};

pub const ALTERNATE_GREETINGS_DIR: &str = "alternate_greetings";
pub const WORLDBOOK_DIR: &str = "worldbook";
pub const REGEX_SCRIPTS_DIR: &str = "regex_scripts";
pub const TAVERN_HELPER_DIR: &str = "tavern_helper";
pub const SCRIPTS_DIR: &str = "scripts";
pub const VARIABLES_DIR: &str = "variables";
pub const TAGS_FILE: &str = "tags.json";

/// Per-item folder names
///
/// A sanitized name is used when it is non-empty, unique and not a plain
/// number; anything else falls back to the item's index.
pub fn folder_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let sanitized: Vec<String> = names.into_iter().map(sanitize_name).collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in &sanitized {
        *counts.entry(name.as_str()).or_default() += 1;
    }

    sanitized
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let usable = !name.is_empty()
                && counts.get(name.as_str()) == Some(&1)
                && name.parse::<u64>().is_err();
            if usable {
                name.clone()
            } else {
                idx.to_string()
            }
        })
        .collect()
}

/// Index of the item addressed by `segment`
///
/// Tries the folder name as given, then without a file extension, then
/// each alternative key (such as an id), then a positional index.
pub fn find_item(names: &[String], alt_keys: &[String], segment: &str) -> Option<usize> {
    let stem = strip_extension(segment);
    for candidate in [segment, stem] {
        if let Some(idx) = names.iter().position(|n| n == candidate) {
            return Some(idx);
        }
        if let Some(idx) = alt_keys
            .iter()
            .position(|k| !k.is_empty() && sanitize_name(k) == candidate)
        {
            return Some(idx);
        }
    }
    stem.parse::<usize>().ok().filter(|idx| *idx < names.len())
}

pub fn entry_names(draft: &Draft) -> Vec<String> {
    folder_names(draft.worldbook.entries.iter().map(|e| e.comment.as_str()))
}

pub fn regex_script_names(draft: &Draft) -> Vec<String> {
    folder_names(draft.regex_scripts.iter().map(|s| s.name.as_str()))
}

pub fn helper_script_names(draft: &Draft) -> Vec<String> {
    folder_names(draft.tavern_helper.scripts.iter().map(|s| s.name.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        folder_names(items.iter().copied())
    }

    #[test]
    fn test_folder_names_fallbacks() {
        assert_eq!(
            names(&["Harbor", "", "Rules", "Rules", "42", "a/b"]),
            vec!["Harbor", "1", "2", "3", "4", "a_b"]
        );
    }

    #[test]
    fn test_find_item() {
        let folders = names(&["Harbor", "", "notes.md"]);
        let ids = vec!["x".to_string(), "y".to_string(), "z".to_string()];

        assert_eq!(find_item(&folders, &ids, "Harbor"), Some(0));
        assert_eq!(find_item(&folders, &ids, "Harbor.md"), Some(0));
        assert_eq!(find_item(&folders, &ids, "notes.md"), Some(2));
        assert_eq!(find_item(&folders, &ids, "1"), Some(1));
        assert_eq!(find_item(&folders, &ids, "y"), Some(1));
        assert_eq!(find_item(&folders, &ids, "3"), None);
        assert_eq!(find_item(&folders, &ids, "Missing"), None);
    }
}
