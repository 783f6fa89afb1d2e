//! Slash path parsing

use vcard_core::{DraftError, Result};

/// Leading segments that always mean "the draft root"
pub const ROOT_ALIASES: [&str; 3] = ["card", "root", "~"];

/// Extensions that may be omitted when addressing a file
pub const FILE_EXTENSIONS: [&str; 3] = [".md", ".txt", ".json"];

/// Split a path into segments relative to the draft root
///
/// Both `/` and `\` separate segments. Empty and `.` segments are dropped,
/// as is one leading root name or alias.
pub fn parse_file_path(path: &str, root_name: &str) -> Result<Vec<String>> {
    let mut segments: Vec<String> = path
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != ".")
        .map(String::from)
        .collect();

    if let Some(first) = segments.first() {
        let is_root = ROOT_ALIASES.contains(&first.as_str())
            || (!root_name.is_empty() && sanitize_name(root_name) == *first);
        if is_root {
            segments.remove(0);
        }
    }

    if segments.is_empty() {
        return Err(DraftError::InvalidPath(format!(
            "'{}' does not name anything below the root",
            path
        )));
    }
    Ok(segments)
}

/// Segment with a known file extension removed
pub fn strip_extension(segment: &str) -> &str {
    FILE_EXTENSIONS
        .iter()
        .find_map(|ext| segment.strip_suffix(ext))
        .filter(|stem| !stem.is_empty())
        .unwrap_or(segment)
}

/// Make a name usable as a single path segment
pub fn sanitize_name(name: &str) -> String {
    name.trim().replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators_and_empty_segments() {
        assert_eq!(
            parse_file_path("worldbook//Harbor\\content", "Lily").unwrap(),
            vec!["worldbook", "Harbor", "content"]
        );
    }

    #[test]
    fn test_root_is_stripped() {
        for path in ["Lily/name.md", "card/name.md", "~/name.md", "/root/name.md", "./name.md"] {
            assert_eq!(parse_file_path(path, "Lily").unwrap(), vec!["name.md"], "{}", path);
        }
        // Only one leading root
        assert_eq!(
            parse_file_path("card/card", "Lily").unwrap(),
            vec!["card"]
        );
    }

    #[test]
    fn test_empty_path_is_rejected() {
        for path in ["", "/", "card", "Lily/", " \\ "] {
            assert!(matches!(
                parse_file_path(path, "Lily"),
                Err(DraftError::InvalidPath(_))
            ));
        }
    }

    #[test]
    fn test_root_name_with_slash() {
        assert_eq!(
            parse_file_path("A_B/tags.json", "A/B").unwrap(),
            vec!["tags.json"]
        );
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("name.md"), "name");
        assert_eq!(strip_extension("tags.json"), "tags");
        assert_eq!(strip_extension("notes.txt"), "notes");
        assert_eq!(strip_extension("archive.tar"), "archive.tar");
        assert_eq!(strip_extension(".md"), ".md");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name(" a/b\\c "), "a_b_c");
    }
}
