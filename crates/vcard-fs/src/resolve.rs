//! Path resolution against the virtual file system

use serde_json::{Map, Value};
use tracing::debug;
use vcard_core::{Card, Draft, DraftError, Result};

use crate::dotted::{is_dotted_path, resolve_dotted_path};
use crate::layout::{
    entry_names, find_item, helper_script_names, regex_script_names,
    ALTERNATE_GREETINGS_DIR, REGEX_SCRIPTS_DIR, SCRIPTS_DIR, TAVERN_HELPER_DIR, VARIABLES_DIR,
    WORLDBOOK_DIR,
};
use crate::path::{parse_file_path, strip_extension};

const ENTRY_KEYS: [&str; 13] = [
    "content",
    "keys",
    "secondary_keys",
    "comment",
    "enabled",
    "light",
    "secondary_logic",
    "position",
    "depth",
    "order",
    "use_regex",
    "id",
    "raw_extensions",
];

const REGEX_KEYS: [&str; 13] = [
    "id",
    "name",
    "enabled",
    "placement",
    "find",
    "pattern",
    "flags",
    "style",
    "replace",
    "trimStrings",
    "markdownOnly",
    "promptOnly",
    "options",
];

const HELPER_SCRIPT_KEYS: [&str; 8] = [
    "id", "name", "type", "enabled", "content", "info", "button", "data",
];

/// What a path points at
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// A text leaf, sliced by character when read
    Text(String),
    /// A structured leaf, inlined whole when small enough
    Json(Value),
    /// A folder listing; sub-folders end in `/`
    Dir(Vec<String>),
}

impl Resolved {
    fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => Resolved::Text(text),
            other => Resolved::Json(other),
        }
    }
}

/// Resolve a slash path or a dotted path
pub fn resolve_path(draft: &Draft, path: &str) -> Result<Resolved> {
    if is_dotted_path(path) {
        resolve_dotted_path(draft, path).map(Resolved::from_value)
    } else {
        resolve_file_content(draft, path)
    }
}

/// Resolve a slash path, dispatching on its first segment
pub fn resolve_file_content(draft: &Draft, path: &str) -> Result<Resolved> {
    let segments = parse_file_path(path, draft.root_name())?;
    let first = segments[0].as_str();
    let rest = &segments[1..];
    debug!("Resolving {} ({} segments)", path, segments.len());

    match first {
        ALTERNATE_GREETINGS_DIR => resolve_greetings(draft, rest, path),
        WORLDBOOK_DIR => resolve_worldbook(draft, rest, path),
        REGEX_SCRIPTS_DIR => resolve_regex_scripts(draft, rest, path),
        TAVERN_HELPER_DIR => resolve_tavern_helper(draft, rest, path),
        _ if rest.is_empty() => resolve_root_file(&draft.card, first, path),
        _ => Err(DraftError::PathNotFound(path.to_string())),
    }
}

fn resolve_root_file(card: &Card, segment: &str, path: &str) -> Result<Resolved> {
    let stem = strip_extension(segment);
    if stem == "tags" {
        return Ok(Resolved::Json(Value::from(card.tags.clone())));
    }
    card.text_field(stem)
        .map(|text| Resolved::Text(text.to_string()))
        .ok_or_else(|| DraftError::PathNotFound(path.to_string()))
}

fn resolve_greetings(draft: &Draft, rest: &[String], path: &str) -> Result<Resolved> {
    let greetings = &draft.card.alternate_greetings;
    match rest {
        [] => Ok(Resolved::Dir(
            (0..greetings.len()).map(|i| format!("{}.md", i)).collect(),
        )),
        [item] => {
            let index = strip_extension(item)
                .parse::<usize>()
                .map_err(|_| DraftError::PathNotFound(path.to_string()))?;
            greetings
                .get(index)
                .map(|text| Resolved::Text(text.clone()))
                .ok_or_else(|| DraftError::IndexOutOfRange {
                    path: ALTERNATE_GREETINGS_DIR.to_string(),
                    index,
                    len: greetings.len(),
                })
        }
        _ => Err(DraftError::PathNotFound(path.to_string())),
    }
}

/// Pick a sub-key out of an item's JSON form
fn sub_key(item: Value, key: &str, known: &[&str], dir: &str) -> Result<Resolved> {
    if !known.contains(&key) {
        return Err(DraftError::UnknownSubKey {
            path: dir.to_string(),
            key: key.to_string(),
            known: known.join(", "),
        });
    }
    let value = item.get(key).cloned().unwrap_or(Value::Null);
    Ok(Resolved::from_value(value))
}

fn resolve_worldbook(draft: &Draft, rest: &[String], path: &str) -> Result<Resolved> {
    let names = entry_names(draft);

    let Some((item, rest)) = rest.split_first() else {
        return Ok(Resolved::Dir(names));
    };
    let index = find_item(&names, &[], item)
        .ok_or_else(|| DraftError::PathNotFound(path.to_string()))?;
    let entry = &draft.worldbook.entries[index];
    let dir = format!("{}/{}", WORLDBOOK_DIR, names[index]);

    match rest {
        [] => Ok(Resolved::Json(to_json(entry)?)),
        [key] => {
            let key = strip_extension(key);
            if key == "depth" {
                return Ok(Resolved::Json(entry.depth().map(Value::from).unwrap_or(Value::Null)));
            }
            sub_key(to_json(entry)?, key, &ENTRY_KEYS, &dir)
        }
        _ => Err(DraftError::PathNotFound(path.to_string())),
    }
}

fn resolve_regex_scripts(draft: &Draft, rest: &[String], path: &str) -> Result<Resolved> {
    let names = regex_script_names(draft);
    let ids: Vec<String> = draft.regex_scripts.iter().map(|s| s.id.clone()).collect();

    let Some((item, rest)) = rest.split_first() else {
        return Ok(Resolved::Dir(names));
    };
    let index = find_item(&names, &ids, item)
        .ok_or_else(|| DraftError::PathNotFound(path.to_string()))?;
    let script = &draft.regex_scripts[index];
    let dir = format!("{}/{}", REGEX_SCRIPTS_DIR, names[index]);

    match rest {
        [] => Ok(Resolved::Json(to_json(script)?)),
        [key] => {
            let key = strip_extension(key);
            match key {
                "pattern" => Ok(Resolved::Text(script.find.pattern.clone())),
                "flags" => Ok(Resolved::Text(script.find.flags.clone())),
                "style" => Ok(Resolved::Text(script.find.style.to_string())),
                _ => sub_key(to_json(script)?, key, &REGEX_KEYS, &dir),
            }
        }
        _ => Err(DraftError::PathNotFound(path.to_string())),
    }
}

fn resolve_tavern_helper(draft: &Draft, rest: &[String], path: &str) -> Result<Resolved> {
    let pack = &draft.tavern_helper;
    match rest {
        [] => Ok(Resolved::Dir(vec![
            format!("{}/", SCRIPTS_DIR),
            format!("{}/", VARIABLES_DIR),
        ])),
        [dir, tail @ ..] if dir == SCRIPTS_DIR => {
            let names = helper_script_names(draft);
            let ids: Vec<String> = pack.scripts.iter().map(|s| s.id.clone()).collect();
            let Some((item, tail)) = tail.split_first() else {
                return Ok(Resolved::Dir(names));
            };
            let index = find_item(&names, &ids, item)
                .ok_or_else(|| DraftError::PathNotFound(path.to_string()))?;
            let script = &pack.scripts[index];
            match tail {
                [] => Ok(Resolved::Json(to_json(script)?)),
                [key] => sub_key(
                    to_json(script)?,
                    strip_extension(key),
                    &HELPER_SCRIPT_KEYS,
                    &format!("{}/{}/{}", TAVERN_HELPER_DIR, SCRIPTS_DIR, names[index]),
                ),
                _ => Err(DraftError::PathNotFound(path.to_string())),
            }
        }
        [dir, tail @ ..] if dir == VARIABLES_DIR => match tail {
            [] => Ok(Resolved::Dir(pack.variables.keys().cloned().collect())),
            [name] => variable(&pack.variables, name)
                .map(|value| Resolved::from_value(value.clone()))
                .ok_or_else(|| DraftError::PathNotFound(path.to_string())),
            _ => Err(DraftError::PathNotFound(path.to_string())),
        },
        _ => Err(DraftError::PathNotFound(path.to_string())),
    }
}

fn variable<'a>(variables: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    variables
        .get(name)
        .or_else(|| variables.get(strip_extension(name)))
}

fn to_json<T: serde::Serialize>(item: &T) -> Result<Value> {
    Ok(serde_json::to_value(item)?)
}
