//! Total normalizers from arbitrary JSON to the canonical Draft shape
//!
//! Every function here accepts any `serde_json::Value` and never fails:
//! missing or malformed fields fall back to named defaults, and unknown
//! passthrough data is kept verbatim.

use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use crate::coerce::{self, get_any};
use crate::enums::{FindStyle, Light, Position, SecondaryLogic};
use crate::regex_literal::{parse_regex_literal, unescape_slashes};
use crate::types::*;

/// Extension keys owned by the entry model rather than the passthrough bag
const ENTRY_RESERVED_EXTENSIONS: [&str; 2] = ["position", "selectiveLogic"];
/// Extension keys owned by the entry model when the entry is at-depth
const ENTRY_DEPTH_EXTENSIONS: [&str; 2] = ["depth", "role"];

/// Normalize arbitrary JSON into a canonical [`Draft`]
pub fn normalize_card_draft(raw: &Value) -> Draft {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    Draft {
        meta: normalize_meta(obj.get("meta")),
        card: normalize_card(obj.get("card")),
        worldbook: normalize_worldbook(obj.get("worldbook")),
        regex_scripts: normalize_regex_scripts(obj.get("regex_scripts")),
        tavern_helper: normalize_tavern_helper_pack_lite(
            obj.get("tavern_helper").unwrap_or(&Value::Null),
        ),
        validation: normalize_validation(obj.get("validation")),
        raw: normalize_raw(obj.get("raw")),
    }
}

fn normalize_meta(value: Option<&Value>) -> DraftMeta {
    let meta = coerce::object(value);
    let spec = coerce::string(meta.get("spec"));
    let spec_version = coerce::string(meta.get("spec_version"));

    DraftMeta {
        spec: if spec.is_empty() {
            SPEC_NAME.to_string()
        } else {
            spec
        },
        spec_version: if spec_version.is_empty() {
            SPEC_VERSION.to_string()
        } else {
            spec_version
        },
        updated_at: coerce::string(get_any(&meta, &["updatedAt", "updated_at"])),
        progress: meta.get("progress").filter(|v| v.is_object()).cloned(),
    }
}

fn normalize_card(value: Option<&Value>) -> Card {
    let card = coerce::object(value);

    Card {
        name: coerce::string(card.get("name")),
        description: coerce::string(card.get("description")),
        personality: coerce::string(card.get("personality")),
        scenario: coerce::string(card.get("scenario")),
        first_mes: coerce::string(card.get("first_mes")),
        mes_example: coerce::string(card.get("mes_example")),
        creator_notes: coerce::string(card.get("creator_notes")),
        system_prompt: coerce::string(card.get("system_prompt")),
        post_history_instructions: coerce::string(card.get("post_history_instructions")),
        alternate_greetings: coerce::string_list(card.get("alternate_greetings")),
        tags: coerce::string_list(card.get("tags")),
    }
}

fn normalize_worldbook(value: Option<&Value>) -> Worldbook {
    let worldbook = coerce::object(value);
    let raw_entries = match worldbook.get("entries") {
        Some(Value::Array(items)) => items.clone(),
        // Lorebook exports key entries by uid
        Some(Value::Object(map)) => map.values().cloned().collect(),
        _ => Vec::new(),
    };

    let repair = ensure_worldbook_entry_ids(&raw_entries);
    if repair.changed {
        debug!("Repaired worldbook entry ids ({} entries)", repair.entries.len());
    }

    Worldbook {
        name: coerce::string(worldbook.get("name")),
        entries: repair
            .entries
            .iter()
            .map(normalize_worldbook_entry_lite)
            .collect(),
    }
}

fn normalize_regex_scripts(value: Option<&Value>) -> Vec<RegexScript> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| normalize_regex_script_lite(item, idx))
            .collect(),
        _ => Vec::new(),
    }
}

fn normalize_validation(value: Option<&Value>) -> Validation {
    let validation = coerce::object(value);
    Validation {
        errors: coerce::string_list(validation.get("errors")),
        warnings: coerce::string_list(validation.get("warnings")),
    }
}

fn normalize_raw(value: Option<&Value>) -> RawBag {
    let raw = coerce::object(value);
    RawBag {
        data_extensions: coerce::object(get_any(&raw, &["dataExtensions", "data_extensions"])),
        data_extras: coerce::object(get_any(&raw, &["dataExtras", "data_extras"])),
    }
}

/// Parse an entry id as a non-negative integer
fn parse_entry_id(value: Option<&Value>) -> Option<u64> {
    match value {
        Some(Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Outcome of [`ensure_worldbook_entry_ids`]
#[derive(Debug, Clone, PartialEq)]
pub struct EntryIdRepair {
    /// True if any entry's `id` was rewritten
    pub changed: bool,
    /// Entries with a unique non-negative integer `id` each
    pub entries: Vec<Value>,
}

/// Give every entry a unique non-negative integer id
///
/// An entry keeps its id when it parses as a non-negative integer not already
/// claimed by an earlier entry. The rest receive `max(kept) + 1`, skipping
/// past collisions, in list order. Non-object entries become objects.
pub fn ensure_worldbook_entry_ids(entries: &[Value]) -> EntryIdRepair {
    let parsed: Vec<Option<u64>> = entries.iter().map(|e| parse_entry_id(e.get("id"))).collect();

    let mut taken = HashSet::new();
    let keep: Vec<bool> = parsed
        .iter()
        .map(|id| id.map(|id| taken.insert(id)).unwrap_or(false))
        .collect();

    let mut next_id = taken.iter().max().map(|max| max + 1).unwrap_or(0);
    let mut changed = false;
    let mut repaired = Vec::with_capacity(entries.len());

    for (idx, entry) in entries.iter().enumerate() {
        let mut obj = entry.as_object().cloned().unwrap_or_default();

        let id = match (keep[idx], parsed[idx]) {
            (true, Some(id)) => id,
            _ => {
                while taken.contains(&next_id) {
                    next_id += 1;
                }
                let id = next_id;
                taken.insert(id);
                next_id += 1;
                id
            }
        };

        let new_value = Value::from(id);
        if obj.get("id") != Some(&new_value) {
            changed = true;
        }
        obj.insert("id".to_string(), new_value);
        repaired.push(Value::Object(obj));
    }

    EntryIdRepair {
        changed,
        entries: repaired,
    }
}

/// Normalize one worldbook entry (canonical shape)
pub fn normalize_worldbook_entry_lite(value: &Value) -> WorldbookEntry {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);

    let light = match obj.get("light").and_then(Value::as_str) {
        Some(text) => text.parse::<Light>().unwrap_or_default(),
        None if coerce::boolean(obj.get("constant"), false) => Light::Blue,
        None => Light::Green,
    };

    let position = match obj.get("position") {
        Some(Value::String(s)) => Position::from_str_lossy(s),
        Some(other) => match coerce::int(Some(other)) {
            Some(code) => Position::from_code(code, coerce::int(obj.get("role"))),
            None => Position::default(),
        },
        None => Position::default(),
    };

    let secondary_logic = match get_any(obj, &["secondary_logic", "selectiveLogic"]) {
        Some(Value::String(s)) => SecondaryLogic::from_str_lossy(s),
        Some(other) => coerce::int(Some(other))
            .map(SecondaryLogic::from_code)
            .unwrap_or_default(),
        None => SecondaryLogic::default(),
    };

    let at_depth = position.is_at_depth().then(|| {
        let depth = obj
            .get("at_depth")
            .and_then(|d| match d {
                Value::Object(map) => coerce::int(map.get("depth")),
                other => coerce::int(Some(other)),
            })
            .or_else(|| coerce::int(obj.get("depth")));
        AtDepth { depth }
    });

    let mut raw_extensions = coerce::object(get_any(obj, &["raw_extensions", "extensions"]));
    for key in ENTRY_RESERVED_EXTENSIONS {
        raw_extensions.shift_remove(key);
    }
    if position.is_at_depth() {
        for key in ENTRY_DEPTH_EXTENSIONS {
            raw_extensions.shift_remove(key);
        }
    }

    WorldbookEntry {
        id: parse_entry_id(obj.get("id")).unwrap_or(0),
        enabled: coerce::boolean(obj.get("enabled"), true),
        light,
        keys: coerce::string_list(get_any(obj, &["keys", "key"])),
        secondary_keys: coerce::string_list(get_any(obj, &["secondary_keys", "keysecondary"])),
        secondary_logic,
        comment: coerce::string(obj.get("comment")),
        content: coerce::string(obj.get("content")),
        position,
        at_depth,
        order: coerce::int_or(
            get_any(obj, &["order", "insertion_order"]),
            WorldbookEntry::DEFAULT_ORDER,
        ),
        use_regex: coerce::boolean(obj.get("use_regex"), false),
        raw_extensions,
    }
}

/// Normalize a `find` clause given as an object or as a literal string
fn normalize_find(value: Option<&Value>) -> RegexFind {
    let (pattern, flags, style) = match value {
        Some(Value::String(text)) => match parse_regex_literal(text) {
            Some((pattern, flags)) => (pattern, flags, FindStyle::Slash),
            None => (text.clone(), String::new(), FindStyle::Raw),
        },
        Some(Value::Object(obj)) => {
            let style = obj
                .get("style")
                .and_then(Value::as_str)
                .map(|s| s.parse::<FindStyle>().unwrap_or_default())
                .unwrap_or_default();
            (
                coerce::string(obj.get("pattern")),
                coerce::string(obj.get("flags")),
                style,
            )
        }
        _ => (String::new(), String::new(), FindStyle::Raw),
    };

    match style {
        FindStyle::Slash => RegexFind {
            pattern: unescape_slashes(&pattern),
            flags,
            style,
        },
        // A raw pattern that is itself a literal is really slash style
        FindStyle::Raw => match parse_regex_literal(&pattern) {
            Some((inner, literal_flags)) if flags.is_empty() => RegexFind {
                pattern: inner,
                flags: literal_flags,
                style: FindStyle::Slash,
            },
            _ => RegexFind {
                pattern,
                flags,
                style,
            },
        },
    }
}

/// Deterministic id for an entity that arrived without one
fn derived_id(kind: &str, index: usize, name: &str, detail: &str) -> String {
    let seed = format!("vcard:{}:{}:{}:{}", kind, index, name, detail);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes()).to_string()
}

/// Normalize one regex script (canonical shape, with common aliases)
pub fn normalize_regex_script_lite(value: &Value, index: usize) -> RegexScript {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);

    let name = coerce::string(get_any(obj, &["name", "scriptName"]));
    let find = normalize_find(get_any(obj, &["find", "findRegex"]));

    let enabled = match obj.get("enabled") {
        Some(v) => coerce::boolean(Some(v), true),
        None => !coerce::boolean(obj.get("disabled"), false),
    };

    // Options may be nested or flat
    let options_obj = coerce::object(obj.get("options"));
    let option = |keys: &[&str]| -> Option<Value> {
        get_any(&options_obj, keys)
            .or_else(|| get_any(obj, keys))
            .cloned()
    };

    let options = RegexOptions {
        run_on_edit: coerce::boolean(option(&["runOnEdit", "run_on_edit"]).as_ref(), false),
        substitute_regex: coerce::int_or(
            option(&["substituteRegex", "substitute_regex"]).as_ref(),
            0,
        ),
        min_depth: coerce::int(option(&["minDepth", "min_depth"]).as_ref()),
        max_depth: coerce::int(option(&["maxDepth", "max_depth"]).as_ref()),
    };

    let mut id = coerce::string(obj.get("id"));
    if id.trim().is_empty() {
        id = derived_id("regex", index, &name, &find.pattern);
        debug!("Assigned id {} to regex script '{}'", id, name);
    }

    RegexScript {
        id,
        name,
        enabled,
        placement: coerce::int_list(obj.get("placement")),
        find,
        replace: coerce::string(get_any(obj, &["replace", "replaceString"])),
        trim_strings: coerce::string_list(get_any(obj, &["trimStrings", "trim_strings"])),
        markdown_only: coerce::boolean(get_any(obj, &["markdownOnly", "markdown_only"]), false),
        prompt_only: coerce::boolean(get_any(obj, &["promptOnly", "prompt_only"]), false),
        options,
    }
}

fn normalize_script_button(value: Option<&Value>) -> ScriptButton {
    let button = coerce::object(value);
    let buttons = match button.get("buttons") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(obj) => Some(ScriptButtonItem {
                    name: coerce::string(obj.get("name")),
                    visible: coerce::boolean(obj.get("visible"), true),
                }),
                Value::String(name) => Some(ScriptButtonItem {
                    name: name.clone(),
                    visible: true,
                }),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    ScriptButton {
        enabled: coerce::boolean(button.get("enabled"), true),
        buttons,
    }
}

fn normalize_tavern_script(value: &Value, index: usize) -> TavernScript {
    let empty = Map::new();
    let outer = value.as_object().unwrap_or(&empty);
    // Older exports wrap the script body in `value`
    let obj = match outer.get("value") {
        Some(Value::Object(inner)) => inner,
        _ => outer,
    };

    let name = coerce::string(obj.get("name"));
    let content = coerce::string(obj.get("content"));
    let kind = coerce::string(get_any(outer, &["type"]));

    let mut id = coerce::string(obj.get("id"));
    if id.trim().is_empty() {
        id = derived_id("script", index, &name, &content);
    }

    TavernScript {
        kind: if kind.is_empty() {
            "script".to_string()
        } else {
            kind
        },
        id,
        name,
        enabled: coerce::boolean(obj.get("enabled"), true),
        content,
        info: coerce::string(obj.get("info")),
        button: normalize_script_button(obj.get("button")),
        data: coerce::object(obj.get("data")),
    }
}

/// Normalize a tavern-helper pack
///
/// Accepts `{scripts, variables}` or the key/value pair list form
/// `[["scripts", [...]], ["variables", {...}]]`.
pub fn normalize_tavern_helper_pack_lite(value: &Value) -> TavernHelperPack {
    let obj: Map<String, Value> = match value {
        Value::Object(map) => map.clone(),
        Value::Array(pairs) => pairs
            .iter()
            .filter_map(|pair| match pair.as_array().map(Vec::as_slice) {
                Some([Value::String(key), v]) => Some((key.clone(), v.clone())),
                _ => None,
            })
            .collect(),
        _ => Map::new(),
    };

    let scripts = match obj.get("scripts") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| normalize_tavern_script(item, idx))
            .collect(),
        _ => Vec::new(),
    };

    TavernHelperPack {
        scripts,
        variables: coerce::object(obj.get("variables")),
    }
}
