//! chara_card (v1/v2/v3) -> Draft

use serde_json::{json, Map, Value};
use tracing::{debug, instrument};
use vcard_core::coerce::{self, get_any};
use vcard_core::{
    normalize_card_draft, Draft, Light, Position, Result, SecondaryLogic, SPEC_NAME, SPEC_VERSION,
};

use crate::schema::*;

/// Worldbook entry in external shape -> canonical entry JSON
fn import_entry(value: &Value) -> Value {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);
    let extensions = coerce::object(obj.get("extensions"));

    let role = coerce::int(extensions.get("role"));
    let position = match coerce::int(extensions.get("position")) {
        Some(code) => Position::from_code(code, role),
        None => match obj.get("position") {
            Some(Value::String(text)) => Position::from_str_lossy(text),
            Some(other) => coerce::int(Some(other))
                .map(|code| Position::from_code(code, role))
                .unwrap_or_default(),
            None => Position::default(),
        },
    };

    let secondary_logic =
        coerce::int(extensions.get("selectiveLogic").or(obj.get("selectiveLogic")))
            .map(SecondaryLogic::from_code)
            .unwrap_or_default();

    let light = if coerce::boolean(obj.get("constant"), false) {
        Light::Blue
    } else {
        Light::Green
    };

    let enabled = match obj.get("enabled") {
        Some(v) => coerce::boolean(Some(v), true),
        None => !coerce::boolean(obj.get("disable"), false),
    };

    let at_depth = if position.is_at_depth() {
        json!({"depth": coerce::int(extensions.get("depth"))})
    } else {
        Value::Null
    };

    json!({
        "id": get_any(obj, &["id", "uid"]),
        "enabled": enabled,
        "light": light.as_str(),
        "keys": get_any(obj, &["keys", "key"]),
        "secondary_keys": get_any(obj, &["secondary_keys", "keysecondary"]),
        "secondary_logic": secondary_logic.as_str(),
        "comment": obj.get("comment"),
        "content": obj.get("content"),
        "position": position.as_str(),
        "at_depth": at_depth,
        "order": get_any(obj, &["insertion_order", "order"]),
        "use_regex": obj.get("use_regex"),
        "raw_extensions": extensions,
    })
}

fn import_entries(book: &Map<String, Value>) -> Vec<Value> {
    match book.get("entries") {
        Some(Value::Array(items)) => items.iter().map(import_entry).collect(),
        Some(Value::Object(map)) => map.values().map(import_entry).collect(),
        _ => Vec::new(),
    }
}

fn import_card(source: &Map<String, Value>) -> Map<String, Value> {
    let mut card = Map::new();
    for key in DATA_CARD_KEYS {
        let value = match key {
            "creator_notes" => get_any(source, &["creator_notes", "creatorcomment"]),
            _ => source.get(key),
        };
        if let Some(value) = value {
            card.insert(key.to_string(), value.clone());
        }
    }
    card
}

/// Map a character card document (v3, v2 or flat v1) to a Draft
#[instrument(skip_all)]
pub fn chara_card_to_card_draft(doc: &Value) -> Draft {
    let empty = Map::new();
    let root = doc.as_object().unwrap_or(&empty);

    // v1 cards have no `data` wrapper
    let (data, flat) = match root.get("data") {
        Some(Value::Object(data)) => (data, false),
        _ => (root, true),
    };
    debug!(
        "Importing {} card",
        root.get("spec").and_then(serde_json::Value::as_str).unwrap_or(if flat { "v1" } else { "unknown" })
    );

    let card = import_card(data);
    let book = coerce::object(data.get(DATA_CHARACTER_BOOK));
    let worldbook_name = coerce::string(book.get("name"));
    let card_name = coerce::string(card.get("name"));

    let extensions = coerce::object(data.get(DATA_EXTENSIONS));
    let extension_defaults =
        generated_extension_defaults(&default_world(&worldbook_name, &card_name));

    let mut bag = Map::new();
    let mut regex_scripts = Value::Array(Vec::new());
    let mut tavern_helper = None;
    let mut legacy_scripts = None;
    let mut legacy_variables = None;

    for (key, value) in &extensions {
        match key.as_str() {
            EXT_REGEX_SCRIPTS => regex_scripts = value.clone(),
            EXT_TAVERN_HELPER => tavern_helper = Some(value.clone()),
            EXT_LEGACY_SCRIPTS => legacy_scripts = Some(value.clone()),
            EXT_LEGACY_VARIABLES => legacy_variables = Some(value.clone()),
            _ if is_generated_default(&extension_defaults, key, value) => {
                debug!("Dropping generated extension default {}", key);
            }
            _ => {
                bag.insert(key.clone(), value.clone());
            }
        }
    }

    let tavern_helper = tavern_helper.unwrap_or_else(|| {
        json!({
            "scripts": legacy_scripts.unwrap_or_else(|| Value::Array(Vec::new())),
            "variables": legacy_variables.unwrap_or_else(|| Value::Object(Map::new())),
        })
    });

    let mut extras = Map::new();
    if !flat {
        let data_defaults = generated_data_defaults();
        for (key, value) in data {
            let known = DATA_CARD_KEYS.contains(&key.as_str())
                || key == DATA_CHARACTER_BOOK
                || key == DATA_EXTENSIONS
                || is_generated_default(&data_defaults, key, value);
            if !known {
                extras.insert(key.clone(), value.clone());
            }
        }
    }

    normalize_card_draft(&json!({
        "meta": {"spec": SPEC_NAME, "spec_version": SPEC_VERSION},
        "card": card,
        "worldbook": {"name": worldbook_name, "entries": import_entries(&book)},
        "regex_scripts": regex_scripts,
        "tavern_helper": tavern_helper,
        "raw": {"dataExtensions": bag, "dataExtras": extras},
    }))
}

/// Parse card JSON text and import it
pub fn import_card_json(text: &str) -> Result<Draft> {
    let doc: Value = serde_json::from_str(text)?;
    Ok(chara_card_to_card_draft(&doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcard_core::FindStyle;

    #[test]
    fn test_import_v2_card() {
        let draft = chara_card_to_card_draft(&json!({
            "spec": "chara_card_v2",
            "spec_version": "2.0",
            "data": {
                "name": "Mira",
                "description": "A sailor",
                "first_mes": "Ahoy",
                "creator": "someone",
                "character_version": "",
                "character_book": {"name": "Sea", "entries": [
                    {"id": 0, "keys": ["ship"], "content": "The Gull", "insertion_order": 10,
                     "constant": false, "position": "before_char", "extensions": {"exclude_recursion": true}}
                ]},
                "extensions": {"world": "Sea", "fav": false, "talkativeness": "0.5", "custom": {"a": 1}}
            }
        }));

        assert_eq!(draft.meta.spec, "chara_card_v3");
        assert_eq!(draft.card.name, "Mira");
        assert_eq!(draft.worldbook.name, "Sea");
        let entry = &draft.worldbook.entries[0];
        assert_eq!(entry.position, Position::BeforeChar);
        assert_eq!(entry.order, 10);
        assert_eq!(entry.light, Light::Green);
        assert_eq!(entry.raw_extensions["exclude_recursion"], true);

        assert_eq!(draft.raw.data_extras["creator"], "someone");
        assert!(draft.raw.data_extras.get("character_version").is_none());
        let bag_keys: Vec<&String> = draft.raw.data_extensions.keys().collect();
        assert_eq!(bag_keys, vec!["custom"]);
    }

    #[test]
    fn test_import_v1_flat_card() {
        let draft = chara_card_to_card_draft(&json!({
            "name": "Old",
            "description": "legacy",
            "creatorcomment": "hi",
            "avatar": "none"
        }));
        assert_eq!(draft.card.name, "Old");
        assert_eq!(draft.card.creator_notes, "hi");
        assert!(draft.raw.data_extras.is_empty());
    }

    #[test]
    fn test_unknown_position_code_falls_back() {
        let draft = chara_card_to_card_draft(&json!({"data": {"character_book": {"entries": [
            {"id": 1, "extensions": {"position": 99}},
            {"id": 2, "extensions": {"position": 4}}
        ]}}}));
        assert_eq!(draft.worldbook.entries[0].position, Position::AfterChar);
        assert_eq!(draft.worldbook.entries[1].position, Position::AtDepthSystem);
        assert_eq!(draft.worldbook.entries[1].depth(), None);
    }

    #[test]
    fn test_selective_logic_prefers_extensions() {
        let draft = chara_card_to_card_draft(&json!({"data": {"character_book": {"entries": [
            {"id": 1, "selectiveLogic": 1, "extensions": {"selectiveLogic": 3}},
            {"id": 2, "selectiveLogic": 2},
            {"id": 3}
        ]}}}));
        let logic: Vec<SecondaryLogic> = draft
            .worldbook
            .entries
            .iter()
            .map(|e| e.secondary_logic)
            .collect();
        assert_eq!(
            logic,
            vec![SecondaryLogic::AndAll, SecondaryLogic::NotAny, SecondaryLogic::AndAny]
        );
    }

    #[test]
    fn test_import_regex_and_legacy_helper() {
        let draft = chara_card_to_card_draft(&json!({"data": {"extensions": {
            "regex_scripts": [{"id": "x", "scriptName": "s", "findRegex": "/a\\/b/i", "disabled": true, "placement": [2]}],
            "TavernHelper_scripts": [{"type": "script", "value": {"id": "h", "name": "hud", "content": "code"}}],
            "TavernHelper_variables": {"hp": 10}
        }}}));
        let script = &draft.regex_scripts[0];
        assert_eq!(script.name, "s");
        assert_eq!(script.find.pattern, "a/b");
        assert_eq!(script.find.style, FindStyle::Slash);
        assert!(!script.enabled);

        assert_eq!(draft.tavern_helper.scripts[0].name, "hud");
        assert_eq!(draft.tavern_helper.variables["hp"], 10);
        assert!(draft.raw.data_extensions.is_empty());
    }

    #[test]
    fn test_import_json_text_errors() {
        assert!(import_card_json("{not json").is_err());
        assert_eq!(import_card_json("{}").unwrap(), Draft::empty());
    }
}
