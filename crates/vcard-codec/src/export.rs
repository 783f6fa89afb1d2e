//! Draft -> chara_card_v3

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::instrument;
use vcard_core::regex_literal::to_regex_literal;
use vcard_core::{
    Card, Draft, DraftError, ExportConfig, FindStyle, RegexFind, RegexScript, Result, Worldbook,
    WorldbookEntry, SPEC_NAME, SPEC_VERSION, VIBE_PLAN_KEY,
};

use crate::schema::*;

/// Export flavour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Keep authoring state such as the embedded plan
    #[default]
    Work,
    /// Strip authoring state
    Publish,
}

impl std::fmt::Display for ExportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Work => write!(f, "work"),
            Self::Publish => write!(f, "publish"),
        }
    }
}

impl std::str::FromStr for ExportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "work" => Ok(Self::Work),
            "publish" => Ok(Self::Publish),
            _ => Err(format!("Invalid export mode: {}", s)),
        }
    }
}

/// Export settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub mode: ExportMode,
}

impl ExportOptions {
    pub fn publish() -> Self {
        Self {
            mode: ExportMode::Publish,
        }
    }

    pub fn from_config(config: &ExportConfig) -> Result<Self> {
        let mode = config.mode.parse().map_err(DraftError::Config)?;
        Ok(Self { mode })
    }
}

/// `/pattern/flags` for slash style; raw patterns go out verbatim
fn export_find(find: &RegexFind) -> String {
    match find.style {
        FindStyle::Raw if find.flags.is_empty() => find.pattern.clone(),
        _ => to_regex_literal(&find.pattern, &find.flags),
    }
}

fn export_regex_script(script: &RegexScript) -> Value {
    json!({
        "id": script.id,
        "scriptName": script.name,
        "findRegex": export_find(&script.find),
        "replaceString": script.replace,
        "trimStrings": script.trim_strings,
        "placement": script.placement,
        "disabled": !script.enabled,
        "markdownOnly": script.markdown_only,
        "promptOnly": script.prompt_only,
        "runOnEdit": script.options.run_on_edit,
        "substituteRegex": script.options.substitute_regex,
        "minDepth": script.options.min_depth,
        "maxDepth": script.options.max_depth,
    })
}

fn export_entry(entry: &WorldbookEntry) -> Value {
    let mut extensions = entry.raw_extensions.clone();
    let (position, role) = entry.position.to_code();
    extensions.insert("position".to_string(), Value::from(position));
    extensions.insert(
        "selectiveLogic".to_string(),
        Value::from(entry.secondary_logic.to_code()),
    );
    if let Some(role) = role {
        extensions.insert("role".to_string(), Value::from(role));
    }
    if let Some(depth) = entry.depth() {
        extensions.insert("depth".to_string(), Value::from(depth));
    }

    json!({
        "id": entry.id,
        "keys": entry.keys,
        "secondary_keys": entry.secondary_keys,
        "comment": entry.comment,
        "content": entry.content,
        "constant": entry.light == vcard_core::Light::Blue,
        "selective": entry.light == vcard_core::Light::Green,
        "insertion_order": entry.order,
        "enabled": entry.enabled,
        "position": entry.position.legacy_text(),
        "use_regex": entry.use_regex,
        "extensions": extensions,
    })
}

fn export_worldbook(worldbook: &Worldbook) -> Value {
    json!({
        "name": worldbook.name,
        "entries": worldbook.entries.iter().map(export_entry).collect::<Vec<_>>(),
    })
}

fn export_extensions(draft: &Draft, mode: ExportMode) -> Map<String, Value> {
    let mut extensions = draft.raw.data_extensions.clone();
    if mode == ExportMode::Publish {
        extensions.shift_remove(VIBE_PLAN_KEY);
    }

    extensions.insert(
        EXT_REGEX_SCRIPTS.to_string(),
        Value::Array(draft.regex_scripts.iter().map(export_regex_script).collect()),
    );

    if !draft.tavern_helper.is_empty() {
        let pack = serde_json::to_value(&draft.tavern_helper).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize tavern helper pack: {}", e);
            Value::Null
        });
        extensions.insert(EXT_TAVERN_HELPER.to_string(), pack);
    }

    let world = default_world(&draft.worldbook.name, &draft.card.name);
    for (key, value) in generated_extension_defaults(&world) {
        extensions.entry(key).or_insert(value);
    }

    extensions
}

/// Map a draft to a `chara_card_v3` document
#[instrument(skip_all, fields(card = %draft.card.name, mode = %options.mode))]
pub fn card_draft_to_chara_card_v3(draft: &Draft, options: &ExportOptions) -> Value {
    let card = &draft.card;

    let mut data = Map::new();
    for field in Card::TEXT_FIELDS {
        let text = card.text_field(field).unwrap_or_default();
        data.insert(field.to_string(), Value::from(text));
    }
    data.insert(
        "alternate_greetings".to_string(),
        Value::from(card.alternate_greetings.clone()),
    );
    data.insert("tags".to_string(), Value::from(card.tags.clone()));

    for (key, value) in &draft.raw.data_extras {
        if key == DATA_CHARACTER_BOOK || key == DATA_EXTENSIONS || data.contains_key(key) {
            continue;
        }
        data.insert(key.clone(), value.clone());
    }
    for (key, value) in generated_data_defaults() {
        data.entry(key).or_insert(value);
    }

    if !draft.worldbook.name.is_empty() || !draft.worldbook.entries.is_empty() {
        data.insert(
            DATA_CHARACTER_BOOK.to_string(),
            export_worldbook(&draft.worldbook),
        );
    }

    let extensions = export_extensions(draft, options.mode);
    let talkativeness = extensions.get("talkativeness").cloned().unwrap_or(Value::Null);
    let fav = extensions.get("fav").cloned().unwrap_or(Value::Bool(false));
    data.insert(DATA_EXTENSIONS.to_string(), Value::Object(extensions));

    json!({
        "spec": SPEC_NAME,
        "spec_version": SPEC_VERSION,
        "name": card.name,
        "description": card.description,
        "personality": card.personality,
        "scenario": card.scenario,
        "first_mes": card.first_mes,
        "mes_example": card.mes_example,
        "creatorcomment": card.creator_notes,
        "tags": card.tags,
        "talkativeness": talkativeness,
        "fav": fav,
        "data": data,
    })
}

/// Pretty-printed card JSON
pub fn export_card_json(draft: &Draft, options: &ExportOptions) -> Result<String> {
    let doc = card_draft_to_chara_card_v3(draft, options);
    Ok(serde_json::to_string_pretty(&doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcard_core::normalize_card_draft;

    fn sample() -> Draft {
        normalize_card_draft(&json!({
            "card": {"name": "Lily", "description": "A baker", "creator_notes": "notes", "tags": ["cozy"]},
            "worldbook": {"entries": [
                {"id": 3, "keys": ["bread"], "content": "Sourdough", "position": "at_depth_assistant",
                 "at_depth": {"depth": 2}, "secondary_logic": "not_any", "raw_extensions": {"probability": 50}},
                {"id": 4, "light": "blue", "content": "Always", "position": "before_example_messages"}
            ]},
            "regex_scripts": [
                {"id": "r1", "name": "paths", "find": {"pattern": "a/b", "flags": "g", "style": "slash"}, "placement": [2]},
                {"id": "r2", "name": "plain", "find": {"pattern": "hello", "style": "raw"}, "placement": [1]}
            ],
            "raw": {"dataExtensions": {"vibePlan": {"tasks": []}, "custom": 1}}
        }))
    }

    #[test]
    fn test_top_level_shape() {
        let doc = card_draft_to_chara_card_v3(&sample(), &ExportOptions::default());
        assert_eq!(doc["spec"], "chara_card_v3");
        assert_eq!(doc["spec_version"], "3.0");
        assert_eq!(doc["name"], "Lily");
        assert_eq!(doc["creatorcomment"], "notes");
        assert_eq!(doc["talkativeness"], "0.5");
        assert_eq!(doc["fav"], false);
        assert_eq!(doc["data"]["creator_notes"], "notes");
        assert_eq!(doc["data"]["creator"], "");
    }

    #[test]
    fn test_entry_codes() {
        let doc = card_draft_to_chara_card_v3(&sample(), &ExportOptions::default());
        let entries = &doc["data"]["character_book"]["entries"];

        let first = &entries[0];
        assert_eq!(first["extensions"]["position"], 4);
        assert_eq!(first["extensions"]["role"], 2);
        assert_eq!(first["extensions"]["depth"], 2);
        assert_eq!(first["extensions"]["selectiveLogic"], 2);
        assert_eq!(first["extensions"]["probability"], 50);
        assert_eq!(first["position"], "after_char");
        assert_eq!(first["selective"], true);

        let second = &entries[1];
        assert_eq!(second["constant"], true);
        assert_eq!(second["extensions"]["position"], 5);
        assert!(second["extensions"].get("role").is_none());
        assert_eq!(second["position"], "before_char");
    }

    #[test]
    fn test_regex_find_export() {
        let doc = card_draft_to_chara_card_v3(&sample(), &ExportOptions::default());
        let scripts = &doc["data"]["extensions"]["regex_scripts"];
        assert_eq!(scripts[0]["findRegex"], "/a\\/b/g");
        assert_eq!(scripts[0]["disabled"], false);
        assert_eq!(scripts[1]["findRegex"], "hello");
        assert_eq!(scripts[1]["minDepth"], Value::Null);
    }

    #[test]
    fn test_extension_defaults() {
        let doc = card_draft_to_chara_card_v3(&sample(), &ExportOptions::default());
        let extensions = &doc["data"]["extensions"];
        assert_eq!(extensions["world"], "Lily");
        assert_eq!(extensions["depth_prompt"]["depth"], 4);
        assert_eq!(extensions["custom"], 1);
        assert!(extensions.get("tavern_helper").is_none());
    }

    #[test]
    fn test_publish_strips_plan() {
        let work = card_draft_to_chara_card_v3(&sample(), &ExportOptions::default());
        assert!(work["data"]["extensions"].get("vibePlan").is_some());

        let publish = card_draft_to_chara_card_v3(&sample(), &ExportOptions::publish());
        assert!(publish["data"]["extensions"].get("vibePlan").is_none());
        assert_eq!(publish["data"]["extensions"]["custom"], 1);
    }

    #[test]
    fn test_empty_worldbook_has_no_character_book() {
        let doc = card_draft_to_chara_card_v3(&Draft::empty(), &ExportOptions::default());
        assert!(doc["data"].get("character_book").is_none());
        assert_eq!(doc["data"]["extensions"]["world"], "");
    }

    #[test]
    fn test_export_mode_from_config() {
        let config = ExportConfig {
            mode: "Publish".to_string(),
        };
        assert_eq!(
            ExportOptions::from_config(&config).unwrap().mode,
            ExportMode::Publish
        );
        let bad = ExportConfig {
            mode: "draft".to_string(),
        };
        assert!(ExportOptions::from_config(&bad).is_err());
    }
}
