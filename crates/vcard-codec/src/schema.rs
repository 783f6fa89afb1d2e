//! External key names and generated defaults

use serde_json::{json, Value};

pub const EXT_REGEX_SCRIPTS: &str = "regex_scripts";
pub const EXT_TAVERN_HELPER: &str = "tavern_helper";
pub const EXT_LEGACY_SCRIPTS: &str = "TavernHelper_scripts";
pub const EXT_LEGACY_VARIABLES: &str = "TavernHelper_variables";

pub const DATA_CHARACTER_BOOK: &str = "character_book";
pub const DATA_EXTENSIONS: &str = "extensions";

/// `data` keys that map onto card fields
pub const DATA_CARD_KEYS: [&str; 11] = [
    "name",
    "description",
    "personality",
    "scenario",
    "first_mes",
    "mes_example",
    "creator_notes",
    "system_prompt",
    "post_history_instructions",
    "alternate_greetings",
    "tags",
];

pub const DEFAULT_TALKATIVENESS: &str = "0.5";
pub const DEFAULT_DEPTH_PROMPT_DEPTH: i64 = 4;

pub fn default_depth_prompt() -> Value {
    json!({"prompt": "", "depth": DEFAULT_DEPTH_PROMPT_DEPTH, "role": "system"})
}

/// Worldbook name, falling back to the card name
pub fn default_world(worldbook_name: &str, card_name: &str) -> String {
    if worldbook_name.is_empty() {
        card_name.to_string()
    } else {
        worldbook_name.to_string()
    }
}

/// Extension values written on export when the draft carries none
pub fn generated_extension_defaults(world: &str) -> Vec<(&'static str, Value)> {
    vec![
        ("world", Value::String(world.to_string())),
        ("fav", Value::Bool(false)),
        ("talkativeness", Value::String(DEFAULT_TALKATIVENESS.to_string())),
        ("depth_prompt", default_depth_prompt()),
    ]
}

/// `data` values written on export when the draft carries none
pub fn generated_data_defaults() -> Vec<(&'static str, Value)> {
    vec![
        ("creator", Value::String(String::new())),
        ("character_version", Value::String(String::new())),
        ("group_only_greetings", Value::Array(Vec::new())),
    ]
}

/// True if `value` is exactly what export would have generated for `key`
pub fn is_generated_default(defaults: &[(&'static str, Value)], key: &str, value: &Value) -> bool {
    defaults.iter().any(|(k, v)| *k == key && v == value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_fallback() {
        assert_eq!(default_world("", "Lily"), "Lily");
        assert_eq!(default_world("Town lore", "Lily"), "Town lore");
    }

    #[test]
    fn test_generated_default_match_is_exact() {
        let defaults = generated_extension_defaults("Lily");
        assert!(is_generated_default(&defaults, "world", &json!("Lily")));
        assert!(!is_generated_default(&defaults, "world", &json!("Other")));
        assert!(!is_generated_default(&defaults, "fav", &json!(true)));
        assert!(is_generated_default(
            &defaults,
            "depth_prompt",
            &json!({"role": "system", "depth": 4, "prompt": ""})
        ));
    }
}
