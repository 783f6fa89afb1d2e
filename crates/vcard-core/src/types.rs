//! Core type definitions for the Draft model

use serde::Serialize;
use serde_json::{Map, Value};

use crate::enums::{FindStyle, Light, Position, SecondaryLogic};

/// Spec identifier written into every draft and export
pub const SPEC_NAME: &str = "chara_card_v3";
/// Spec version written into every draft and export
pub const SPEC_VERSION: &str = "3.0";
/// Key of the embedded task plan inside `raw.dataExtensions`
pub const VIBE_PLAN_KEY: &str = "vibePlan";

/// Canonical character card under construction
///
/// Only ever produced by [`crate::normalize_card_draft`] (or [`Draft::empty`]),
/// so every field is present and every enum is in range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Draft {
    pub meta: DraftMeta,
    pub card: Card,
    pub worldbook: Worldbook,
    pub regex_scripts: Vec<RegexScript>,
    pub tavern_helper: TavernHelperPack,
    pub validation: Validation,
    pub raw: RawBag,
}

impl Draft {
    /// A blank draft with default metadata
    pub fn empty() -> Self {
        Self {
            meta: DraftMeta::default(),
            card: Card::default(),
            worldbook: Worldbook::default(),
            regex_scripts: Vec::new(),
            tavern_helper: TavernHelperPack::default(),
            validation: Validation::default(),
            raw: RawBag::default(),
        }
    }

    /// Serialize to a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize draft: {}", e);
            Value::Null
        })
    }

    /// Raw embedded plan, if the passthrough bag carries one
    pub fn vibe_plan_value(&self) -> Option<&Value> {
        self.raw
            .data_extensions
            .get(VIBE_PLAN_KEY)
            .filter(|v| !v.is_null())
    }

    /// Name used as the root of addressable views
    pub fn root_name(&self) -> &str {
        let name = self.card.name.trim();
        if name.is_empty() {
            "card"
        } else {
            name
        }
    }
}

impl Default for Draft {
    fn default() -> Self {
        Self::empty()
    }
}

/// Draft metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftMeta {
    pub spec: String,
    pub spec_version: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    /// Derived progress report; recomputed on every lint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Value>,
}

impl Default for DraftMeta {
    fn default() -> Self {
        Self {
            spec: SPEC_NAME.to_string(),
            spec_version: SPEC_VERSION.to_string(),
            updated_at: String::new(),
            progress: None,
        }
    }
}

/// Character card text fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Card {
    pub name: String,
    pub description: String,
    pub personality: String,
    pub scenario: String,
    pub first_mes: String,
    pub mes_example: String,
    pub creator_notes: String,
    pub system_prompt: String,
    pub post_history_instructions: String,
    pub alternate_greetings: Vec<String>,
    pub tags: Vec<String>,
}

impl Card {
    /// Single-string fields in interchange order
    pub const TEXT_FIELDS: [&'static str; 9] = [
        "name",
        "description",
        "personality",
        "scenario",
        "first_mes",
        "mes_example",
        "creator_notes",
        "system_prompt",
        "post_history_instructions",
    ];

    /// Look up a single-string field by name
    pub fn text_field(&self, field: &str) -> Option<&str> {
        let value = match field {
            "name" => &self.name,
            "description" => &self.description,
            "personality" => &self.personality,
            "scenario" => &self.scenario,
            "first_mes" => &self.first_mes,
            "mes_example" => &self.mes_example,
            "creator_notes" => &self.creator_notes,
            "system_prompt" => &self.system_prompt,
            "post_history_instructions" => &self.post_history_instructions,
            _ => return None,
        };
        Some(value.as_str())
    }
}

/// Embedded lorebook
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Worldbook {
    pub name: String,
    pub entries: Vec<WorldbookEntry>,
}

/// Depth setting for at-depth positions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AtDepth {
    /// `None` when the source carried no usable number; lint reports it
    pub depth: Option<i64>,
}

/// One worldbook entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldbookEntry {
    pub id: u64,
    pub enabled: bool,
    pub light: Light,
    pub keys: Vec<String>,
    pub secondary_keys: Vec<String>,
    pub secondary_logic: SecondaryLogic,
    pub comment: String,
    pub content: String,
    pub position: Position,
    /// Present only for at-depth positions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_depth: Option<AtDepth>,
    pub order: i64,
    pub use_regex: bool,
    pub raw_extensions: Map<String, Value>,
}

impl WorldbookEntry {
    pub const DEFAULT_ORDER: i64 = 100;
    pub const DEFAULT_DEPTH: i64 = 4;

    /// Default entry carrying the given id
    pub fn new(id: u64) -> Self {
        Self {
            id,
            enabled: true,
            light: Light::default(),
            keys: Vec::new(),
            secondary_keys: Vec::new(),
            secondary_logic: SecondaryLogic::default(),
            comment: String::new(),
            content: String::new(),
            position: Position::default(),
            at_depth: None,
            order: Self::DEFAULT_ORDER,
            use_regex: false,
            raw_extensions: Map::new(),
        }
    }

    /// Numeric depth, if the entry is at-depth and has one
    pub fn depth(&self) -> Option<i64> {
        self.at_depth.as_ref().and_then(|d| d.depth)
    }
}

/// Regex `find` clause
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegexFind {
    /// Pattern text; slash style stores it with `\/` unescaped
    pub pattern: String,
    pub flags: String,
    pub style: FindStyle,
}

/// Regex script options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegexOptions {
    #[serde(rename = "runOnEdit")]
    pub run_on_edit: bool,
    #[serde(rename = "substituteRegex")]
    pub substitute_regex: i64,
    #[serde(rename = "minDepth")]
    pub min_depth: Option<i64>,
    #[serde(rename = "maxDepth")]
    pub max_depth: Option<i64>,
}

/// One regex script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegexScript {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub placement: Vec<i64>,
    pub find: RegexFind,
    pub replace: String,
    #[serde(rename = "trimStrings")]
    pub trim_strings: Vec<String>,
    #[serde(rename = "markdownOnly")]
    pub markdown_only: bool,
    #[serde(rename = "promptOnly")]
    pub prompt_only: bool,
    pub options: RegexOptions,
}

/// One button attached to a helper script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptButtonItem {
    pub name: String,
    pub visible: bool,
}

/// Button strip of a helper script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptButton {
    pub enabled: bool,
    pub buttons: Vec<ScriptButtonItem>,
}

impl Default for ScriptButton {
    fn default() -> Self {
        Self {
            enabled: true,
            buttons: Vec::new(),
        }
    }
}

/// One tavern-helper script
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TavernScript {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub content: String,
    pub info: String,
    pub button: ScriptButton,
    pub data: Map<String, Value>,
}

/// Tavern-helper scripts and variables
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TavernHelperPack {
    pub scripts: Vec<TavernScript>,
    pub variables: Map<String, Value>,
}

impl TavernHelperPack {
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty() && self.variables.is_empty()
    }
}

/// Accumulated lint findings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Opaque passthrough data
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawBag {
    /// Unrecognized `data.extensions` keys, in source order
    #[serde(rename = "dataExtensions")]
    pub data_extensions: Map<String, Value>,
    /// Unrecognized `data` keys, in source order
    #[serde(rename = "dataExtras")]
    pub data_extras: Map<String, Value>,
}
