//! Content-light overviews of a draft

use serde::Serialize;
use vcard_core::{Card, Draft, SummaryConfig};

use crate::layout::{
    entry_names, helper_script_names, regex_script_names, ALTERNATE_GREETINGS_DIR,
    REGEX_SCRIPTS_DIR, SCRIPTS_DIR, TAGS_FILE, TAVERN_HELPER_DIR, VARIABLES_DIR, WORLDBOOK_DIR,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSummary {
    pub file: String,
    pub chars: usize,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySummary {
    pub file: String,
    pub id: u64,
    pub comment: String,
    pub keys: Vec<String>,
    pub enabled: bool,
    pub position: String,
    pub chars: usize,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldbookSummary {
    pub name: String,
    pub count: usize,
    pub entries: Vec<EntrySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegexSummary {
    pub file: String,
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub placement: Vec<i64>,
    pub find: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HelperScriptSummary {
    pub file: String,
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub chars: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TavernHelperSummary {
    pub scripts: Vec<HelperScriptSummary>,
    pub variables: Vec<String>,
}

/// Everything a consumer needs to decide what to read next
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemSummary {
    pub root: String,
    pub fields: Vec<FieldSummary>,
    pub tags: Vec<String>,
    pub alternate_greetings: Vec<FieldSummary>,
    pub worldbook: WorldbookSummary,
    pub regex_scripts: Vec<RegexSummary>,
    pub tavern_helper: TavernHelperSummary,
}

/// First `max` characters with whitespace runs collapsed
fn preview(text: &str, max: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(max).collect();
    cut.push_str("...");
    cut
}

fn chars(text: &str) -> usize {
    text.chars().count()
}

pub fn build_file_system_summary(draft: &Draft) -> FileSystemSummary {
    build_file_system_summary_with(draft, &SummaryConfig::default())
}

pub fn build_file_system_summary_with(draft: &Draft, config: &SummaryConfig) -> FileSystemSummary {
    let max = config.preview_chars;
    let card = &draft.card;

    let fields = Card::TEXT_FIELDS
        .iter()
        .map(|field| {
            let text = card.text_field(field).unwrap_or_default();
            FieldSummary {
                file: format!("{}.md", field),
                chars: chars(text),
                preview: preview(text, max),
            }
        })
        .collect();

    let alternate_greetings = card
        .alternate_greetings
        .iter()
        .enumerate()
        .map(|(idx, text)| FieldSummary {
            file: format!("{}/{}.md", ALTERNATE_GREETINGS_DIR, idx),
            chars: chars(text),
            preview: preview(text, max),
        })
        .collect();

    let entries = entry_names(draft)
        .into_iter()
        .zip(&draft.worldbook.entries)
        .map(|(name, entry)| EntrySummary {
            file: format!("{}/{}", WORLDBOOK_DIR, name),
            id: entry.id,
            comment: entry.comment.clone(),
            keys: entry.keys.clone(),
            enabled: entry.enabled,
            position: entry.position.to_string(),
            chars: chars(&entry.content),
            preview: preview(&entry.content, max),
        })
        .collect();

    let regex_scripts = regex_script_names(draft)
        .into_iter()
        .zip(&draft.regex_scripts)
        .map(|(name, script)| RegexSummary {
            file: format!("{}/{}", REGEX_SCRIPTS_DIR, name),
            id: script.id.clone(),
            name: script.name.clone(),
            enabled: script.enabled,
            placement: script.placement.clone(),
            find: preview(&script.find.pattern, max),
        })
        .collect();

    let scripts = helper_script_names(draft)
        .into_iter()
        .zip(&draft.tavern_helper.scripts)
        .map(|(name, script)| HelperScriptSummary {
            file: format!("{}/{}/{}", TAVERN_HELPER_DIR, SCRIPTS_DIR, name),
            id: script.id.clone(),
            name: script.name.clone(),
            enabled: script.enabled,
            chars: chars(&script.content),
        })
        .collect();

    FileSystemSummary {
        root: draft.root_name().to_string(),
        fields,
        tags: card.tags.clone(),
        alternate_greetings,
        worldbook: WorldbookSummary {
            name: draft.worldbook.name.clone(),
            count: draft.worldbook.entries.len(),
            entries,
        },
        regex_scripts,
        tavern_helper: TavernHelperSummary {
            scripts,
            variables: draft.tavern_helper.variables.keys().cloned().collect(),
        },
    }
}

/// Indented text tree with character counts
pub fn build_file_tree(draft: &Draft) -> String {
    let card = &draft.card;
    let mut lines = vec![format!("{}/", draft.root_name())];

    for field in Card::TEXT_FIELDS {
        let text = card.text_field(field).unwrap_or_default();
        lines.push(format!("  {}.md ({})", field, chars(text)));
    }
    lines.push(format!("  {} ({} tags)", TAGS_FILE, card.tags.len()));

    lines.push(format!(
        "  {}/ ({})",
        ALTERNATE_GREETINGS_DIR,
        card.alternate_greetings.len()
    ));
    for (idx, text) in card.alternate_greetings.iter().enumerate() {
        lines.push(format!("    {}.md ({})", idx, chars(text)));
    }

    lines.push(format!("  {}/ ({})", WORLDBOOK_DIR, draft.worldbook.entries.len()));
    for (name, entry) in entry_names(draft).iter().zip(&draft.worldbook.entries) {
        let state = if entry.enabled { "" } else { ", disabled" };
        lines.push(format!("    {} ({}{})", name, chars(&entry.content), state));
    }

    lines.push(format!("  {}/ ({})", REGEX_SCRIPTS_DIR, draft.regex_scripts.len()));
    for (name, script) in regex_script_names(draft).iter().zip(&draft.regex_scripts) {
        let state = if script.enabled { "" } else { ", disabled" };
        lines.push(format!("    {} ({}{})", name, chars(&script.find.pattern), state));
    }

    let pack = &draft.tavern_helper;
    lines.push(format!("  {}/", TAVERN_HELPER_DIR));
    lines.push(format!("    {}/ ({})", SCRIPTS_DIR, pack.scripts.len()));
    for (name, script) in helper_script_names(draft).iter().zip(&pack.scripts) {
        lines.push(format!("      {} ({})", name, chars(&script.content)));
    }
    lines.push(format!("    {}/ ({})", VARIABLES_DIR, pack.variables.len()));
    for name in pack.variables.keys() {
        lines.push(format!("      {}", name));
    }

    let mut tree = lines.join("\n");
    tree.push('\n');
    tree
}
