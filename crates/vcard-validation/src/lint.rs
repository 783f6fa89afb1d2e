//! Structural lint rules for drafts

use regex::RegexBuilder;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, instrument};
use vcard_core::{
    Card, Draft, LintConfig, Light, RegexScript, Validation, Worldbook, WorldbookEntry,
};
use vcard_planning::{pick_vibe_plan_current, DraftPlanExt, Resolution};

use crate::progress::{build_progress, Progress};

/// Card fields that must not be empty
const REQUIRED_FIELDS: [&str; 3] = ["name", "description", "first_mes"];
/// Placement codes the host understands
const ALLOWED_PLACEMENTS: [i64; 6] = [0, 1, 2, 3, 5, 6];
/// Flag letters accepted in `/pattern/flags`
const KNOWN_FLAGS: &str = "dgimsuvy";
/// Letters with a meaning after `\` in a JavaScript pattern
const JS_ESCAPE_LETTERS: &str = "bBcdDfknpPrsStuvwWx";
/// Inline modifier letters accepted in `(?ims-ims:...)`
const GROUP_MODIFIERS: &str = "ims-";

/// Lint findings plus derived progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub progress: Progress,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Default)]
struct Findings {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Findings {
    fn error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }
}

/// Lint a draft with default settings
pub fn lint_card_draft(draft: &Draft) -> LintReport {
    lint_card_draft_with(draft, &LintConfig::default())
}

/// Lint a draft
#[instrument(skip(draft, config), fields(card = %draft.card.name))]
pub fn lint_card_draft_with(draft: &Draft, config: &LintConfig) -> LintReport {
    let mut findings = Findings::default();

    lint_card(&draft.card, config, &mut findings);
    lint_worldbook(&draft.worldbook, &mut findings);
    for (idx, script) in draft.regex_scripts.iter().enumerate() {
        lint_regex_script(idx, script, &mut findings);
    }

    let plan = draft.vibe_plan();
    let resolution = plan
        .as_ref()
        .map(pick_vibe_plan_current)
        .unwrap_or(Resolution::NeedPlan);
    lint_plan(&resolution, &mut findings);

    debug!(
        "Lint: {} errors, {} warnings, plan {}",
        findings.errors.len(),
        findings.warnings.len(),
        resolution.kind()
    );

    let progress = build_progress(plan.as_ref(), &resolution, &findings.errors);
    LintReport {
        errors: findings.errors,
        warnings: findings.warnings,
        progress,
    }
}

/// New draft with `validation` and `meta.progress` refreshed
pub fn apply_lint(draft: &Draft) -> Draft {
    apply_lint_with(draft, &LintConfig::default())
}

/// New draft with `validation` and `meta.progress` refreshed
pub fn apply_lint_with(draft: &Draft, config: &LintConfig) -> Draft {
    let report = lint_card_draft_with(draft, config);
    let mut next = draft.clone();
    next.meta.progress = Some(report.progress.to_value());
    next.validation = Validation {
        errors: report.errors,
        warnings: report.warnings,
    };
    next
}

fn lint_card(card: &Card, config: &LintConfig, findings: &mut Findings) {
    for field in REQUIRED_FIELDS {
        if card.text_field(field).is_some_and(|v| v.trim().is_empty()) {
            findings.error(format!("card.{} is required", field));
        }
    }

    for field in &config.recommended_fields {
        if card.text_field(field).is_some_and(|v| v.trim().is_empty()) {
            findings.warn(format!("card.{} is empty (recommended)", field));
        }
    }
}

fn entry_label(idx: usize, entry: &WorldbookEntry) -> String {
    let comment = entry.comment.trim();
    if comment.is_empty() {
        format!("worldbook.entries[{}] (#{})", idx, entry.id)
    } else {
        format!("worldbook.entries[{}] ({})", idx, comment)
    }
}

fn lint_worldbook(worldbook: &Worldbook, findings: &mut Findings) {
    let mut seen_ids = HashSet::new();

    for (idx, entry) in worldbook.entries.iter().enumerate() {
        let label = entry_label(idx, entry);

        if !seen_ids.insert(entry.id) {
            findings.error(format!("{}: duplicate id {}", label, entry.id));
        }

        if entry.light == Light::Green && entry.keys.iter().all(|k| k.trim().is_empty()) {
            findings.error(format!(
                "{}: green (selective) entry has no keys and can never trigger",
                label
            ));
        }

        if entry.position.is_at_depth() && entry.depth().is_none() {
            findings.error(format!(
                "{}: position {} requires a numeric at_depth.depth",
                label, entry.position
            ));
        }

        if entry.content.trim().is_empty() {
            findings.warn(format!("{}: content is empty", label));
        }
    }
}

fn script_label(idx: usize, script: &RegexScript) -> String {
    let name = script.name.trim();
    if name.is_empty() {
        format!("regex_scripts[{}]", idx)
    } else {
        format!("regex_scripts[{}] ({})", idx, name)
    }
}

/// True for look-around or backreferences, which `regex` cannot compile
fn uses_unsupported_syntax(pattern: &str) -> bool {
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                match chars.get(i + 1) {
                    Some('1'..='9') => return true,
                    Some('k') if chars.get(i + 2) == Some(&'<') => return true,
                    _ => {}
                }
                i += 2;
            }
            '(' => {
                let rest: String = chars[i + 1..].iter().take(3).collect();
                if rest.starts_with("?=")
                    || rest.starts_with("?!")
                    || rest.starts_with("?<=")
                    || rest.starts_with("?<!")
                {
                    return true;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    false
}

/// Length of a `{n}`, `{n,}` or `{n,m}` quantifier opening at `start`
fn braced_quantifier_len(chars: &[char], start: usize) -> Option<usize> {
    let digits_at = |from: usize| chars[from..].iter().take_while(|c| c.is_ascii_digit()).count();

    let mut i = start + 1;
    let lead = digits_at(i);
    if lead == 0 {
        return None;
    }
    i += lead;
    if chars.get(i) == Some(&',') {
        i += 1;
        i += digits_at(i);
    }
    (chars.get(i) == Some(&'}')).then_some(i + 1 - start)
}

/// Literal value of `\c` inside a class, when it has a single one
fn class_escape_literal(c: char) -> Option<char> {
    match c {
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'f' => Some('\x0c'),
        'v' => Some('\x0b'),
        'b' => Some('\x08'),
        c if c.is_ascii_alphanumeric() => None,
        c => Some(c),
    }
}

/// Index just past the `]` closing the class that opens at `start`
fn scan_class(chars: &[char], start: usize) -> Result<usize, String> {
    let mut i = start + 1;
    if chars.get(i) == Some(&'^') {
        i += 1;
    }

    // Last single-character member, the low end of a possible range
    let mut prev: Option<char> = None;
    while i < chars.len() {
        match chars[i] {
            ']' => return Ok(i + 1),
            '\\' => {
                prev = chars.get(i + 1).copied().and_then(class_escape_literal);
                i += 2;
            }
            '-' if prev.is_some() && chars.get(i + 1).is_some_and(|c| *c != ']') => {
                let (high, width) = match chars[i + 1] {
                    '\\' => (chars.get(i + 2).copied().and_then(class_escape_literal), 2),
                    c => (Some(c), 1),
                };
                if let (Some(low), Some(high)) = (prev.take(), high) {
                    if high < low {
                        return Err(format!(
                            "range out of order in character class: {}-{}",
                            low, high
                        ));
                    }
                }
                i += 1 + width;
            }
            c => {
                prev = Some(c);
                i += 1;
            }
        }
    }

    Err("missing closing ] for character class".to_string())
}

/// Characters a group opener consumes after its `(`
fn group_prefix_len(chars: &[char], open: usize) -> Result<usize, String> {
    if chars.get(open + 1) != Some(&'?') {
        return Ok(0);
    }
    match chars.get(open + 2) {
        Some(':' | '=' | '!') => Ok(2),
        Some('<') => match chars.get(open + 3) {
            Some('=' | '!') => Ok(3),
            _ => match chars[open + 3..].iter().position(|c| *c == '>') {
                Some(0) => Err("empty group name".to_string()),
                Some(name_len) => Ok(3 + name_len),
                None => Err("unterminated group name".to_string()),
            },
        },
        Some(c) if GROUP_MODIFIERS.contains(*c) => {
            let len = chars[open + 2..]
                .iter()
                .take_while(|c| GROUP_MODIFIERS.contains(**c))
                .count();
            if chars.get(open + 2 + len) == Some(&':') {
                Ok(len + 2)
            } else {
                Err("invalid group".to_string())
            }
        }
        _ => Err("invalid group".to_string()),
    }
}

/// First structural error a JavaScript engine would also reject
///
/// Covers what fails in every engine mode: unbalanced groups and classes,
/// quantifiers with nothing to repeat, reversed class ranges and a trailing
/// backslash. Anything subtler is left to the compile check.
fn js_syntax_problem(pattern: &str) -> Option<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut depth = 0usize;
    let mut can_repeat = false;
    let mut after_quantifier = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let was_quantifier = std::mem::take(&mut after_quantifier);

        match c {
            '\\' => {
                let Some(next) = chars.get(i + 1) else {
                    return Some("\\ at end of pattern".to_string());
                };
                can_repeat = !matches!(next, 'b' | 'B');
                i += 2;
            }
            '[' => match scan_class(&chars, i) {
                Ok(next) => {
                    can_repeat = true;
                    i = next;
                }
                Err(problem) => return Some(problem),
            },
            '(' => match group_prefix_len(&chars, i) {
                Ok(prefix) => {
                    depth += 1;
                    can_repeat = false;
                    i += 1 + prefix;
                }
                Err(problem) => return Some(problem),
            },
            ')' => {
                if depth == 0 {
                    return Some("unmatched ) in pattern".to_string());
                }
                depth -= 1;
                can_repeat = true;
                i += 1;
            }
            '|' | '^' | '$' => {
                can_repeat = false;
                i += 1;
            }
            '?' if was_quantifier => {
                // Lazy suffix
                i += 1;
            }
            '*' | '+' | '?' => {
                if !can_repeat {
                    return Some(format!("nothing to repeat before '{}'", c));
                }
                can_repeat = false;
                after_quantifier = true;
                i += 1;
            }
            '{' => match braced_quantifier_len(&chars, i) {
                Some(len) => {
                    if !can_repeat {
                        return Some("nothing to repeat before '{'".to_string());
                    }
                    can_repeat = false;
                    after_quantifier = true;
                    i += len;
                }
                None => {
                    can_repeat = true;
                    i += 1;
                }
            },
            _ => {
                can_repeat = true;
                i += 1;
            }
        }
    }

    (depth > 0).then(|| "missing closing ) for group".to_string())
}

/// Rewrite JavaScript-only spellings so `regex` reads them the same way
///
/// Lone braces become literals, `\0` becomes NUL, letter identity escapes
/// lose their backslash and `[^]` matches any character.
fn to_rust_regex_syntax(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut in_class = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' {
            match chars.get(i + 1) {
                Some('0') if !chars.get(i + 2).is_some_and(char::is_ascii_digit) => {
                    out.push_str("\\x00");
                }
                Some('b') if in_class => out.push_str("\\x08"),
                Some(next) if next.is_ascii_alphabetic() && !JS_ESCAPE_LETTERS.contains(*next) => {
                    out.push(*next);
                }
                Some(next) => {
                    out.push('\\');
                    out.push(*next);
                }
                None => out.push_str("\\\\"),
            }
            i += 2;
            continue;
        }

        if in_class {
            match c {
                ']' => in_class = false,
                '[' | '&' | '~' => out.push('\\'),
                _ => {}
            }
            out.push(c);
            i += 1;
            continue;
        }

        match c {
            '[' if chars.get(i + 1) == Some(&'^') && chars.get(i + 2) == Some(&']') => {
                out.push_str("[\\s\\S]");
                i += 3;
            }
            '[' => {
                in_class = true;
                out.push('[');
                i += 1;
                if chars.get(i) == Some(&'^') {
                    out.push('^');
                    i += 1;
                }
            }
            '{' => match braced_quantifier_len(&chars, i) {
                Some(len) => {
                    out.extend(&chars[i..i + len]);
                    i += len;
                }
                None => {
                    out.push_str("\\{");
                    i += 1;
                }
            },
            '}' => {
                out.push_str("\\}");
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Last non-empty line of a compile error; `regex` puts the cause there
fn compile_error_summary(error: &regex::Error) -> String {
    let text = error.to_string();
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("invalid pattern")
        .to_string()
}

fn lint_regex_script(idx: usize, script: &RegexScript, findings: &mut Findings) {
    let label = script_label(idx, script);

    if script.placement.is_empty() {
        findings.warn(format!("{}: placement is empty; the script never runs", label));
    }
    for code in &script.placement {
        if *code == 0 {
            findings.warn(format!("{}: placement 0 is deprecated", label));
        } else if !ALLOWED_PLACEMENTS.contains(code) {
            findings.warn(format!("{}: unknown placement {}", label, code));
        }
    }

    let options = &script.options;
    if let Some(min) = options.min_depth {
        if min < -1 {
            findings.warn(format!("{}: minDepth {} is below -1", label, min));
        }
    }
    if let Some(max) = options.max_depth {
        if max < 0 {
            findings.warn(format!("{}: maxDepth {} is negative", label, max));
        }
    }
    if let (Some(min), Some(max)) = (options.min_depth, options.max_depth) {
        if max < min {
            findings.warn(format!(
                "{}: maxDepth {} is less than minDepth {}",
                label, max, min
            ));
        }
    }
    if !(0..=2).contains(&options.substitute_regex) {
        findings.warn(format!(
            "{}: substituteRegex {} is not 0, 1 or 2",
            label, options.substitute_regex
        ));
    }

    let unknown_flags: BTreeSet<char> = script
        .find
        .flags
        .chars()
        .filter(|c| !KNOWN_FLAGS.contains(*c))
        .collect();
    if !unknown_flags.is_empty() {
        let flags: String = unknown_flags.into_iter().collect();
        findings.warn(format!("{}: unknown regex flags '{}'", label, flags));
    }

    let pattern = &script.find.pattern;
    if pattern.is_empty() {
        findings.warn(format!("{}: find pattern is empty", label));
        return;
    }

    if let Some(problem) = js_syntax_problem(pattern) {
        if script.enabled {
            findings.error(format!("{}: pattern does not compile: {}", label, problem));
        } else {
            findings.warn(format!(
                "{}: pattern does not compile (script disabled): {}",
                label, problem
            ));
        }
        return;
    }

    if uses_unsupported_syntax(pattern) {
        findings.warn(format!(
            "{}: pattern uses look-around or backreferences and was not verified",
            label
        ));
        return;
    }

    // The host engine is JavaScript; a pattern only `regex` rejects is not an error
    let flags = &script.find.flags;
    let compiled = RegexBuilder::new(&to_rust_regex_syntax(pattern))
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build();

    if let Err(e) = compiled {
        let summary = compile_error_summary(&e);
        debug!("{}: regex rejected {:?}: {}", label, pattern, summary);
        findings.warn(format!("{}: pattern was not verified: {}", label, summary));
    }
}

fn lint_plan(resolution: &Resolution, findings: &mut Findings) {
    match resolution {
        Resolution::Cycle { cycle } => {
            findings.warn(format!("vibePlan: dependency cycle {}", cycle.join(" -> ")));
        }
        Resolution::InvalidDep {
            task_id,
            missing_id,
        } => {
            findings.warn(format!(
                "vibePlan: task {} depends on missing task {}",
                task_id, missing_id
            ));
        }
        _ => {}
    }
}
