//! # vcard-core
//!
//! Core types for the vcard draft engine.
//!
//! A [`Draft`] is the canonical, always-normalized representation of a
//! character card under construction. Everything that enters the engine goes
//! through [`normalize_card_draft`] first, and every operation downstream of
//! it returns a new value instead of editing one in place.
//!
//! ## Layout
//!
//! - [`types`]: the Draft data model
//! - [`enums`]: code tables shared with the interchange format
//! - [`normalize`]: total normalizers over arbitrary JSON
//! - [`regex_literal`]: `/pattern/flags` parsing and escaping
//! - [`config`]: repository-level configuration

pub mod coerce;
pub mod config;
pub mod enums;
mod error;
pub mod normalize;
pub mod regex_literal;
pub mod types;

pub use config::{DiffConfig, ExportConfig, LintConfig, ReadConfig, SummaryConfig, VcardConfig};
pub use enums::{FindStyle, Light, Position, SecondaryLogic};
pub use error::{DraftError, Result};
pub use normalize::{
    ensure_worldbook_entry_ids, normalize_card_draft, normalize_regex_script_lite,
    normalize_tavern_helper_pack_lite, normalize_worldbook_entry_lite, EntryIdRepair,
};
pub use types::*;
