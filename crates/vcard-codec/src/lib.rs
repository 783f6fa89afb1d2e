//! vcard Codec - character card v3 interchange
//!
//! Maps a canonical [`vcard_core::Draft`] to the external `chara_card_v3`
//! document and back. Import accepts v3, v2 and flat v1 documents. For drafts
//! whose fields are all in the recognized set, `import(export(draft))` equals
//! the draft field for field, apart from `meta.updatedAt`, `meta.progress`
//! and `validation`, which live outside the exported artifact.

pub mod export;
pub mod import;
pub mod schema;

pub use export::{card_draft_to_chara_card_v3, export_card_json, ExportMode, ExportOptions};
pub use import::{chara_card_to_card_draft, import_card_json};
