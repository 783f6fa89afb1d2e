//! vcard Board - draft snapshots inside chat transcripts
//!
//! A board is a Markdown block: a human preview, a progress banner and the
//! full normalized draft as JSON between two sentinel comments. Transcripts
//! are append-only; the last complete board is the current draft.
//!
//! Also home to the artifact differ, which reports which exported paths
//! changed between two snapshots.

pub mod board;
pub mod diff;
mod render;

pub use board::{
    append_board, build_draft_board_markdown, build_draft_board_markdown_at,
    parse_draft_from_board_markdown, BoardSnapshot, BOARD_END, BOARD_FENCE, BOARD_START,
};
pub use diff::{draft_artifact_diff, draft_artifact_diff_with, ArtifactDiff, ARTIFACT_ROOTS};
