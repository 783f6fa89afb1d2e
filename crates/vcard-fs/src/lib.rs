//! vcard FS - a draft seen as a file system
//!
//! Lets a consumer discover and fetch bounded slices of a large draft by
//! path instead of receiving the whole document:
//!
//! ```text
//! <root>/
//!   name.md description.md ... post_history_instructions.md tags.json
//!   alternate_greetings/<i>.md
//!   worldbook/<comment | index>
//!   regex_scripts/<name | index>
//!   tavern_helper/scripts/<name | id>
//!   tavern_helper/variables/<name>
//! ```
//!
//! Dotted paths such as `worldbook.entries[0].content` address the draft's
//! JSON directly.

pub mod dotted;
pub mod layout;
pub mod path;
pub mod read;
pub mod resolve;
pub mod summary;

pub use dotted::{is_dotted_path, resolve_dotted_path, DOTTED_ROOTS};
pub use path::parse_file_path;
pub use read::{
    build_read_result, build_read_result_text, format_read_request, normalize_read_request,
    normalize_read_request_with, parse_read_request_text, parse_read_result_text, ReadItemRequest,
    ReadItemType, ReadRequest, ReadResult, ReadResultItem, READ_REQUEST_MARKER, READ_RESULT_MARKER,
};
pub use resolve::{resolve_file_content, resolve_path, Resolved};
pub use summary::{
    build_file_system_summary, build_file_system_summary_with, build_file_tree, FileSystemSummary,
};
