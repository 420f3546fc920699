//! Git operations using git2-rs.

pub mod commits;
pub mod range;
pub mod remote;

pub use commits::{collect_push, commit_input, diff_text};
pub use range::{PushRange, is_null_ref, open_repository, resolve_push_range, resolve_reference};
pub use remote::{CommitUrls, commit_url};
