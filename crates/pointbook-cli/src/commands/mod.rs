//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (open_db, load_config, confirm) and init
//! - `history` - Purchase history store (import, stats, delete, browse)
//! - `staff` - Staff directory
//! - `groups` - Product groups
//! - `compute` - Classification and report export
//! - `backup` - Backup export and restore

pub mod backup;
pub mod compute;
pub mod core;
pub mod groups;
pub mod history;
pub mod staff;

// Re-export command functions for main.rs
pub use backup::*;
pub use compute::*;
pub use core::*;
pub use groups::*;
pub use history::*;
pub use staff::*;

/// Truncate a string to at most `max` characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
