//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `moddesk_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use moddesk_core::db::migrations::latest_version;

fn main() {
    println!("moddesk_core version={}", moddesk_core::core_version());
    println!("moddesk_core schema_version={}", latest_version());
}
