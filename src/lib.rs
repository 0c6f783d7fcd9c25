// Inventory Correction Toolkit - Core Library
// Exposes all modules for use in the CLI and tests

pub mod db;
pub mod rules;
pub mod corrector;
pub mod categorize;

// Re-export commonly used types
pub use db::{
    Device, Event,
    load_csv, setup_database, insert_devices,
    get_all_devices, find_devices_by_hardware,
    update_hardware, update_category,
    verify_count, insert_event, get_events_for_entity,
};
pub use rules::{CorrectionRule, RuleSet};
pub use corrector::{
    apply_corrections, ChangeEntry, CorrectionReport, RuleOutcome,
};
pub use categorize::{
    categorize_devices, default_category_rules,
    CategorizeReport, CategoryRule, UnmatchedDevice,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
