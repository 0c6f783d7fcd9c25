// 🗂️ Device Categorizer - keyword matching over hardware labels
// Assigns the first category whose keyword list hits the label,
// persisting only when the stored category actually differs

use anyhow::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db;

// ============================================================================
// CATEGORY RULE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Category slug stored on the device row
    pub category: String,

    /// Lowercase keywords; any substring hit assigns the category
    pub keywords: Vec<String>,
}

impl CategoryRule {
    /// Check against an already-lowercased label
    pub fn matches(&self, label_lower: &str) -> bool {
        self.keywords.iter().any(|kw| label_lower.contains(kw.as_str()))
    }
}

/// Built-in keyword table for the inventory's categories.
/// Ordered: the first matching rule wins.
pub fn default_category_rules() -> Vec<CategoryRule> {
    let table: &[(&str, &[&str])] = &[
        (
            "laptop",
            &[
                "laptop", "notebook", "macbook", "thinkpad", "latitude", "probook",
                "elitebook", "xps", "chromebook",
            ],
        ),
        (
            "system_unit",
            &[
                "system unit", "systemunit", "desktop", "tower", "optiplex",
                "prodesk", "elitedesk", "workstation", "all-in-one",
            ],
        ),
        ("monitor", &["monitor", "display", "screen", "lcd", "led"]),
        (
            "networking_devices",
            &["router", "switch", "access point", "mikrotik", "cisco", "tp-link"],
        ),
        (
            "printer",
            &["printer", "laserjet", "deskjet", "mfp", "scanner", "copier", "kyocera"],
        ),
        (
            "n_computing",
            &["ncomputing", "n-computing", "thin client", "zero client"],
        ),
        ("projector", &["projector"]),
        (
            "power_backup_equipment",
            &["ups", "power backup", "stabilizer", "inverter"],
        ),
        ("gadget", &["phone", "iphone", "tablet", "ipad", "smartphone"]),
    ];

    table
        .iter()
        .map(|(category, keywords)| CategoryRule {
            category: category.to_string(),
            keywords: keywords.iter().map(|kw| kw.to_string()).collect(),
        })
        .collect()
}

// ============================================================================
// CATEGORIZE REPORT
// ============================================================================

/// Device no keyword matched, listed for manual follow-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnmatchedDevice {
    pub device_id: i64,
    pub hardware: String,
    pub serial_number: Option<String>,
    pub current_category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategorizeReport {
    /// Devices with a non-empty hardware label
    pub scanned: usize,

    /// Devices whose category was rewritten
    pub updated: usize,

    pub unmatched: Vec<UnmatchedDevice>,
}

impl CategorizeReport {
    pub fn summary(&self) -> String {
        format!(
            "{} devices scanned, {} categorized, {} unmatched",
            self.scanned,
            self.updated,
            self.unmatched.len()
        )
    }
}

// ============================================================================
// CATEGORIZATION PASS
// ============================================================================

/// Scan every device with a non-empty hardware label and assign the first
/// matching category. Only the category column is written, and only when
/// the stored value differs.
pub fn categorize_devices(
    conn: &Connection,
    rules: &[CategoryRule],
) -> Result<CategorizeReport> {
    let devices = db::get_all_devices(conn)?;

    let mut report = CategorizeReport::default();

    for device in &devices {
        let label = match device.hardware.as_deref() {
            Some(l) if !l.trim().is_empty() => l,
            _ => continue,
        };

        report.scanned += 1;

        let label_lower = label.to_lowercase();
        let found = rules.iter().find(|rule| rule.matches(&label_lower));

        match found {
            Some(rule) if device.category.as_deref() != Some(rule.category.as_str()) => {
                db::update_category(conn, device.id, &rule.category)?;
                report.updated += 1;
            }
            Some(_) => {} // already correct, leave the row alone
            None => report.unmatched.push(UnmatchedDevice {
                device_id: device.id,
                hardware: label.to_string(),
                serial_number: device.serial_number.clone(),
                current_category: device.category.clone(),
            }),
        }
    }

    println!("✓ {}", report.summary());

    if !report.unmatched.is_empty() {
        println!("\nDevices that could not be auto-categorized:");
        println!(
            "{:<6} | {:<50} | {:<20} | Current Category",
            "ID", "Hardware", "Serial"
        );
        println!("{}", "-".repeat(100));

        // Cap the listing to avoid flooding the console
        for item in report.unmatched.iter().take(50) {
            let hw_display: String = item.hardware.chars().take(50).collect();
            let serial = item.serial_number.as_deref().unwrap_or("");
            let current = item.current_category.as_deref().unwrap_or("None");
            println!(
                "{:<6} | {:<50} | {:<20} | {}",
                item.device_id, hw_display, serial, current
            );
        }
        if report.unmatched.len() > 50 {
            println!("... and {} more.", report.unmatched.len() - 50);
        }
    }

    Ok(report)
}

// ============================================================================
// TESTS
// ============================================================================
