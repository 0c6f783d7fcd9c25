// 🔎 Hardware Label Corrector - find-and-fix misspelled hardware names
// One pass per rule: query candidates case-insensitively, rewrite
// literally, persist only when the label actually changed

use anyhow::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{self, Event};
use crate::rules::CorrectionRule;

// ============================================================================
// CHANGE ENTRY
// ============================================================================

/// One persisted label rewrite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub device_id: i64,
    pub original: String,
    pub corrected: String,
}

// ============================================================================
// RULE OUTCOME
// ============================================================================

/// Per-rule result. `matched` counts candidate rows from the
/// case-insensitive query; `changed` counts rows actually persisted.
/// matched > changed happens when a candidate's occurrences differ in
/// case from the literal search string - the row is reported, not
/// rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub search: String,
    pub replace: String,
    pub matched: usize,
    pub changed: usize,
}

// ============================================================================
// CORRECTION REPORT
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrectionReport {
    /// One outcome per supplied rule, in application order
    pub outcomes: Vec<RuleOutcome>,

    /// Every persisted change, in the order it was applied
    pub changes: Vec<ChangeEntry>,
}

impl CorrectionReport {
    pub fn total_matched(&self) -> usize {
        self.outcomes.iter().map(|o| o.matched).sum()
    }

    pub fn total_changed(&self) -> usize {
        self.changes.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rules processed, {} candidates, {} labels corrected",
            self.outcomes.len(),
            self.total_matched(),
            self.total_changed()
        )
    }
}

// ============================================================================
// CORRECTION PASS
// ============================================================================

/// Apply correction rules to the device store, one full pass per rule.
///
/// Per rule: query all devices whose hardware label contains `search`
/// (case-insensitive), then for each candidate replace every literal
/// occurrence of `search` with `replace` and persist the label only if
/// the rewrite changed it. Store failures propagate and abort the run;
/// re-running is safe because a corrected label no longer contains the
/// literal search string.
pub fn apply_corrections(
    conn: &Connection,
    rules: &[CorrectionRule],
) -> Result<CorrectionReport> {
    let mut report = CorrectionReport::default();

    for rule in rules {
        // Empty search would candidate-match the whole table; refuse it
        if rule.search.is_empty() {
            println!("⚠️  Skipping rule with empty search substring");
            report.outcomes.push(RuleOutcome {
                search: rule.search.clone(),
                replace: rule.replace.clone(),
                matched: 0,
                changed: 0,
            });
            continue;
        }

        let candidates = db::find_devices_by_hardware(conn, &rule.search)?;

        if candidates.is_empty() {
            println!("✓ No devices matching '{}'", rule.search);
            report.outcomes.push(RuleOutcome {
                search: rule.search.clone(),
                replace: rule.replace.clone(),
                matched: 0,
                changed: 0,
            });
            continue;
        }

        println!(
            "✓ Found {} devices matching '{}'",
            candidates.len(),
            rule.search
        );

        let mut changed = 0;

        for device in &candidates {
            // Blank cells: nothing to rewrite
            let label = match device.hardware.as_deref() {
                Some(l) if !l.is_empty() => l,
                _ => continue,
            };

            let corrected = rule.apply(label);

            // Case-insensitive candidate whose literal occurrences differ
            // in case: the rewrite found nothing, leave the row alone
            if corrected == label {
                continue;
            }

            db::update_hardware(conn, device.id, &corrected)?;

            let event = Event::new(
                "hardware_corrected",
                "device",
                &device.id.to_string(),
                serde_json::json!({
                    "original": label,
                    "corrected": corrected,
                    "search": rule.search,
                    "replace": rule.replace,
                }),
                "label_corrector",
            );
            db::insert_event(conn, &event)?;

            println!("  {} → {}", label, corrected);

            report.changes.push(ChangeEntry {
                device_id: device.id,
                original: label.to_string(),
                corrected,
            });
            changed += 1;
        }

        report.outcomes.push(RuleOutcome {
            search: rule.search.clone(),
            replace: rule.replace.clone(),
            matched: candidates.len(),
            changed,
        });
    }

    println!("✅ Hardware label correction complete");

    Ok(report)
}

// ============================================================================
// TESTS
// ============================================================================
