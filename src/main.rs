use anyhow::{Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::Path;

// Use library instead of local modules
use inventory_correction::{
    apply_corrections, categorize_devices, default_category_rules,
    get_events_for_entity, insert_devices, load_csv, setup_database,
    verify_count, RuleSet,
};

/// Hardware label fixes, in application order. The only behavior knob of
/// the correction run: edit this list, re-run, done.
const HARDWARE_LABEL_FIXES: &[(&str, &str)] = &[("Systen", "System")];

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let csv_path = args
                .get(2)
                .context("Usage: inventory-correction import <devices.csv>")?;
            run_import(Path::new(csv_path))?;
        }
        Some("categorize") => run_categorize()?,
        Some("events") => {
            let device_id = args
                .get(2)
                .context("Usage: inventory-correction events <device-id>")?;
            run_events(device_id)?;
        }
        // Correction mode (default)
        _ => run_corrections()?,
    }

    Ok(())
}

fn db_path() -> String {
    env::var("INVENTORY_DB").unwrap_or_else(|_| "inventory.db".to_string())
}

fn open_database() -> Result<Connection> {
    let path = db_path();
    let conn = Connection::open(&path)
        .with_context(|| format!("Failed to open database: {}", path))?;
    setup_database(&conn)?;

    Ok(conn)
}

fn run_corrections() -> Result<()> {
    println!("🔎 Hardware Label Correction");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let conn = open_database()?;
    let rules = RuleSet::from_pairs(HARDWARE_LABEL_FIXES);

    println!("\n🔧 Applying {} rules...\n", rules.rule_count());
    let report = apply_corrections(&conn, rules.rules())?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ {}", report.summary());

    Ok(())
}

fn run_import(csv_path: &Path) -> Result<()> {
    println!("🗄️  Device Import - CSV → SQLite + WAL");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load CSV
    println!("\n📂 Loading CSV...");
    let devices = load_csv(csv_path)?;
    println!("✓ Loaded {} devices from CSV", devices.len());

    // 2. Setup database
    println!("\n🔧 Setting up database...");
    let conn = open_database()?;
    println!("✓ Database initialized with WAL mode");

    // 3. Insert devices
    println!("\n💾 Inserting devices...");
    insert_devices(&conn, &devices)?;

    // 4. Verify count
    println!("\n🔍 Verifying database...");
    let count = verify_count(&conn)?;
    println!("✓ Database contains {} devices", count);

    Ok(())
}

fn run_categorize() -> Result<()> {
    println!("🗂️  Device Auto-Categorization");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let conn = open_database()?;
    let report = categorize_devices(&conn, &default_category_rules())?;

    println!("\n✅ {}", report.summary());

    Ok(())
}

fn run_events(device_id: &str) -> Result<()> {
    let conn = open_database()?;
    let events = get_events_for_entity(&conn, "device", device_id)?;

    if events.is_empty() {
        println!("✓ No recorded events for device {}", device_id);
        return Ok(());
    }

    println!("📋 Events for device {}:", device_id);
    for event in &events {
        println!(
            "  {} {} {}",
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.data
        );
    }

    Ok(())
}
