use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Device record from the inventory
/// Descriptive fields come from the import sheet; `hardware` and
/// `category` are the only fields the admin tools ever rewrite.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Device {
    /// Store-assigned row id (0 until inserted)
    #[serde(skip)]
    pub id: i64,

    #[serde(rename = "Hardware")]
    pub hardware: Option<String>,

    #[serde(rename = "Category")]
    pub category: Option<String>,

    #[serde(rename = "System_Model")]
    pub system_model: Option<String>,

    #[serde(rename = "Processor")]
    pub processor: Option<String>,

    #[serde(rename = "RAM_GB")]
    pub ram_gb: Option<i64>,

    #[serde(rename = "HDD_GB")]
    pub hdd_gb: Option<i64>,

    #[serde(rename = "Serial_Number")]
    pub serial_number: Option<String>,

    #[serde(rename = "Assignee_First_Name")]
    pub assignee_first_name: Option<String>,

    #[serde(rename = "Assignee_Last_Name")]
    pub assignee_last_name: Option<String>,

    #[serde(rename = "Assignee_Email_Address")]
    pub assignee_email_address: Option<String>,

    #[serde(rename = "Source_File")]
    pub source_file: Option<String>,
}

impl Device {
    /// Compute idempotency hash for duplicate detection on import
    /// NOTE: dedup key only, never used as the row's identity
    pub fn compute_idempotency_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}",
            self.serial_number.as_deref().unwrap_or(""),
            self.hardware.as_deref().unwrap_or(""),
            self.system_model.as_deref().unwrap_or(""),
            self.source_file.as_deref().unwrap_or(""),
        ));
        format!("{:x}", hasher.finalize())
    }
}

/// Event for audit trail - every field rewrite is recorded
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Devices Table
    // hardware and category are nullable: sheets arrive with blank cells
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS devices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            idempotency_hash TEXT UNIQUE NOT NULL,
            hardware TEXT,
            category TEXT,
            system_model TEXT,
            processor TEXT,
            ram_gb INTEGER,
            hdd_gb INTEGER,
            serial_number TEXT,
            assignee_first_name TEXT,
            assignee_last_name TEXT,
            assignee_email_address TEXT,
            source_file TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_idempotency_hash ON devices(idempotency_hash)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_serial_number ON devices(serial_number)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<Device>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut devices = Vec::new();

    for result in rdr.deserialize() {
        let device: Device = result.context("Failed to deserialize device row")?;
        devices.push(device);
    }

    Ok(devices)
}

pub fn insert_devices(conn: &Connection, devices: &[Device]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for device in devices {
        let hash = device.compute_idempotency_hash();

        let result = conn.execute(
            "INSERT INTO devices (
                idempotency_hash, hardware, category, system_model, processor,
                ram_gb, hdd_gb, serial_number, assignee_first_name,
                assignee_last_name, assignee_email_address, source_file
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                hash,
                device.hardware,
                device.category,
                device.system_model,
                device.processor,
                device.ram_gb,
                device.hdd_gb,
                device.serial_number,
                device.assignee_first_name,
                device.assignee_last_name,
                device.assignee_email_address,
                device.source_file,
            ],
        );

        match result {
            Ok(_) => {
                inserted += 1;

                // Log event to audit trail
                let event = Event::new(
                    "device_imported",
                    "device",
                    &hash,
                    serde_json::json!({
                        "hardware": device.hardware,
                        "serial_number": device.serial_number,
                        "source_file": device.source_file,
                    }),
                    "csv_importer",
                );
                let _ = insert_event(conn, &event);
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                duplicates += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("✓ Inserted: {} devices", inserted);
    println!("✓ Skipped duplicates: {}", duplicates);

    Ok(inserted)
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

const DEVICE_COLUMNS: &str = "id, hardware, category, system_model, processor, \
     ram_gb, hdd_gb, serial_number, assignee_first_name, \
     assignee_last_name, assignee_email_address, source_file";

fn device_from_row(row: &Row) -> rusqlite::Result<Device> {
    Ok(Device {
        id: row.get(0)?,
        hardware: row.get(1)?,
        category: row.get(2)?,
        system_model: row.get(3)?,
        processor: row.get(4)?,
        ram_gb: row.get(5)?,
        hdd_gb: row.get(6)?,
        serial_number: row.get(7)?,
        assignee_first_name: row.get(8)?,
        assignee_last_name: row.get(9)?,
        assignee_email_address: row.get(10)?,
        source_file: row.get(11)?,
    })
}

pub fn get_all_devices(conn: &Connection) -> Result<Vec<Device>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM devices ORDER BY id",
        DEVICE_COLUMNS
    ))?;

    let devices = stmt
        .query_map([], device_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(devices)
}

/// Find devices whose hardware label contains `needle`, case-insensitive.
/// NULL labels never match. instr() treats the needle as literal text,
/// so '%' and '_' in a search string stay ordinary characters.
pub fn find_devices_by_hardware(conn: &Connection, needle: &str) -> Result<Vec<Device>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM devices
         WHERE hardware IS NOT NULL
           AND instr(lower(hardware), lower(?1)) > 0
         ORDER BY id",
        DEVICE_COLUMNS
    ))?;

    let devices = stmt
        .query_map(params![needle], device_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(devices)
}

/// Persist a new hardware label for one device. Touches no other column.
pub fn update_hardware(conn: &Connection, device_id: i64, new_label: &str) -> Result<()> {
    conn.execute(
        "UPDATE devices SET hardware = ?1 WHERE id = ?2",
        params![new_label, device_id],
    )?;

    Ok(())
}

/// Persist a new category for one device. Touches no other column.
pub fn update_category(conn: &Connection, device_id: i64, category: &str) -> Result<()> {
    conn.execute(
        "UPDATE devices SET category = ?1 WHERE id = ?2",
        params![category, device_id],
    )?;

    Ok(())
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM devices", [], |row| row.get(0))?;

    Ok(count)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Create a test device with the common fields filled
    pub fn create_test_device(hardware: Option<&str>, serial: &str) -> Device {
        Device {
            id: 0,
            hardware: hardware.map(|s| s.to_string()),
            category: None,
            system_model: Some("OptiPlex 3080".to_string()),
            processor: Some("Intel Core i5".to_string()),
            ram_gb: Some(8),
            hdd_gb: Some(256),
            serial_number: Some(serial.to_string()),
            assignee_first_name: Some("Test".to_string()),
            assignee_last_name: Some("User".to_string()),
            assignee_email_address: Some("test.user@example.org".to_string()),
            source_file: Some("test.csv".to_string()),
        }
    }

    pub fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{create_test_device, test_conn};
    use super::*;

    #[test]
    fn test_idempotency_import_twice() {
        let conn = test_conn();

        let devices = vec![
            create_test_device(Some("Systen Unit - Lab PC"), "SN-001"),
            create_test_device(Some("Dell Monitor 24\""), "SN-002"),
            create_test_device(Some("HP LaserJet Pro"), "SN-003"),
        ];

        // First import
        let inserted1 = insert_devices(&conn, &devices).unwrap();
        let count1 = verify_count(&conn).unwrap();

        // Second import (same devices)
        let inserted2 = insert_devices(&conn, &devices).unwrap();
        let count2 = verify_count(&conn).unwrap();

        assert_eq!(inserted1, 3, "First import should insert 3 devices");
        assert_eq!(count1, 3, "Database should have 3 devices after first import");
        assert_eq!(
            inserted2, 0,
            "Second import should insert 0 devices (all duplicates)"
        );
        assert_eq!(
            count2, 3,
            "Database should still have 3 devices after second import"
        );
    }

    #[test]
    fn test_compute_idempotency_hash() {
        let device = create_test_device(Some("Systen Unit"), "SN-100");

        let hash1 = device.compute_idempotency_hash();
        let hash2 = device.compute_idempotency_hash();

        assert_eq!(hash1, hash2, "Same device should produce same hash");
        assert_eq!(hash1.len(), 64, "SHA-256 hash should be 64 hex characters");

        let other = create_test_device(Some("Systen Unit"), "SN-101");
        assert_ne!(
            hash1,
            other.compute_idempotency_hash(),
            "Different serial should produce different hash"
        );
    }

    #[test]
    fn test_hardware_query_is_case_insensitive() {
        let conn = test_conn();

        let devices = vec![
            create_test_device(Some("Systen Unit - Lab PC"), "SN-001"),
            create_test_device(Some("SYSTEN BOARD"), "SN-002"),
            create_test_device(Some("Dell Monitor"), "SN-003"),
            create_test_device(None, "SN-004"),
        ];
        insert_devices(&conn, &devices).unwrap();

        let matches = find_devices_by_hardware(&conn, "systen").unwrap();

        assert_eq!(matches.len(), 2, "Both casings should match, NULL never does");
        assert_eq!(matches[0].hardware.as_deref(), Some("Systen Unit - Lab PC"));
        assert_eq!(matches[1].hardware.as_deref(), Some("SYSTEN BOARD"));
    }

    #[test]
    fn test_hardware_query_treats_wildcards_as_literals() {
        let conn = test_conn();

        let devices = vec![
            create_test_device(Some("UPS 1500VA %load"), "SN-010"),
            create_test_device(Some("UPS 1500VA full load"), "SN-011"),
        ];
        insert_devices(&conn, &devices).unwrap();

        let matches = find_devices_by_hardware(&conn, "%load").unwrap();

        assert_eq!(matches.len(), 1, "'%' must not act as a wildcard");
        assert_eq!(matches[0].serial_number.as_deref(), Some("SN-010"));
    }

    #[test]
    fn test_update_hardware_touches_only_label() {
        let conn = test_conn();

        insert_devices(&conn, &[create_test_device(Some("Systen Unit"), "SN-001")]).unwrap();
        let before = get_all_devices(&conn).unwrap().remove(0);

        update_hardware(&conn, before.id, "System Unit").unwrap();

        let after = get_all_devices(&conn).unwrap().remove(0);
        assert_eq!(after.id, before.id);
        assert_eq!(after.hardware.as_deref(), Some("System Unit"));
        assert_eq!(after.serial_number, before.serial_number);
        assert_eq!(after.system_model, before.system_model);
        assert_eq!(after.category, before.category);
    }

    #[test]
    fn test_event_log() {
        let conn = test_conn();

        let event = Event::new(
            "hardware_corrected",
            "device",
            "42",
            serde_json::json!({"original": "Systen Unit", "corrected": "System Unit"}),
            "label_corrector",
        );

        insert_event(&conn, &event).unwrap();

        let events = get_events_for_entity(&conn, "device", "42").unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "hardware_corrected");
        assert_eq!(events[0].actor, "label_corrector");
        assert_eq!(events[0].data["corrected"], "System Unit");
    }
}
