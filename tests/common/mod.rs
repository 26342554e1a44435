#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use rust_decimal_macros::dec;
use tempfile::TempDir;
use tto_core::MemoryStorage;
use tto_ledger::{Config, FixedClock, Money, OfficeManager, ProjectTerms};
use uuid::Uuid;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn fixed_clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2024, 6, 14, 10, 0, 0).unwrap())
}

/// In-memory office with a pinned clock.
pub fn memory_office() -> OfficeManager {
    OfficeManager::new(
        Box::new(MemoryStorage::new()),
        Arc::new(fixed_clock()),
        Config::default(),
    )
}

/// Config whose data root points at a fresh temporary directory.
pub fn temp_config() -> Config {
    let temp = TempDir::new().expect("create temp dir");
    let mut config = Config::default();
    config.data_root = Some(temp.path().join("office"));
    config.backup_retention = 3;
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    config
}

pub fn terms(budget: Money) -> ProjectTerms {
    ProjectTerms {
        budget,
        company_rate: dec!(10),
        vat_rate: dec!(18),
        withholding_tax_rate: None,
    }
}

/// Creates a referee-approved project and returns its id.
pub fn approved_project(office: &OfficeManager, budget: Money) -> Uuid {
    let project = office
        .create_project("Sensor licensing", terms(budget))
        .expect("create project");
    office.approve_referee(project.id).expect("approve referee");
    project.id
}
