use std::path::PathBuf;

use rusqlite::Connection;

use cardbookd::db;
use cardbookd::model::{ItemDraft, ItemInput};

/// Unique scratch directory under the system temp dir.
#[allow(dead_code)]
pub fn temp_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        uuid::Uuid::new_v4().simple()
    ));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

#[allow(dead_code)]
pub fn open_db() -> Connection {
    db::open_in_memory().expect("open in-memory db")
}

/// A valid draft for "card #number in Base Set"; tweak fields per test.
#[allow(dead_code)]
pub fn draft(name: &str, number: i64) -> ItemDraft {
    ItemDraft {
        name: Some(name.to_string()),
        game: Some("Pokemon".to_string()),
        set_name: Some("Base Set".to_string()),
        set_code: Some("BS".to_string()),
        number_set: Some(number.to_string()),
        rarity: Some("Common".to_string()),
        condition: Some("NM".to_string()),
        language: Some("EN".to_string()),
        quantity: Some("1".to_string()),
        ..ItemDraft::default()
    }
}

#[allow(dead_code)]
pub fn input(name: &str, number: i64) -> ItemInput {
    draft(name, number).validate().expect("valid draft")
}
