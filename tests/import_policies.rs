mod test_support;

use cardbookd::catalog::{self, ItemQuery};
use cardbookd::importer::{import_csv, DupPolicy, ImportOptions};
use test_support::open_db;

const HEADER: &str = "name,game,set_name,set_code,number_set,rarity,condition,language,quantity";
const PIKACHU: &str = "Pikachu,Pokemon,Base Set,BS,25,Common,NM,EN,2";

fn csv(rows: &[&str]) -> Vec<u8> {
    let mut text = String::from(HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.into_bytes()
}

fn options(policy: DupPolicy) -> ImportOptions {
    ImportOptions {
        policy,
        ..ImportOptions::default()
    }
}

fn all_items(conn: &rusqlite::Connection) -> Vec<cardbookd::model::ItemRecord> {
    catalog::search_all(conn, &ItemQuery::default()).unwrap()
}

#[test]
fn merge_adds_quantities_instead_of_duplicating() {
    let conn = open_db();

    let first = import_csv(&conn, &csv(&[PIKACHU]), &options(DupPolicy::Merge)).unwrap();
    assert_eq!(first.created, 1);
    assert_eq!(first.updated, 0);

    let second = import_csv(&conn, &csv(&[PIKACHU]), &options(DupPolicy::Merge)).unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 1);
    assert_eq!(second.skipped, 0);

    let items = all_items(&conn);
    assert_eq!(items.len(), 1, "merge must not create a second record");
    assert_eq!(items[0].quantity, 4);
}

#[test]
fn merge_leaves_other_fields_untouched() {
    let conn = open_db();
    import_csv(&conn, &csv(&[PIKACHU]), &options(DupPolicy::Merge)).unwrap();

    // Same natural key, different name/location; merge only touches quantity.
    let variant_row = "Pika,Pokemon,Base Set,BS,25,Common,NM,EN,1,Shelf 9";
    let text = format!("{HEADER},location\n{variant_row}");
    import_csv(&conn, text.as_bytes(), &options(DupPolicy::Merge)).unwrap();

    let items = all_items(&conn);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Pikachu");
    assert_eq!(items[0].location, None);
    assert_eq!(items[0].quantity, 3);
}

#[test]
fn skip_leaves_state_untouched_and_counts() {
    let conn = open_db();
    import_csv(&conn, &csv(&[PIKACHU]), &options(DupPolicy::Skip)).unwrap();

    let duplicate = "PIKACHU,pokemon,base set,bs,25,Common,NM,EN,9";
    let report = import_csv(&conn, &csv(&[duplicate]), &options(DupPolicy::Skip)).unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.messages.len(), 1);
    assert!(report.messages[0].starts_with("line 2:"));

    let items = all_items(&conn);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Pikachu");
    assert_eq!(items[0].quantity, 2);
}

#[test]
fn overwrite_replaces_mutable_fields() {
    let conn = open_db();
    import_csv(&conn, &csv(&[PIKACHU]), &options(DupPolicy::Overwrite)).unwrap();
    let original_id = all_items(&conn)[0].id;

    let replacement = "Pikachu (1st),Pokemon,Base Set,BS,25,Rare,NM,EN,7";
    let report = import_csv(&conn, &csv(&[replacement]), &options(DupPolicy::Overwrite)).unwrap();
    assert_eq!(report.updated, 1);

    let items = all_items(&conn);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, original_id, "overwrite keeps the record");
    assert_eq!(items[0].name, "Pikachu (1st)");
    assert_eq!(items[0].quantity, 7);
    assert_eq!(items[0].rarity, cardbookd::model::Rarity::Rare);
}

#[test]
fn default_policy_is_merge_and_default_creates_tags() {
    let opts = ImportOptions::default();
    assert_eq!(opts.policy, DupPolicy::Merge);
    assert!(opts.create_missing_tags);
}
