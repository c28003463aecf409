mod test_support;

use cardbookd::catalog::{self, ItemQuery};
use cardbookd::exporter::{export_csv, sample_csv, CANONICAL_HEADER};
use cardbookd::importer::{import_csv, ImportOptions};
use test_support::{draft, open_db};

fn export_string(conn: &rusqlite::Connection, query: &ItemQuery) -> String {
    let mut out = Vec::new();
    export_csv(conn, query, &mut out).expect("export");
    String::from_utf8(out).expect("utf-8 export")
}

#[test]
fn header_row_is_canonical() {
    let conn = open_db();
    let text = export_string(&conn, &ItemQuery::default());
    let header = text.lines().next().expect("header line");
    assert_eq!(header, CANONICAL_HEADER.join(","));
}

#[test]
fn export_honors_the_active_filters() {
    let conn = open_db();
    for (name, number, game) in [
        ("Pikachu", 25, "Pokemon"),
        ("Charizard", 4, "Pokemon"),
        ("Black Lotus", 232, "Magic"),
    ] {
        let mut d = draft(name, number);
        d.game = Some(game.to_string());
        catalog::insert_item(&conn, &d.validate().unwrap()).unwrap();
    }

    let query = ItemQuery {
        game: Some("Magic".to_string()),
        ..ItemQuery::default()
    };
    let text = export_string(&conn, &query);
    let rows: Vec<&str> = text.lines().skip(1).collect();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("Black Lotus,Magic,"));
}

#[test]
fn export_ignores_pagination() {
    let conn = open_db();
    for n in 1..=8 {
        let d = draft(&format!("Card {n}"), n);
        catalog::insert_item(&conn, &d.validate().unwrap()).unwrap();
    }
    let query = ItemQuery {
        page: 2,
        size: 5,
        ..ItemQuery::default()
    };
    let text = export_string(&conn, &query);
    assert_eq!(text.lines().skip(1).count(), 8);
}

#[test]
fn tags_cell_joins_with_semicolons_and_reimports() {
    let conn = open_db();
    let d = draft("Pikachu", 25);
    let id = catalog::insert_item(&conn, &d.validate().unwrap()).unwrap();
    for name in ["starters", "favorites"] {
        let tag = catalog::find_or_create_tag(&conn, name).unwrap();
        catalog::attach_tag(&conn, id, tag).unwrap();
    }

    let text = export_string(&conn, &ItemQuery::default());
    let row = text.lines().nth(1).expect("data row");
    assert!(row.ends_with(",favorites;starters"));

    // The export is importable as-is, tags included.
    let other = open_db();
    let report = import_csv(&other, text.as_bytes(), &ImportOptions::default()).unwrap();
    assert_eq!(report.created, 1);
    let imported = catalog::search_all(&other, &ItemQuery::default()).unwrap();
    let tags = catalog::tags_for_item(&other, imported[0].id).unwrap();
    assert_eq!(tags.len(), 2);
}

#[test]
fn optional_fields_export_as_empty_cells() {
    let conn = open_db();
    let mut d = draft("Pikachu", 25);
    d.set_code = None;
    catalog::insert_item(&conn, &d.validate().unwrap()).unwrap();

    let text = export_string(&conn, &ItemQuery::default());
    let row = text.lines().nth(1).expect("data row");
    assert_eq!(row, "Pikachu,Pokemon,Base Set,,25,Common,NM,EN,1,,Collection,,,");
}

#[test]
fn sample_file_is_importable() {
    let conn = open_db();
    let sample = sample_csv();
    assert!(sample.starts_with(&CANONICAL_HEADER.join(",")));

    let report = import_csv(&conn, sample.as_bytes(), &ImportOptions::default()).unwrap();
    assert_eq!(report.created, 1);

    let items = catalog::search_all(&conn, &ItemQuery::default()).unwrap();
    assert_eq!(items[0].name, "Pikachu");
    assert_eq!(items[0].location.as_deref(), Some("Binder A"));
    let tags = catalog::tags_for_item(&conn, items[0].id).unwrap();
    assert_eq!(tags.len(), 2);
}
