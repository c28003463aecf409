mod test_support;

use cardbookd::catalog::{self, ItemQuery};
use cardbookd::importer::{import_csv, ImportOptions};
use test_support::open_db;

fn names(conn: &rusqlite::Connection) -> Vec<String> {
    catalog::search_all(conn, &ItemQuery::default())
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect()
}

#[test]
fn utf8_bom_is_invisible_to_header_matching() {
    let conn = open_db();
    let text = "\u{feff}name,game,set_name,number_set,rarity,condition,language\n\
                Pikachu,Pokemon,Base Set,25,Common,NM,EN";
    let report = import_csv(&conn, text.as_bytes(), &ImportOptions::default()).unwrap();
    assert_eq!(report.created, 1);
}

#[test]
fn latin1_bytes_round_trip_accents() {
    let conn = open_db();
    let mut bytes =
        b"name,game,set_name,number_set,rarity,condition,language\n".to_vec();
    // "Jos\xe9" and "Educaci\xf3n" are Latin-1, not valid UTF-8.
    bytes.extend_from_slice(b"Jos\xe9,Pokemon,Educaci\xf3n,1,Common,NM,ES");

    let report = import_csv(&conn, &bytes, &ImportOptions::default()).unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(names(&conn), vec!["José".to_string()]);
    let items = catalog::search_all(&conn, &ItemQuery::default()).unwrap();
    assert_eq!(items[0].set_name, "Educación");
}

#[test]
fn semicolon_files_are_sniffed() {
    let conn = open_db();
    let text = "name;game;set_name;number_set;rarity;condition;language\n\
                Pikachu;Pokemon;Base Set;25;Common;NM;EN";
    let report = import_csv(&conn, text.as_bytes(), &ImportOptions::default()).unwrap();
    assert_eq!(report.delimiter, ';');
    assert_eq!(report.created, 1);
}

#[test]
fn tab_files_are_sniffed() {
    let conn = open_db();
    let text = "name\tgame\tset_name\tnumber_set\trarity\tcondition\tlanguage\n\
                Pikachu\tPokemon\tBase Set\t25\tCommon\tNM\tEN";
    let report = import_csv(&conn, text.as_bytes(), &ImportOptions::default()).unwrap();
    assert_eq!(report.delimiter, '\t');
    assert_eq!(report.created, 1);
}

#[test]
fn forced_delimiter_overrides_sniffing() {
    let conn = open_db();
    let text = "name;game;set_name;number_set;rarity;condition;language\n\
                \"Pika, the Mouse\";Pokemon;Base Set;25;Common;NM;EN";
    let opts = ImportOptions {
        delimiter: Some(b';'),
        ..ImportOptions::default()
    };
    let report = import_csv(&conn, text.as_bytes(), &opts).unwrap();
    assert_eq!(report.delimiter, ';');
    assert_eq!(report.created, 1);
    assert_eq!(names(&conn), vec!["Pika, the Mouse".to_string()]);
}

#[test]
fn quoted_fields_keep_embedded_delimiters() {
    let conn = open_db();
    let text = "name,game,set_name,number_set,rarity,condition,language,notes\n\
                \"Pika, the Mouse\",Pokemon,Base Set,25,Common,NM,EN,\"line one\nline two\"";
    let report = import_csv(&conn, text.as_bytes(), &ImportOptions::default()).unwrap();
    assert_eq!(report.created, 1);

    let items = catalog::search_all(&conn, &ItemQuery::default()).unwrap();
    assert_eq!(items[0].name, "Pika, the Mouse");
    assert_eq!(items[0].notes.as_deref(), Some("line one\nline two"));
}
