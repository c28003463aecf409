mod test_support;

use cardbookd::catalog::{self, CatalogError};
use cardbookd::model::ItemDraft;
use test_support::{draft, input, open_db};

#[test]
fn same_natural_key_is_rejected_as_duplicate() {
    let conn = open_db();
    let first = catalog::insert_item(&conn, &input("Pikachu", 25)).expect("first insert");

    let err = catalog::insert_item(&conn, &input("Pikachu", 25)).unwrap_err();
    match err {
        CatalogError::DuplicateItem { existing } => assert_eq!(existing.id, first),
        other => panic!("expected DuplicateItem, got {other:?}"),
    }
}

#[test]
fn duplicate_detection_ignores_case_and_variant_spelling() {
    let conn = open_db();
    let mut original = draft("Pikachu", 25);
    original.variant = Some("Holo".to_string());
    let first =
        catalog::insert_item(&conn, &original.validate().unwrap()).expect("first insert");

    let shouted = ItemDraft {
        name: Some("PIKACHU".to_string()),
        game: Some("pokemon".to_string()),
        set_name: Some("base set".to_string()),
        set_code: Some("bs".to_string()),
        variant: Some("holo".to_string()),
        ..draft("Pikachu", 25)
    };
    let err = catalog::insert_item(&conn, &shouted.validate().unwrap()).unwrap_err();
    match err {
        CatalogError::DuplicateItem { existing } => assert_eq!(existing.id, first),
        other => panic!("expected DuplicateItem, got {other:?}"),
    }
}

#[test]
fn absent_and_empty_set_code_collide() {
    let conn = open_db();
    let mut no_code = draft("Pikachu", 25);
    no_code.set_code = None;
    catalog::insert_item(&conn, &no_code.validate().unwrap()).expect("insert");

    let mut blank_code = draft("Pikachu", 25);
    blank_code.set_code = Some("   ".to_string());
    let err = catalog::insert_item(&conn, &blank_code.validate().unwrap()).unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateItem { .. }));
}

#[test]
fn different_condition_or_variant_is_a_distinct_item() {
    let conn = open_db();
    catalog::insert_item(&conn, &input("Pikachu", 25)).expect("insert NM");

    let mut played = draft("Pikachu", 25);
    played.condition = Some("LP".to_string());
    catalog::insert_item(&conn, &played.validate().unwrap()).expect("LP is distinct");

    let mut holo = draft("Pikachu", 25);
    holo.variant = Some("Holo".to_string());
    catalog::insert_item(&conn, &holo.validate().unwrap()).expect("variant is distinct");
}

#[test]
fn edit_excludes_the_item_itself_from_duplicate_checks() {
    let conn = open_db();
    let id = catalog::insert_item(&conn, &input("Pikachu", 25)).expect("insert");

    // Re-saving the same key on the same record is not a collision.
    let mut same = input("Pikachu", 25);
    same.quantity = 7;
    catalog::update_item(&conn, id, &same).expect("self-edit ok");
    assert_eq!(catalog::get_item(&conn, id).unwrap().unwrap().quantity, 7);

    // Moving onto another record's key is.
    let other = catalog::insert_item(&conn, &input("Charmander", 4)).expect("second insert");
    let stolen = input("Pikachu", 25);
    let err = catalog::update_item(&conn, other, &stolen).unwrap_err();
    match err {
        CatalogError::DuplicateItem { existing } => assert_eq!(existing.id, id),
        other => panic!("expected DuplicateItem, got {other:?}"),
    }
}

#[test]
fn unique_index_backstops_a_direct_insert() {
    // Bypass the resolver to prove the storage-level constraint holds.
    let conn = open_db();
    catalog::insert_item(&conn, &input("Pikachu", 25)).expect("insert");
    let direct = conn.execute(
        "INSERT INTO items(name, game, set_name, set_code, number_set, rarity, condition,
                           language, quantity, comercial_condition)
         VALUES('Copy', 'POKEMON', 'BASE SET', 'bs', 25, 'Common', 'NM', 'EN', 1, 'Collection')",
        [],
    );
    assert!(direct.is_err(), "unique index must reject the shadow copy");
}

#[test]
fn updating_a_missing_item_is_not_found() {
    let conn = open_db();
    let err = catalog::update_item(&conn, 999, &input("Ghost", 1)).unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}
