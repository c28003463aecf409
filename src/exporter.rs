use std::io::Write;

use rusqlite::Connection;
use thiserror::Error;

use crate::catalog::{self, CatalogError, ItemQuery};
use crate::model::ItemRecord;

/// Canonical column order, shared by export and the sample file. The import
/// header resolver recognizes these names exactly.
pub const CANONICAL_HEADER: [&str; 14] = [
    "name",
    "game",
    "set_name",
    "set_code",
    "number_set",
    "rarity",
    "condition",
    "language",
    "quantity",
    "location",
    "comercial_condition",
    "variant",
    "notes",
    "tags",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
}

fn item_record_row(item: &ItemRecord, tags: &[String]) -> Vec<String> {
    vec![
        item.name.clone(),
        item.game.clone(),
        item.set_name.clone(),
        item.set_code.clone().unwrap_or_default(),
        item.number_set.to_string(),
        item.rarity.as_str().to_string(),
        item.condition.as_str().to_string(),
        item.language.as_str().to_string(),
        item.quantity.to_string(),
        item.location.clone().unwrap_or_default(),
        item.comercial_condition.as_str().to_string(),
        item.variant.clone().unwrap_or_default(),
        item.notes.clone().unwrap_or_default(),
        // Semicolon-joined so the tags cell survives a comma-delimited file
        // unquoted; the importer splits on either.
        tags.join(";"),
    ]
}

/// Stream the items matching `query` (pagination ignored) as CSV, one row
/// flushed at a time.
pub fn export_csv<W: Write>(
    conn: &Connection,
    query: &ItemQuery,
    out: W,
) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CANONICAL_HEADER)?;

    for item in catalog::search_all(conn, query)? {
        let tags: Vec<String> = catalog::tags_for_item(conn, item.id)
            .map_err(CatalogError::from)?
            .into_iter()
            .map(|t| t.name)
            .collect();
        writer.write_record(item_record_row(&item, &tags))?;
        writer.flush().map_err(csv::Error::from)?;
    }
    Ok(())
}

/// Static one-row example with the canonical header.
pub fn sample_csv() -> String {
    let mut out = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut out);
        writer
            .write_record(CANONICAL_HEADER)
            .expect("write sample header");
        writer
            .write_record([
                "Pikachu",
                "Pokemon",
                "Base Set",
                "BS",
                "25",
                "Common",
                "NM",
                "EN",
                "1",
                "Binder A",
                "Collection",
                "Holo",
                "First print run",
                "starters;favorites",
            ])
            .expect("write sample row");
        writer.flush().expect("flush sample");
    }
    String::from_utf8(out).expect("sample is utf-8")
}
