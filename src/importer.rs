use std::collections::HashMap;

use rusqlite::Connection;
use thiserror::Error;

use crate::catalog::{self, CatalogError};
use crate::model::ItemDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DupPolicy {
    Skip,
    Merge,
    Overwrite,
}

impl DupPolicy {
    pub fn parse(input: &str) -> Option<DupPolicy> {
        match input.trim().to_ascii_lowercase().as_str() {
            "skip" => Some(DupPolicy::Skip),
            "merge" => Some(DupPolicy::Merge),
            "overwrite" => Some(DupPolicy::Overwrite),
            _ => None,
        }
    }
}

impl Default for DupPolicy {
    fn default() -> Self {
        DupPolicy::Merge
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub policy: DupPolicy,
    pub create_missing_tags: bool,
    /// Forced delimiter; sniffed from the text when unset.
    pub delimiter: Option<u8>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            policy: DupPolicy::Merge,
            create_missing_tags: true,
            delimiter: None,
        }
    }
}

#[derive(Debug, Default, serde::Serialize)]
pub struct ImportReport {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub total: u64,
    pub messages: Vec<String>,
    pub delimiter: char,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("unreadable csv: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

// ---------------------------------------------------------------------------
// Text decoding and delimiter sniffing

/// Decode upload bytes, never failing on encoding grounds: UTF-8 first
/// (BOM-tolerant), Latin-1 as the fallback.
pub fn decode_text(bytes: &[u8]) -> (String, &'static str) {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), "utf-8"),
        Err(_) => (bytes.iter().map(|&b| b as char).collect(), "latin-1"),
    }
}

/// Pick the most frequent of comma/semicolon/tab on the header line.
pub fn sniff_delimiter(text: &str) -> Option<u8> {
    let line = text.lines().find(|l| !l.trim().is_empty())?;
    let candidates = [b',', b';', b'\t'];
    let best = candidates
        .into_iter()
        .map(|d| (line.bytes().filter(|&b| b == d).count(), d))
        .max_by_key(|&(count, _)| count)?;
    if best.0 == 0 {
        None
    } else {
        Some(best.1)
    }
}

// ---------------------------------------------------------------------------
// Header resolution

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Name,
    Game,
    SetName,
    SetCode,
    NumberSet,
    Rarity,
    Condition,
    Language,
    Quantity,
    Location,
    ComercialCondition,
    Variant,
    Notes,
    Tags,
}

const ALL_FIELDS: [Field; 14] = [
    Field::Name,
    Field::Game,
    Field::SetName,
    Field::SetCode,
    Field::NumberSet,
    Field::Rarity,
    Field::Condition,
    Field::Language,
    Field::Quantity,
    Field::Location,
    Field::ComercialCondition,
    Field::Variant,
    Field::Notes,
    Field::Tags,
];

const REQUIRED_FIELDS: [Field; 7] = [
    Field::Name,
    Field::Game,
    Field::SetName,
    Field::NumberSet,
    Field::Rarity,
    Field::Condition,
    Field::Language,
];

impl Field {
    fn canonical(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Game => "game",
            Field::SetName => "set_name",
            Field::SetCode => "set_code",
            Field::NumberSet => "number_set",
            Field::Rarity => "rarity",
            Field::Condition => "condition",
            Field::Language => "language",
            Field::Quantity => "quantity",
            Field::Location => "location",
            Field::ComercialCondition => "comercial_condition",
            Field::Variant => "variant",
            Field::Notes => "notes",
            Field::Tags => "tags",
        }
    }

    /// Recognized header synonyms, already folded (lowercase, underscores).
    fn synonyms(self) -> &'static [&'static str] {
        match self {
            Field::Name => &["card_name", "card", "nombre", "title"],
            Field::Game => &["juego", "tcg"],
            Field::SetName => &["set", "edition", "edicion", "expansion"],
            Field::SetCode => &["code", "codigo"],
            Field::NumberSet => &["number", "card_number", "collector_number", "numero", "no"],
            Field::Rarity => &["rareza"],
            Field::Condition => &["cond", "condicion", "grade"],
            Field::Language => &["lang", "idioma"],
            Field::Quantity => &["qty", "cantidad", "stock", "count"],
            Field::Location => &["ubicacion", "storage", "box"],
            Field::ComercialCondition => &["commercial_condition", "status", "estado"],
            Field::Variant => &["finish", "foil", "variante"],
            Field::Notes => &["notas", "comment", "comments", "description"],
            Field::Tags => &["etiquetas", "labels"],
        }
    }
}

fn fold_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Map each canonical field to a column index: exact case-insensitive match
/// first, then the synonym table. Rejects the whole import up front when a
/// required field has no column.
fn resolve_headers(headers: &csv::StringRecord) -> Result<HashMap<Field, usize>, Vec<String>> {
    let folded: Vec<String> = headers.iter().map(fold_header).collect();

    let mut columns = HashMap::new();
    for field in ALL_FIELDS {
        let exact = folded.iter().position(|h| h == field.canonical());
        let index = exact.or_else(|| {
            folded
                .iter()
                .position(|h| field.synonyms().contains(&h.as_str()))
        });
        if let Some(i) = index {
            columns.insert(field, i);
        }
    }

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|f| !columns.contains_key(f))
        .map(|f| f.canonical().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(missing);
    }
    Ok(columns)
}

// ---------------------------------------------------------------------------
// Row processing

enum RowOutcome {
    Created,
    Updated,
    Skipped(String),
}

fn cell<'a>(
    record: &'a csv::StringRecord,
    columns: &HashMap<Field, usize>,
    field: Field,
) -> Option<&'a str> {
    columns.get(&field).and_then(|&i| record.get(i))
}

fn draft_from_record(record: &csv::StringRecord, columns: &HashMap<Field, usize>) -> ItemDraft {
    let take = |field| cell(record, columns, field).map(str::to_string);
    ItemDraft {
        name: take(Field::Name),
        game: take(Field::Game),
        set_name: take(Field::SetName),
        set_code: take(Field::SetCode),
        number_set: take(Field::NumberSet),
        rarity: take(Field::Rarity),
        condition: take(Field::Condition),
        language: take(Field::Language),
        quantity: take(Field::Quantity),
        location: take(Field::Location),
        comercial_condition: take(Field::ComercialCondition),
        variant: take(Field::Variant),
        notes: take(Field::Notes),
    }
}

/// One row, one transaction: the item write and its tag associations commit
/// together, independently of every other row.
fn import_row(
    conn: &Connection,
    record: &csv::StringRecord,
    columns: &HashMap<Field, usize>,
    opts: &ImportOptions,
) -> Result<RowOutcome, CatalogError> {
    let input = match draft_from_record(record, columns).validate() {
        Ok(input) => input,
        Err(errors) => return Ok(RowOutcome::Skipped(errors.join(" "))),
    };

    let tx = conn.unchecked_transaction()?;

    let (item_id, outcome) = match catalog::find_duplicate(&tx, &input, None)? {
        None => {
            let id = match catalog::insert_item(&tx, &input) {
                Ok(id) => id,
                // Lost a race between resolver and insert; report as a skip.
                Err(CatalogError::DuplicateItem { existing }) => {
                    return Ok(RowOutcome::Skipped(format!(
                        "duplicate of existing item {}",
                        existing.id
                    )))
                }
                Err(e) => return Err(e),
            };
            (id, RowOutcome::Created)
        }
        Some(existing) => match opts.policy {
            DupPolicy::Skip => {
                return Ok(RowOutcome::Skipped(format!(
                    "duplicate of existing item {} (policy skip)",
                    existing.id
                )))
            }
            DupPolicy::Merge => {
                catalog::merge_add_quantity(&tx, existing.id, input.quantity)?;
                (existing.id, RowOutcome::Updated)
            }
            DupPolicy::Overwrite => {
                catalog::update_item(&tx, existing.id, &input)?;
                (existing.id, RowOutcome::Updated)
            }
        },
    };

    if let Some(raw_tags) = cell(record, columns, Field::Tags) {
        for token in raw_tags.split([',', ';']) {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let tag_id = if opts.create_missing_tags {
                catalog::find_or_create_tag(&tx, token)?
            } else {
                let existing: Option<i64> = {
                    use rusqlite::OptionalExtension;
                    tx.query_row("SELECT id FROM tags WHERE name = ?", [token], |r| r.get(0))
                        .optional()?
                };
                match existing {
                    Some(id) => id,
                    None => continue,
                }
            };
            tx.execute(
                "INSERT OR IGNORE INTO item_tags(item_id, tag_id) VALUES(?, ?)",
                rusqlite::params![item_id, tag_id],
            )?;
        }
    }

    tx.commit()?;
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Batch driver

pub fn import_csv(
    conn: &Connection,
    bytes: &[u8],
    opts: &ImportOptions,
) -> Result<ImportReport, ImportError> {
    let (text, encoding) = decode_text(bytes);
    let delimiter = opts
        .delimiter
        .or_else(|| sniff_delimiter(&text))
        .unwrap_or(b',');
    tracing::debug!(encoding, delimiter = %(delimiter as char), "decoded csv upload");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let columns = resolve_headers(&headers).map_err(ImportError::MissingColumns)?;

    let mut report = ImportReport {
        delimiter: delimiter as char,
        ..ImportReport::default()
    };

    // Rows are isolated: one bad row never aborts the rest of the batch.
    for (idx, record) in reader.records().enumerate() {
        let line = idx + 2; // header row is line 1
        report.total += 1;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                report.skipped += 1;
                report.messages.push(format!("line {line}: {e}"));
                continue;
            }
        };
        match import_row(conn, &record, &columns, opts) {
            Ok(RowOutcome::Created) => report.created += 1,
            Ok(RowOutcome::Updated) => report.updated += 1,
            Ok(RowOutcome::Skipped(reason)) => {
                report.skipped += 1;
                report.messages.push(format!("line {line}: {reason}"));
            }
            Err(e) => {
                tracing::debug!(line, error = %e, "import row failed");
                report.skipped += 1;
                report.messages.push(format!("line {line}: {e}"));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_prefers_utf8_and_strips_bom() {
        let (text, enc) = decode_text("\u{feff}name,game\n".as_bytes());
        assert_eq!(enc, "utf-8");
        assert_eq!(text, "name,game\n");
    }

    #[test]
    fn decode_falls_back_to_latin1() {
        // "Jos\xe9" is invalid UTF-8 but valid Latin-1.
        let (text, enc) = decode_text(b"Jos\xe9");
        assert_eq!(enc, "latin-1");
        assert_eq!(text, "José");
    }

    #[test]
    fn sniffs_common_delimiters() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3"), Some(b','));
        assert_eq!(sniff_delimiter("a;b;c"), Some(b';'));
        assert_eq!(sniff_delimiter("a\tb\tc"), Some(b'\t'));
        assert_eq!(sniff_delimiter("single-column"), None);
        assert_eq!(sniff_delimiter(""), None);
    }

    #[test]
    fn header_resolution_uses_synonyms() {
        let headers = csv::StringRecord::from(vec![
            "Nombre", "Juego", "Set", "Numero", "Rareza", "Cond", "Idioma", "Cantidad",
        ]);
        let columns = resolve_headers(&headers).expect("all required resolved");
        assert_eq!(columns[&Field::Name], 0);
        assert_eq!(columns[&Field::SetName], 2);
        assert_eq!(columns[&Field::NumberSet], 3);
        assert_eq!(columns[&Field::Quantity], 7);
        assert!(!columns.contains_key(&Field::Tags));
    }

    #[test]
    fn header_resolution_reports_missing_required() {
        let headers = csv::StringRecord::from(vec!["name", "game", "set_name"]);
        let missing = resolve_headers(&headers).unwrap_err();
        assert_eq!(
            missing,
            vec!["number_set", "rarity", "condition", "language"]
        );
    }

    #[test]
    fn exact_match_wins_over_synonym() {
        // "no" is a synonym for number_set but an exact "number_set" column
        // elsewhere must take precedence.
        let headers = csv::StringRecord::from(vec![
            "no", "number_set", "name", "game", "set_name", "rarity", "condition", "language",
        ]);
        let columns = resolve_headers(&headers).expect("resolved");
        assert_eq!(columns[&Field::NumberSet], 1);
    }

    #[test]
    fn policy_parse_is_case_insensitive() {
        assert_eq!(DupPolicy::parse("SKIP"), Some(DupPolicy::Skip));
        assert_eq!(DupPolicy::parse(" merge "), Some(DupPolicy::Merge));
        assert_eq!(DupPolicy::parse("overwrite"), Some(DupPolicy::Overwrite));
        assert_eq!(DupPolicy::parse("upsert"), None);
    }
}
