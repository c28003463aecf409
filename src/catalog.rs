use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::model::{
    ComercialCondition, Condition, ItemInput, ItemRecord, Language, Rarity, TagRecord,
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{}", .0.join(" "))]
    Validation(Vec<String>),
    #[error("there is already a card with the same key (existing id {})", .existing.id)]
    DuplicateItem { existing: Box<ItemRecord> },
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

const ITEM_COLUMNS: &str = "i.id, i.name, i.game, i.set_name, i.set_code, i.number_set, \
     i.rarity, i.condition, i.language, i.quantity, i.location, i.comercial_condition, \
     i.variant, i.notes, i.image_path";

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<ItemRecord> {
    Ok(ItemRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        game: row.get(2)?,
        set_name: row.get(3)?,
        set_code: row.get(4)?,
        number_set: row.get(5)?,
        rarity: row.get(6)?,
        condition: row.get(7)?,
        language: row.get(8)?,
        quantity: row.get(9)?,
        location: row.get(10)?,
        comercial_condition: row.get(11)?,
        variant: row.get(12)?,
        notes: row.get(13)?,
        image_path: row.get(14)?,
    })
}

// ---------------------------------------------------------------------------
// Duplicate resolver

/// Find the existing item colliding with `input` under the case-insensitive
/// natural key, if any. Pure read; `exclude_id` lets the edit path ignore the
/// record being edited.
pub fn find_duplicate(
    conn: &Connection,
    input: &ItemInput,
    exclude_id: Option<i64>,
) -> rusqlite::Result<Option<ItemRecord>> {
    let mut sql = format!(
        "SELECT {ITEM_COLUMNS} FROM items i
         WHERE lower(i.game) = lower(?)
           AND lower(coalesce(i.set_code, '')) = lower(?)
           AND lower(i.set_name) = lower(?)
           AND i.number_set = ?
           AND i.language = ?
           AND i.condition = ?
           AND lower(coalesce(i.variant, '')) = lower(?)"
    );
    let mut binds: Vec<Value> = vec![
        Value::Text(input.game.trim().to_string()),
        Value::Text(input.set_code.as_deref().unwrap_or("").trim().to_string()),
        Value::Text(input.set_name.trim().to_string()),
        Value::Integer(input.number_set),
        Value::Text(input.language.as_str().to_string()),
        Value::Text(input.condition.as_str().to_string()),
        Value::Text(input.variant.as_deref().unwrap_or("").trim().to_string()),
    ];
    if let Some(id) = exclude_id {
        sql.push_str(" AND i.id <> ?");
        binds.push(Value::Integer(id));
    }
    conn.query_row(&sql, params_from_iter(binds), row_to_item)
        .optional()
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// ---------------------------------------------------------------------------
// Item CRUD

pub fn insert_item(conn: &Connection, input: &ItemInput) -> Result<i64> {
    // Friendly conflict before attempting the write.
    if let Some(existing) = find_duplicate(conn, input, None)? {
        return Err(CatalogError::DuplicateItem {
            existing: Box::new(existing),
        });
    }

    let inserted = conn.execute(
        "INSERT INTO items(name, game, set_name, set_code, number_set, rarity, condition,
                           language, quantity, location, comercial_condition, variant, notes)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            input.name,
            input.game,
            input.set_name,
            input.set_code,
            input.number_set,
            input.rarity,
            input.condition,
            input.language,
            input.quantity,
            input.location,
            input.comercial_condition,
            input.variant,
            input.notes,
        ],
    );
    match inserted {
        Ok(_) => Ok(conn.last_insert_rowid()),
        // Safety net for a racing writer: the unique index caught the
        // collision, so re-run the resolver to report which record won.
        Err(e) if is_constraint_violation(&e) => match find_duplicate(conn, input, None)? {
            Some(existing) => Err(CatalogError::DuplicateItem {
                existing: Box::new(existing),
            }),
            None => Err(CatalogError::Db(e)),
        },
        Err(e) => Err(CatalogError::Db(e)),
    }
}

pub fn get_item(conn: &Connection, id: i64) -> rusqlite::Result<Option<ItemRecord>> {
    conn.query_row(
        &format!("SELECT {ITEM_COLUMNS} FROM items i WHERE i.id = ?"),
        [id],
        row_to_item,
    )
    .optional()
}

pub fn update_item(conn: &Connection, id: i64, input: &ItemInput) -> Result<()> {
    if get_item(conn, id)?.is_none() {
        return Err(CatalogError::NotFound("item"));
    }
    if let Some(existing) = find_duplicate(conn, input, Some(id))? {
        return Err(CatalogError::DuplicateItem {
            existing: Box::new(existing),
        });
    }

    let updated = conn.execute(
        "UPDATE items SET name = ?, game = ?, set_name = ?, set_code = ?, number_set = ?,
                          rarity = ?, condition = ?, language = ?, quantity = ?, location = ?,
                          comercial_condition = ?, variant = ?, notes = ?
         WHERE id = ?",
        rusqlite::params![
            input.name,
            input.game,
            input.set_name,
            input.set_code,
            input.number_set,
            input.rarity,
            input.condition,
            input.language,
            input.quantity,
            input.location,
            input.comercial_condition,
            input.variant,
            input.notes,
            id,
        ],
    );
    match updated {
        Ok(_) => Ok(()),
        Err(e) if is_constraint_violation(&e) => match find_duplicate(conn, input, Some(id))? {
            Some(existing) => Err(CatalogError::DuplicateItem {
                existing: Box::new(existing),
            }),
            None => Err(CatalogError::Db(e)),
        },
        Err(e) => Err(CatalogError::Db(e)),
    }
}

/// Add a delta to one item's quantity (floored at zero). Returns the new
/// quantity.
pub fn merge_add_quantity(conn: &Connection, id: i64, delta: i64) -> Result<i64> {
    let changed = conn.execute(
        "UPDATE items SET quantity = max(0, quantity + ?) WHERE id = ?",
        rusqlite::params![delta, id],
    )?;
    if changed == 0 {
        return Err(CatalogError::NotFound("item"));
    }
    let quantity = conn.query_row("SELECT quantity FROM items WHERE id = ?", [id], |r| {
        r.get(0)
    })?;
    Ok(quantity)
}

/// Delete an item and its tag associations. Returns the stored image path so
/// the caller can clean up media files.
pub fn delete_item(conn: &Connection, id: i64) -> Result<Option<String>> {
    let Some(item) = get_item(conn, id)? else {
        return Err(CatalogError::NotFound("item"));
    };
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM item_tags WHERE item_id = ?", [id])?;
    tx.execute("DELETE FROM items WHERE id = ?", [id])?;
    tx.commit()?;
    Ok(item.image_path)
}

// ---------------------------------------------------------------------------
// Filter / sort / paginate engine

#[derive(Debug, Clone)]
pub struct ItemQuery {
    pub q: Option<String>,
    pub tag: Option<String>,
    pub game: Option<String>,
    pub set_name: Option<String>,
    pub rarity: Option<Rarity>,
    pub condition: Option<Condition>,
    pub language: Option<Language>,
    pub comercial_condition: Option<ComercialCondition>,
    pub number_set: Option<i64>,
    pub quantity_min: Option<i64>,
    pub quantity_max: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub page: i64,
    pub size: i64,
}

impl Default for ItemQuery {
    fn default() -> Self {
        ItemQuery {
            q: None,
            tag: None,
            game: None,
            set_name: None,
            rarity: None,
            condition: None,
            language: None,
            comercial_condition: None,
            number_set: None,
            quantity_min: None,
            quantity_max: None,
            sort_by: None,
            sort_dir: None,
            page: 1,
            size: 20,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ItemPage {
    pub items: Vec<ItemRecord>,
    pub total: i64,
    pub total_pages: i64,
    pub page: i64,
    pub size: i64,
    pub display_from: i64,
    pub display_to: i64,
}

/// Unknown sort keys silently fall back to name; unknown directions to asc.
fn sort_column(key: Option<&str>) -> &'static str {
    match key.unwrap_or("name") {
        "set_name" => "i.set_name",
        "game" => "i.game",
        "quantity" => "i.quantity",
        "number_set" => "i.number_set",
        "rarity" => "i.rarity",
        "condition" => "i.condition",
        "language" => "i.language",
        _ => "i.name",
    }
}

fn sort_direction(dir: Option<&str>) -> &'static str {
    match dir {
        Some(d) if d.eq_ignore_ascii_case("desc") => "DESC",
        _ => "ASC",
    }
}

/// Join + WHERE clause shared by count, page select and export.
fn filter_sql(query: &ItemQuery) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut binds: Vec<Value> = Vec::new();

    let mut sql = String::from(" FROM items i");
    if let Some(tag) = query.tag.as_deref() {
        sql.push_str(
            " JOIN item_tags it ON it.item_id = i.id
              JOIN tags t ON t.id = it.tag_id",
        );
        clauses.push("t.name = ?".to_string());
        binds.push(Value::Text(tag.to_string()));
    }

    if let Some(q) = query.q.as_deref() {
        let term = format!("%{}%", q.trim().to_lowercase());
        clauses.push(
            "(lower(i.name) LIKE ? OR lower(i.set_name) LIKE ? OR lower(i.game) LIKE ? \
              OR lower(i.variant) LIKE ? OR lower(i.notes) LIKE ?)"
                .to_string(),
        );
        for _ in 0..5 {
            binds.push(Value::Text(term.clone()));
        }
    }
    if let Some(game) = query.game.as_deref() {
        clauses.push("lower(i.game) LIKE ?".to_string());
        binds.push(Value::Text(format!("%{}%", game.trim().to_lowercase())));
    }
    if let Some(set_name) = query.set_name.as_deref() {
        clauses.push("lower(i.set_name) LIKE ?".to_string());
        binds.push(Value::Text(format!("%{}%", set_name.trim().to_lowercase())));
    }
    if let Some(rarity) = query.rarity {
        clauses.push("i.rarity = ?".to_string());
        binds.push(Value::Text(rarity.as_str().to_string()));
    }
    if let Some(condition) = query.condition {
        clauses.push("i.condition = ?".to_string());
        binds.push(Value::Text(condition.as_str().to_string()));
    }
    if let Some(language) = query.language {
        clauses.push("i.language = ?".to_string());
        binds.push(Value::Text(language.as_str().to_string()));
    }
    if let Some(status) = query.comercial_condition {
        clauses.push("i.comercial_condition = ?".to_string());
        binds.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(n) = query.number_set {
        clauses.push("i.number_set = ?".to_string());
        binds.push(Value::Integer(n));
    }
    if let Some(min) = query.quantity_min {
        clauses.push("i.quantity >= ?".to_string());
        binds.push(Value::Integer(min));
    }
    if let Some(max) = query.quantity_max {
        clauses.push("i.quantity <= ?".to_string());
        binds.push(Value::Integer(max));
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    (sql, binds)
}

pub fn search_items(conn: &Connection, query: &ItemQuery) -> Result<ItemPage> {
    let (filter, binds) = filter_sql(query);

    // Distinct: the tag join could fan out if associations ever duplicate.
    let count_sql = format!("SELECT COUNT(DISTINCT i.id){filter}");
    let total: i64 = conn.query_row(&count_sql, params_from_iter(binds.clone()), |r| r.get(0))?;

    let size = query.size.clamp(5, 100);
    let total_pages = std::cmp::max(1, (total + size - 1) / size);
    // Out-of-range pages clamp to the last valid page instead of going empty.
    let page = query.page.max(1).min(total_pages);

    let order = format!(
        " ORDER BY {} {}, i.id ASC",
        sort_column(query.sort_by.as_deref()),
        sort_direction(query.sort_dir.as_deref())
    );
    let page_sql = format!(
        "SELECT DISTINCT {ITEM_COLUMNS}{filter}{order} LIMIT ? OFFSET ?"
    );
    let mut page_binds = binds;
    page_binds.push(Value::Integer(size));
    page_binds.push(Value::Integer((page - 1) * size));

    let mut stmt = conn.prepare(&page_sql)?;
    let items = stmt
        .query_map(params_from_iter(page_binds), row_to_item)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let display_from = if total == 0 { 0 } else { (page - 1) * size + 1 };
    let display_to = std::cmp::min(total, page * size);

    Ok(ItemPage {
        items,
        total,
        total_pages,
        page,
        size,
        display_from,
        display_to,
    })
}

/// All matching items in query order, ignoring pagination. Used by export.
pub fn search_all(conn: &Connection, query: &ItemQuery) -> Result<Vec<ItemRecord>> {
    let (filter, binds) = filter_sql(query);
    let sql = format!(
        "SELECT DISTINCT {ITEM_COLUMNS}{filter} ORDER BY {} {}, i.id ASC",
        sort_column(query.sort_by.as_deref()),
        sort_direction(query.sort_dir.as_deref())
    );
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params_from_iter(binds), row_to_item)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(items)
}

// ---------------------------------------------------------------------------
// Tags

pub fn list_tags(conn: &Connection) -> rusqlite::Result<Vec<TagRecord>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, COUNT(it.item_id)
         FROM tags t
         LEFT JOIN item_tags it ON it.tag_id = t.id
         GROUP BY t.id
         ORDER BY t.name ASC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(TagRecord {
            id: r.get(0)?,
            name: r.get(1)?,
            item_count: r.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn tags_for_item(conn: &Connection, item_id: i64) -> rusqlite::Result<Vec<TagRecord>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name,
                (SELECT COUNT(*) FROM item_tags x WHERE x.tag_id = t.id)
         FROM tags t
         JOIN item_tags it ON it.tag_id = t.id
         WHERE it.item_id = ?
         ORDER BY t.name ASC",
    )?;
    let rows = stmt.query_map([item_id], |r| {
        Ok(TagRecord {
            id: r.get(0)?,
            name: r.get(1)?,
            item_count: r.get(2)?,
        })
    })?;
    rows.collect()
}

fn tag_id_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row("SELECT id FROM tags WHERE name = ?", [name], |r| r.get(0))
        .optional()
}

pub fn create_tag(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::Validation(vec![
            "The tag name is required.".to_string(),
        ]));
    }
    if tag_id_by_name(conn, name)?.is_some() {
        return Err(CatalogError::Conflict("the tag already exists".to_string()));
    }
    conn.execute("INSERT INTO tags(name) VALUES(?)", [name])?;
    Ok(conn.last_insert_rowid())
}

/// Look up a tag by exact name, creating it if absent.
pub fn find_or_create_tag(conn: &Connection, name: &str) -> Result<i64> {
    match tag_id_by_name(conn, name)? {
        Some(id) => Ok(id),
        None => create_tag(conn, name),
    }
}

pub fn rename_tag(conn: &Connection, tag_id: i64, new_name: &str) -> Result<()> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err(CatalogError::Validation(vec![
            "The new name is required.".to_string(),
        ]));
    }
    match tag_id_by_name(conn, new_name)? {
        Some(id) if id != tag_id => {
            return Err(CatalogError::Conflict(
                "another tag with that name exists".to_string(),
            ))
        }
        _ => {}
    }
    let changed = conn.execute(
        "UPDATE tags SET name = ? WHERE id = ?",
        rusqlite::params![new_name, tag_id],
    )?;
    if changed == 0 {
        return Err(CatalogError::NotFound("tag"));
    }
    Ok(())
}

/// Deleting a tag is rejected while any item still carries it.
pub fn delete_tag(conn: &Connection, tag_id: i64) -> Result<()> {
    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM tags WHERE id = ?", [tag_id], |r| r.get(0))
        .optional()?;
    if exists.is_none() {
        return Err(CatalogError::NotFound("tag"));
    }
    let used: i64 = conn.query_row(
        "SELECT COUNT(*) FROM item_tags WHERE tag_id = ?",
        [tag_id],
        |r| r.get(0),
    )?;
    if used > 0 {
        return Err(CatalogError::Conflict(
            "tag in use, detach from items first".to_string(),
        ));
    }
    conn.execute("DELETE FROM tags WHERE id = ?", [tag_id])?;
    Ok(())
}

/// Ensure an association exists between an item and a tag. Idempotent.
pub fn attach_tag(conn: &Connection, item_id: i64, tag_id: i64) -> Result<()> {
    if get_item(conn, item_id)?.is_none() {
        return Err(CatalogError::NotFound("item"));
    }
    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM tags WHERE id = ?", [tag_id], |r| r.get(0))
        .optional()?;
    if exists.is_none() {
        return Err(CatalogError::NotFound("tag"));
    }
    conn.execute(
        "INSERT OR IGNORE INTO item_tags(item_id, tag_id) VALUES(?, ?)",
        rusqlite::params![item_id, tag_id],
    )?;
    Ok(())
}

pub fn detach_tag(conn: &Connection, item_id: i64, tag_id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM item_tags WHERE item_id = ? AND tag_id = ?",
        rusqlite::params![item_id, tag_id],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Bulk operations over a multi-select id list

fn id_placeholders(ids: &[i64]) -> String {
    vec!["?"; ids.len()].join(", ")
}

pub fn bulk_adjust_quantity(conn: &Connection, ids: &[i64], delta: i64) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let sql = format!(
        "UPDATE items SET quantity = max(0, quantity + ?) WHERE id IN ({})",
        id_placeholders(ids)
    );
    let mut binds: Vec<Value> = vec![Value::Integer(delta)];
    binds.extend(ids.iter().map(|&id| Value::Integer(id)));
    Ok(conn.execute(&sql, params_from_iter(binds))?)
}

pub fn bulk_set_status(
    conn: &Connection,
    ids: &[i64],
    status: ComercialCondition,
) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let sql = format!(
        "UPDATE items SET comercial_condition = ? WHERE id IN ({})",
        id_placeholders(ids)
    );
    let mut binds: Vec<Value> = vec![Value::Text(status.as_str().to_string())];
    binds.extend(ids.iter().map(|&id| Value::Integer(id)));
    Ok(conn.execute(&sql, params_from_iter(binds))?)
}

pub fn bulk_add_tag(conn: &Connection, ids: &[i64], tag_name: &str) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let tag_id = find_or_create_tag(conn, tag_name)?;
    let mut attached = 0;
    for &id in ids {
        attached += conn.execute(
            "INSERT OR IGNORE INTO item_tags(item_id, tag_id)
             SELECT ?, ? WHERE EXISTS (SELECT 1 FROM items WHERE id = ?)",
            rusqlite::params![id, tag_id, id],
        )?;
    }
    Ok(attached)
}

pub fn bulk_remove_tag(conn: &Connection, ids: &[i64], tag_name: &str) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let Some(tag_id) = tag_id_by_name(conn, tag_name.trim())? else {
        return Err(CatalogError::NotFound("tag"));
    };
    let sql = format!(
        "DELETE FROM item_tags WHERE tag_id = ? AND item_id IN ({})",
        id_placeholders(ids)
    );
    let mut binds: Vec<Value> = vec![Value::Integer(tag_id)];
    binds.extend(ids.iter().map(|&id| Value::Integer(id)));
    Ok(conn.execute(&sql, params_from_iter(binds))?)
}

/// Delete many items at once. Returns the image paths of deleted items so the
/// caller can clean up media files; missing ids are skipped silently.
pub fn bulk_delete(conn: &Connection, ids: &[i64]) -> Result<Vec<String>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = id_placeholders(ids);
    let binds: Vec<Value> = ids.iter().map(|&id| Value::Integer(id)).collect();

    let mut stmt = conn.prepare(&format!(
        "SELECT image_path FROM items WHERE id IN ({placeholders}) AND image_path IS NOT NULL"
    ))?;
    let image_paths = stmt
        .query_map(params_from_iter(binds.clone()), |r| r.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        &format!("DELETE FROM item_tags WHERE item_id IN ({placeholders})"),
        params_from_iter(binds.clone()),
    )?;
    tx.execute(
        &format!("DELETE FROM items WHERE id IN ({placeholders})"),
        params_from_iter(binds),
    )?;
    tx.commit()?;
    Ok(image_paths)
}
