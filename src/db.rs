use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("cardbook.sqlite3");
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// In-memory database with the full schema, for tests.
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS items(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            game TEXT NOT NULL,
            set_name TEXT NOT NULL,
            set_code TEXT,
            number_set INTEGER NOT NULL,
            rarity TEXT NOT NULL,
            condition TEXT NOT NULL,
            language TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 0 CHECK(quantity >= 0),
            location TEXT,
            comercial_condition TEXT NOT NULL DEFAULT 'Collection',
            variant TEXT,
            notes TEXT
        )",
        [],
    )?;

    // The natural key: two records differing only by case, or by an absent vs
    // empty set_code/variant, are the same physical card variant.
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_item_variant_ci ON items(
            lower(game),
            lower(coalesce(set_code, '')),
            lower(set_name),
            number_set,
            language,
            condition,
            lower(coalesce(variant, ''))
        )",
        [],
    )?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_items_name ON items(name)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_items_game ON items(game)", [])?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_items_set_name ON items(set_name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_items_number_set ON items(number_set)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_items_quantity ON items(quantity)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tags(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS item_tags(
            item_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY(item_id, tag_id),
            FOREIGN KEY(item_id) REFERENCES items(id),
            FOREIGN KEY(tag_id) REFERENCES tags(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_item_tags_tag ON item_tags(tag_id)",
        [],
    )?;

    // Older workspaces predate image attachments. Add the column if needed.
    ensure_items_image_path(conn)?;

    Ok(())
}

fn ensure_items_image_path(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "items", "image_path")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE items ADD COLUMN image_path TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
