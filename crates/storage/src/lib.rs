//! Sqlite-backed persistence.

use std::path::Path;

use anyhow::Context as _;
use pagemark_core::{BookId, LayoutMode, MetadataCache, ReaderPrefs};
use rusqlite::{Connection, OptionalExtension as _};

#[derive(Debug)]
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("open sqlite db at {}", path.as_ref().display()))?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    fn migrate(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS reader_prefs (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                font_family TEXT NOT NULL,
                font_size REAL NOT NULL,
                line_spacing REAL NOT NULL,
                margin_horizontal REAL NOT NULL,
                margin_vertical REAL NOT NULL
            );
            INSERT OR IGNORE INTO reader_prefs
                (id, font_family, font_size, line_spacing, margin_horizontal, margin_vertical)
            VALUES (1, 'serif', 16.0, 1.5, 24.0, 16.0);

            CREATE TABLE IF NOT EXISTS pagination_cache (
                cache_key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (unixepoch())
            );
            "#,
        )?;

        match self.conn.execute(
            "ALTER TABLE reader_prefs ADD COLUMN layout_mode TEXT NOT NULL DEFAULT 'paginated'",
            [],
        ) {
            Ok(_) => {}
            Err(err) => {
                let msg = err.to_string();
                if !msg.contains("duplicate column name") {
                    return Err(err).context("add reader_prefs.layout_mode column");
                }
            }
        }

        Ok(())
    }

    pub fn load_prefs(&self) -> anyhow::Result<ReaderPrefs> {
        let row = self
            .conn
            .query_row(
                "SELECT font_family, font_size, line_spacing, margin_horizontal, margin_vertical, layout_mode FROM reader_prefs WHERE id = 1",
                [],
                |row| {
                    let font_family: String = row.get(0)?;
                    let font_size: f64 = row.get(1)?;
                    let line_spacing: f64 = row.get(2)?;
                    let margin_horizontal: f64 = row.get(3)?;
                    let margin_vertical: f64 = row.get(4)?;
                    let layout_mode: String = row.get(5)?;
                    Ok((font_family, font_size, line_spacing, margin_horizontal, margin_vertical, layout_mode))
                },
            )
            .optional()?;

        let (font_family, font_size, line_spacing, margin_horizontal, margin_vertical, layout_mode) =
            match row {
                Some(value) => value,
                None => (
                    "serif".to_string(),
                    16.0,
                    1.5,
                    24.0,
                    16.0,
                    "paginated".to_string(),
                ),
            };

        let layout_mode = layout_mode
            .parse::<LayoutMode>()
            .unwrap_or(LayoutMode::Paginated);

        let mut prefs = ReaderPrefs {
            font_family,
            font_size: font_size as f32,
            line_spacing: line_spacing as f32,
            margin_horizontal: margin_horizontal as f32,
            margin_vertical: margin_vertical as f32,
            layout_mode,
        };
        prefs.normalize();
        Ok(prefs)
    }

    pub fn save_prefs(&self, prefs: &ReaderPrefs) -> anyhow::Result<()> {
        let mut prefs = prefs.clone();
        prefs.normalize();

        self.conn.execute(
            "UPDATE reader_prefs SET font_family = ?, font_size = ?, line_spacing = ?, margin_horizontal = ?, margin_vertical = ?, layout_mode = ? WHERE id = 1",
            (
                &prefs.font_family,
                prefs.font_size as f64,
                prefs.line_spacing as f64,
                prefs.margin_horizontal as f64,
                prefs.margin_vertical as f64,
                prefs.layout_mode.as_str(),
            ),
        )?;
        Ok(())
    }

    /// Drops every cached layout for a book, e.g. when it leaves the library.
    pub fn delete_book_entries(&self, book: &BookId) -> anyhow::Result<usize> {
        let prefix = format!("{}::%", book.0);
        let deleted = self.conn.execute(
            "DELETE FROM pagination_cache WHERE cache_key LIKE ?",
            [&prefix],
        )?;
        Ok(deleted)
    }
}

impl MetadataCache for Storage {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload FROM pagination_cache WHERE cache_key = ?",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO pagination_cache (cache_key, payload, updated_at) VALUES (?, ?, unixepoch())
            ON CONFLICT(cache_key) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at
            "#,
            (key, value),
        )?;
        Ok(())
    }
}
