//! SQLite storage backend for papertag

use super::traits::{
    ComboStore, OpenStore, PaperStore, PaperTagStore, StorageError, StorageResult, TagStore,
};
use crate::identity::IdentityKey;
use crate::model::{
    non_blank, ComboId, ComboKey, Paper, PaperId, PaperRecord, PaperSource, PaperTag, Tag,
    TagCombo, TagId, AUTO_ASSIGNED_CATEGORY, NOVEL_THRESHOLD,
};
use crate::model::growth_rate;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const PAPER_COLUMNS: &str = "id, title, abstract, source, source_id, doi, arxiv_id, raw_metadata, \
     citation_count, tag_score, scored_at, classified_at, created_at";

const TAG_COLUMNS: &str =
    "id, name, slug, category, frequency, first_seen, last_seen, growth_rate, created_at";

const COMBO_COLUMNS: &str =
    "id, tag_low, tag_high, frequency, first_paper_id, is_novel, created_at";

/// How long a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed tagging store
///
/// Uses a single SQLite database file with tables for papers, tags,
/// paper-tag associations and tag combinations. Thread-safe via internal
/// mutex on the connection; uniqueness is enforced by the schema so several
/// processes may share one file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS papers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                title_key TEXT NOT NULL,
                abstract TEXT,
                source TEXT NOT NULL,
                source_id TEXT,
                doi TEXT,
                arxiv_id TEXT,
                raw_metadata TEXT,
                citation_count INTEGER NOT NULL DEFAULT 0,
                tag_score REAL,
                scored_at TEXT,
                classified_at TEXT,
                created_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_papers_doi
                ON papers(doi) WHERE doi IS NOT NULL;
            CREATE UNIQUE INDEX IF NOT EXISTS idx_papers_arxiv_id
                ON papers(arxiv_id) WHERE arxiv_id IS NOT NULL;
            CREATE UNIQUE INDEX IF NOT EXISTS idx_papers_source_id
                ON papers(source, source_id) WHERE source_id IS NOT NULL;
            CREATE INDEX IF NOT EXISTS idx_papers_title_key
                ON papers(title_key);

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                slug TEXT NOT NULL,
                category TEXT NOT NULL,
                frequency INTEGER NOT NULL DEFAULT 0 CHECK (frequency >= 0),
                first_seen TEXT,
                last_seen TEXT,
                growth_rate REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tags_frequency
                ON tags(frequency DESC);

            CREATE TABLE IF NOT EXISTS paper_tags (
                paper_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                confidence REAL NOT NULL,
                is_novel_combo INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                PRIMARY KEY (paper_id, tag_id),
                FOREIGN KEY (paper_id) REFERENCES papers(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_paper_tags_tag
                ON paper_tags(tag_id);

            -- Canonical pair: tag_low < tag_high, one row per pair
            CREATE TABLE IF NOT EXISTS tag_combos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tag_low INTEGER NOT NULL,
                tag_high INTEGER NOT NULL,
                frequency INTEGER NOT NULL DEFAULT 1 CHECK (frequency >= 1),
                first_paper_id INTEGER,
                is_novel INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                CHECK (tag_low < tag_high),
                UNIQUE (tag_low, tag_high),
                FOREIGN KEY (tag_low) REFERENCES tags(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_high) REFERENCES tags(id) ON DELETE CASCADE,
                FOREIGN KEY (first_paper_id) REFERENCES papers(id) ON DELETE SET NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tag_combos_frequency
                ON tag_combos(frequency);

            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn query_papers(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StorageResult<Vec<Paper>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, PaperRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(PaperRow::into_paper).collect()
    }

    fn query_tags(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StorageResult<Vec<Tag>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, TagRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(TagRow::into_tag).collect()
    }

    fn query_combos(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StorageResult<Vec<TagCombo>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, ComboRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ComboRow::into_combo).collect()
    }

    fn tag_by_name(conn: &Connection, name: &str) -> StorageResult<Option<Tag>> {
        Ok(Self::query_tags(
            conn,
            &format!("SELECT {TAG_COLUMNS} FROM tags WHERE name = ?1"),
            params![name],
        )?
        .pop())
    }

    fn combo_by_key(conn: &Connection, key: &ComboKey) -> StorageResult<Option<TagCombo>> {
        Ok(Self::query_combos(
            conn,
            &format!("SELECT {COMBO_COLUMNS} FROM tag_combos WHERE tag_low = ?1 AND tag_high = ?2"),
            params![key.low().get(), key.high().get()],
        )?
        .pop())
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl PaperStore for SqliteStore {
    fn find_paper(&self, key: &IdentityKey) -> StorageResult<Option<Paper>> {
        let conn = self.conn();
        let papers = match key {
            IdentityKey::Doi(doi) => Self::query_papers(
                &conn,
                &format!("SELECT {PAPER_COLUMNS} FROM papers WHERE doi = ?1"),
                params![doi],
            )?,
            IdentityKey::ArxivId(arxiv_id) => Self::query_papers(
                &conn,
                &format!("SELECT {PAPER_COLUMNS} FROM papers WHERE arxiv_id = ?1"),
                params![arxiv_id],
            )?,
            IdentityKey::SourceId { source, source_id } => Self::query_papers(
                &conn,
                &format!(
                    "SELECT {PAPER_COLUMNS} FROM papers WHERE source = ?1 AND source_id = ?2"
                ),
                params![source.as_str(), source_id],
            )?,
            IdentityKey::Title(title_key) => Self::query_papers(
                &conn,
                &format!(
                    "SELECT {PAPER_COLUMNS} FROM papers WHERE title_key = ?1 ORDER BY id LIMIT 1"
                ),
                params![title_key],
            )?,
        };
        Ok(papers.into_iter().next())
    }

    fn load_paper(&self, id: PaperId) -> StorageResult<Option<Paper>> {
        let conn = self.conn();
        Ok(Self::query_papers(
            &conn,
            &format!("SELECT {PAPER_COLUMNS} FROM papers WHERE id = ?1"),
            params![id.get()],
        )?
        .pop())
    }

    fn create_paper(&self, record: &PaperRecord, created_at: DateTime<Utc>) -> StorageResult<Paper> {
        let title = record.title.trim();
        let raw_metadata = raw_metadata_json(record)?;
        let source = record.source.unwrap_or(PaperSource::Internal);

        let conn = self.conn();
        let row = conn.query_row(
            &format!(
                "INSERT INTO papers (title, title_key, abstract, source, source_id, doi, arxiv_id, \
                 raw_metadata, citation_count, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
                 RETURNING {PAPER_COLUMNS}"
            ),
            params![
                title,
                title.to_lowercase(),
                non_blank(&record.abstract_text),
                source.as_str(),
                non_blank(&record.source_id),
                non_blank(&record.doi),
                non_blank(&record.arxiv_id),
                raw_metadata,
                record.citation_count,
                timestamp(created_at),
            ],
            PaperRow::from_row,
        )?;
        row.into_paper()
    }

    fn update_fill_missing(&self, id: PaperId, record: &PaperRecord) -> StorageResult<Paper> {
        let raw_metadata = raw_metadata_json(record)?;

        let conn = self.conn();
        // Identifiers already held by another paper are left unfilled
        let row = conn
            .query_row(
                &format!(
                    "UPDATE papers SET \
                     abstract = COALESCE(NULLIF(abstract, ''), ?2), \
                     doi = COALESCE(doi, CASE WHEN NOT EXISTS \
                         (SELECT 1 FROM papers p WHERE p.doi = ?3) THEN ?3 END), \
                     arxiv_id = COALESCE(arxiv_id, CASE WHEN NOT EXISTS \
                         (SELECT 1 FROM papers p WHERE p.arxiv_id = ?4) THEN ?4 END), \
                     raw_metadata = COALESCE(raw_metadata, ?5), \
                     citation_count = MAX(citation_count, ?6) \
                     WHERE id = ?1 \
                     RETURNING {PAPER_COLUMNS}"
                ),
                params![
                    id.get(),
                    non_blank(&record.abstract_text),
                    non_blank(&record.doi),
                    non_blank(&record.arxiv_id),
                    raw_metadata,
                    record.citation_count,
                ],
                PaperRow::from_row,
            )
            .optional()?;

        row.ok_or(StorageError::PaperNotFound(id))?.into_paper()
    }

    fn set_score(
        &self,
        id: PaperId,
        score: Option<f64>,
        scored_at: Option<DateTime<Utc>>,
    ) -> StorageResult<()> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE papers SET tag_score = ?2, scored_at = ?3 WHERE id = ?1",
            params![id.get(), score, scored_at.map(timestamp)],
        )?;
        if changed == 0 {
            return Err(StorageError::PaperNotFound(id));
        }
        Ok(())
    }

    fn mark_classified(&self, id: PaperId, at: DateTime<Utc>) -> StorageResult<bool> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE papers SET classified_at = ?2 WHERE id = ?1 AND classified_at IS NULL",
            params![id.get(), timestamp(at)],
        )?;
        Ok(changed == 1)
    }

    fn count_papers(&self) -> StorageResult<usize> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM papers", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl TagStore for SqliteStore {
    fn find_tag_by_name(&self, name: &str) -> StorageResult<Option<Tag>> {
        let conn = self.conn();
        Self::tag_by_name(&conn, name)
    }

    fn load_tag(&self, id: TagId) -> StorageResult<Option<Tag>> {
        let conn = self.conn();
        Ok(Self::query_tags(
            &conn,
            &format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?1"),
            params![id.get()],
        )?
        .pop())
    }

    fn create_tag(&self, name: &str, created_at: DateTime<Utc>) -> StorageResult<(Tag, bool)> {
        let conn = self.conn();
        let inserted = conn.execute(
            "INSERT INTO tags (name, slug, category, frequency, growth_rate, created_at) \
             VALUES (?1, ?2, ?3, 0, 0.0, ?4) \
             ON CONFLICT(name) DO NOTHING",
            params![
                name,
                Tag::slug_for(name),
                AUTO_ASSIGNED_CATEGORY,
                timestamp(created_at)
            ],
        )?;
        let tag = Self::tag_by_name(&conn, name)?
            .ok_or_else(|| StorageError::Integrity(format!("tag '{name}' vanished after insert")))?;
        Ok((tag, inserted == 1))
    }

    fn save_tag(&self, tag: &Tag) -> StorageResult<()> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE tags SET frequency = ?2, first_seen = ?3, last_seen = ?4, growth_rate = ?5 \
             WHERE id = ?1",
            params![
                tag.id.get(),
                tag.frequency,
                tag.first_seen.map(timestamp),
                tag.last_seen.map(timestamp),
                tag.growth_rate,
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::TagNotFound(tag.id));
        }
        Ok(())
    }

    fn increment_tag_frequency(&self, id: TagId, seen_at: DateTime<Utc>) -> StorageResult<Tag> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let row = tx
            .query_row(
                &format!(
                    "UPDATE tags SET frequency = frequency + 1, \
                     first_seen = COALESCE(first_seen, ?2), last_seen = ?2 \
                     WHERE id = ?1 RETURNING {TAG_COLUMNS}"
                ),
                params![id.get(), timestamp(seen_at)],
                TagRow::from_row,
            )
            .optional()?;
        let mut tag = row.ok_or(StorageError::TagNotFound(id))?.into_tag()?;

        // Same transaction as the increment so the rate always matches the frequency
        tag.growth_rate = growth_rate(tag.frequency, tag.first_seen, seen_at);
        tx.execute(
            "UPDATE tags SET growth_rate = ?2 WHERE id = ?1",
            params![id.get(), tag.growth_rate],
        )?;
        tx.commit()?;
        Ok(tag)
    }

    fn top_tags_by_frequency(&self, n: usize) -> StorageResult<Vec<Tag>> {
        let conn = self.conn();
        Self::query_tags(
            &conn,
            &format!(
                "SELECT {TAG_COLUMNS} FROM tags WHERE frequency > 0 \
                 ORDER BY frequency DESC, id ASC LIMIT ?1"
            ),
            params![sql_limit(Some(n))],
        )
    }

    fn list_tags(&self, limit: Option<usize>) -> StorageResult<Vec<Tag>> {
        let conn = self.conn();
        Self::query_tags(
            &conn,
            &format!("SELECT {TAG_COLUMNS} FROM tags ORDER BY frequency DESC, name ASC LIMIT ?1"),
            params![sql_limit(limit)],
        )
    }

    fn count_tags(&self) -> StorageResult<usize> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl PaperTagStore for SqliteStore {
    fn create_paper_tag(
        &self,
        paper_id: PaperId,
        tag_id: TagId,
        confidence: f64,
        created_at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let conn = self.conn();
        let inserted = conn.execute(
            "INSERT INTO paper_tags (paper_id, tag_id, confidence, is_novel_combo, created_at) \
             VALUES (?1, ?2, ?3, 0, ?4) \
             ON CONFLICT(paper_id, tag_id) DO NOTHING",
            params![paper_id.get(), tag_id.get(), confidence, timestamp(created_at)],
        )?;
        Ok(inserted == 1)
    }

    fn count_by_tag(&self, tag_id: TagId) -> StorageResult<usize> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM paper_tags WHERE tag_id = ?1",
            params![tag_id.get()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn list_by_paper(&self, paper_id: PaperId) -> StorageResult<Vec<PaperTag>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT paper_id, tag_id, confidence, is_novel_combo, created_at FROM paper_tags \
             WHERE paper_id = ?1 ORDER BY confidence DESC, tag_id ASC",
        )?;
        let rows = stmt
            .query_map(params![paper_id.get()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(paper_id, tag_id, confidence, is_novel_combo, created_at)| {
                Ok(PaperTag {
                    paper_id: PaperId::new(paper_id),
                    tag_id: TagId::new(tag_id),
                    confidence,
                    is_novel_combo,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    fn tags_for_paper(&self, paper_id: PaperId) -> StorageResult<Vec<Tag>> {
        let conn = self.conn();
        Self::query_tags(
            &conn,
            "SELECT t.id, t.name, t.slug, t.category, t.frequency, t.first_seen, t.last_seen, \
             t.growth_rate, t.created_at \
             FROM tags t JOIN paper_tags pt ON pt.tag_id = t.id \
             WHERE pt.paper_id = ?1 ORDER BY pt.confidence DESC, t.id ASC",
            params![paper_id.get()],
        )
    }

    fn set_novel_flag(&self, paper_id: PaperId, tag_id: TagId, is_novel: bool) -> StorageResult<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE paper_tags SET is_novel_combo = ?3 WHERE paper_id = ?1 AND tag_id = ?2",
            params![paper_id.get(), tag_id.get(), is_novel],
        )?;
        Ok(())
    }
}

impl ComboStore for SqliteStore {
    fn find_combo(&self, key: &ComboKey) -> StorageResult<Option<TagCombo>> {
        let conn = self.conn();
        Self::combo_by_key(&conn, key)
    }

    fn create_combo(
        &self,
        key: &ComboKey,
        first_paper_id: PaperId,
        created_at: DateTime<Utc>,
    ) -> StorageResult<(TagCombo, bool)> {
        let conn = self.conn();
        let inserted = conn.execute(
            "INSERT INTO tag_combos (tag_low, tag_high, frequency, first_paper_id, is_novel, created_at) \
             VALUES (?1, ?2, 1, ?3, 1, ?4) \
             ON CONFLICT(tag_low, tag_high) DO NOTHING",
            params![
                key.low().get(),
                key.high().get(),
                first_paper_id.get(),
                timestamp(created_at)
            ],
        )?;
        let combo = Self::combo_by_key(&conn, key)?
            .ok_or_else(|| StorageError::Integrity(format!("combo {key} vanished after insert")))?;
        Ok((combo, inserted == 1))
    }

    fn increment_combo_frequency(&self, id: ComboId) -> StorageResult<u32> {
        let conn = self.conn();
        // SET expressions see the pre-update frequency
        let frequency = conn
            .query_row(
                "UPDATE tag_combos SET frequency = frequency + 1, \
                 is_novel = (frequency + 1 <= ?2) \
                 WHERE id = ?1 RETURNING frequency",
                params![id.get(), NOVEL_THRESHOLD],
                |row| row.get::<_, u32>(0),
            )
            .optional()?;
        frequency.ok_or(StorageError::ComboNotFound(id))
    }

    fn query_novel(&self, min_frequency: u32, limit: usize) -> StorageResult<Vec<TagCombo>> {
        let conn = self.conn();
        Self::query_combos(
            &conn,
            &format!(
                "SELECT {COMBO_COLUMNS} FROM tag_combos \
                 WHERE frequency >= ?1 AND frequency <= ?2 \
                 ORDER BY created_at DESC, id DESC LIMIT ?3"
            ),
            params![min_frequency, NOVEL_THRESHOLD, sql_limit(Some(limit))],
        )
    }

    fn query_popular(&self, min_frequency: u32, limit: usize) -> StorageResult<Vec<TagCombo>> {
        let conn = self.conn();
        Self::query_combos(
            &conn,
            &format!(
                "SELECT {COMBO_COLUMNS} FROM tag_combos WHERE frequency >= ?1 \
                 ORDER BY frequency DESC, id ASC LIMIT ?2"
            ),
            params![min_frequency, sql_limit(Some(limit))],
        )
    }

    fn count_combos(&self) -> StorageResult<usize> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tag_combos", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

struct PaperRow {
    id: i64,
    title: String,
    abstract_text: Option<String>,
    source: String,
    source_id: Option<String>,
    doi: Option<String>,
    arxiv_id: Option<String>,
    raw_metadata: Option<String>,
    citation_count: u32,
    tag_score: Option<f64>,
    scored_at: Option<String>,
    classified_at: Option<String>,
    created_at: String,
}

impl PaperRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            abstract_text: row.get(2)?,
            source: row.get(3)?,
            source_id: row.get(4)?,
            doi: row.get(5)?,
            arxiv_id: row.get(6)?,
            raw_metadata: row.get(7)?,
            citation_count: row.get(8)?,
            tag_score: row.get(9)?,
            scored_at: row.get(10)?,
            classified_at: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    fn into_paper(self) -> StorageResult<Paper> {
        let source = self
            .source
            .parse::<PaperSource>()
            .map_err(|e| StorageError::Integrity(e.to_string()))?;
        Ok(Paper {
            id: PaperId::new(self.id),
            title: self.title,
            abstract_text: self.abstract_text,
            source,
            source_id: self.source_id,
            doi: self.doi,
            arxiv_id: self.arxiv_id,
            raw_metadata: self
                .raw_metadata
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()?,
            citation_count: self.citation_count,
            tag_score: self.tag_score,
            scored_at: parse_optional_timestamp(self.scored_at.as_deref())?,
            classified_at: parse_optional_timestamp(self.classified_at.as_deref())?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

struct TagRow {
    id: i64,
    name: String,
    slug: String,
    category: String,
    frequency: u32,
    first_seen: Option<String>,
    last_seen: Option<String>,
    growth_rate: f64,
    created_at: String,
}

impl TagRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            category: row.get(3)?,
            frequency: row.get(4)?,
            first_seen: row.get(5)?,
            last_seen: row.get(6)?,
            growth_rate: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn into_tag(self) -> StorageResult<Tag> {
        Ok(Tag {
            id: TagId::new(self.id),
            name: self.name,
            slug: self.slug,
            category: self.category,
            frequency: self.frequency,
            first_seen: parse_optional_timestamp(self.first_seen.as_deref())?,
            last_seen: parse_optional_timestamp(self.last_seen.as_deref())?,
            growth_rate: self.growth_rate,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

struct ComboRow {
    id: i64,
    tag_low: i64,
    tag_high: i64,
    frequency: u32,
    first_paper_id: Option<i64>,
    is_novel: bool,
    created_at: String,
}

impl ComboRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tag_low: row.get(1)?,
            tag_high: row.get(2)?,
            frequency: row.get(3)?,
            first_paper_id: row.get(4)?,
            is_novel: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_combo(self) -> StorageResult<TagCombo> {
        let key = ComboKey::new(TagId::new(self.tag_low), TagId::new(self.tag_high))
            .ok_or_else(|| {
                StorageError::Integrity(format!("combo {} pairs tag {} with itself", self.id, self.tag_low))
            })?;
        Ok(TagCombo {
            id: ComboId::new(self.id),
            key,
            frequency: self.frequency,
            first_paper_id: self.first_paper_id.map(PaperId::new),
            is_novel: self.is_novel,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| StorageError::DateParse(e.to_string()))?
        .with_timezone(&Utc))
}

fn parse_optional_timestamp(raw: Option<&str>) -> StorageResult<Option<DateTime<Utc>>> {
    raw.map(parse_timestamp).transpose()
}

fn raw_metadata_json(record: &PaperRecord) -> StorageResult<Option<String>> {
    match &record.raw_metadata {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::to_string(value)?)),
    }
}

/// SQLite treats a negative LIMIT as unbounded
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX))
}
