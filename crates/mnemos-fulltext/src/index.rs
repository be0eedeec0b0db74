//! `InvertedIndex` (spec.md §4.C3), grounded on `vestige-core`'s
//! `storage::sqlite` module: a single rusqlite connection guarded by a
//! mutex, FTS5 for the tokenised fields, plain columns for the rest.

use crate::tokenizer::sanitize_fts5_query;
use mnemos_core::MnemosError;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// One row of the inverted index (spec.md §4.C3 state: "fields
/// `{path, filename, content, kind, timestamp, subject_tag, action_tag,
/// category_tag, session_id, message_turn}`").
#[derive(Debug, Clone, Default)]
pub struct DocumentFields {
    pub path: String,
    pub filename: String,
    pub content: String,
    pub kind: String,
    pub timestamp: String,
    pub subject_tag: String,
    pub action_tag: String,
    pub category_tag: String,
    pub session_id: String,
    pub message_turn: i64,
}

/// Optional equality filters applied on top of the FTS5 `content`/
/// `filename` match (spec.md §4.C3 `search(text, filter?, k)`).
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub kind: Option<String>,
    pub subject_tag: Option<String>,
    pub action_tag: Option<String>,
    pub category_tag: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub fields: DocumentFields,
    pub rank: f64,
}

/// Persistent inverted index over one SQLite file (spec.md §6:
/// co-located alongside the other memory-root artefacts).
pub struct InvertedIndex {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
CREATE VIRTUAL TABLE IF NOT EXISTS documents USING fts5(
    path UNINDEXED,
    filename,
    content,
    kind UNINDEXED,
    timestamp UNINDEXED,
    subject_tag UNINDEXED,
    action_tag UNINDEXED,
    category_tag UNINDEXED,
    session_id UNINDEXED,
    message_turn UNINDEXED
);
";

impl InvertedIndex {
    /// Opens (or creates) the index file at `path`.
    pub fn open(path: &Path) -> Result<Self, MnemosError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| MnemosError::storage(format!("opening inverted index: {e}")))?;
        conn.execute_batch(SCHEMA).map_err(|e| MnemosError::storage(format!("creating inverted index schema: {e}")))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory index, used by tests and by the rebuild worker to stage
    /// a fresh index before swapping it in.
    pub fn open_in_memory() -> Result<Self, MnemosError> {
        let conn = Connection::open_in_memory().map_err(|e| MnemosError::storage(format!("opening in-memory index: {e}")))?;
        conn.execute_batch(SCHEMA).map_err(|e| MnemosError::storage(format!("creating inverted index schema: {e}")))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Atomic upsert keyed on `path` (spec.md §4.C3 `update`): deletes any
    /// existing row for `path`, then inserts, inside one transaction so a
    /// failure between the two never leaves a duplicate or a gap.
    pub fn update(&self, fields: DocumentFields) -> Result<(), MnemosError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(|e| MnemosError::storage(format!("begin upsert: {e}")))?;
        tx.execute("DELETE FROM documents WHERE path = ?1", params![fields.path])
            .map_err(|e| MnemosError::storage(format!("upsert delete: {e}")))?;
        insert_row(&tx, &fields)?;
        tx.commit().map_err(|e| MnemosError::storage(format!("commit upsert: {e}")))?;
        Ok(())
    }

    /// Full rebuild (spec.md §4.C3 `update_batch`): drops and recreates
    /// the table, then inserts every entry with plain `INSERT` (no
    /// delete-first needed — the destination is fresh). The whole batch
    /// runs inside one transaction; on any error it is rolled back in
    /// full, so "no partial batch is ever committed" (spec.md invariant).
    pub fn update_batch(&self, entries: Vec<DocumentFields>) -> Result<(), MnemosError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(|e| MnemosError::storage(format!("begin rebuild: {e}")))?;
        tx.execute_batch("DROP TABLE IF EXISTS documents;").map_err(|e| MnemosError::storage(format!("rebuild drop: {e}")))?;
        tx.execute_batch(SCHEMA).map_err(|e| MnemosError::storage(format!("rebuild schema: {e}")))?;
        for fields in &entries {
            insert_row(&tx, fields)?;
        }
        tx.commit().map_err(|e| MnemosError::storage(format!("commit rebuild: {e}")))?;
        tracing::info!(count = entries.len(), "inverted index rebuilt");
        Ok(())
    }

    /// Multi-field OR search across `content` and `filename` (spec.md
    /// §4.C3 `search`), with optional equality filters over the
    /// unindexed tag columns.
    pub fn search(&self, text: &str, filter: Option<&SearchFilter>, k: usize) -> Result<Vec<SearchHit>, MnemosError> {
        let sanitized = sanitize_fts5_query(text);
        if sanitized.is_empty() {
            return Ok(Vec::new());
        }
        let match_expr = format!("content:({sanitized}) OR filename:({sanitized})");

        let mut sql = String::from(
            "SELECT path, filename, content, kind, timestamp, subject_tag, action_tag, category_tag, session_id, message_turn, bm25(documents) \
             FROM documents WHERE documents MATCH ?1",
        );
        let mut query_params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(match_expr)];
        if let Some(f) = filter {
            if let Some(v) = &f.kind {
                sql.push_str(&format!(" AND kind = ?{}", query_params.len() + 1));
                query_params.push(Box::new(v.clone()));
            }
            if let Some(v) = &f.subject_tag {
                sql.push_str(&format!(" AND subject_tag = ?{}", query_params.len() + 1));
                query_params.push(Box::new(v.clone()));
            }
            if let Some(v) = &f.action_tag {
                sql.push_str(&format!(" AND action_tag = ?{}", query_params.len() + 1));
                query_params.push(Box::new(v.clone()));
            }
            if let Some(v) = &f.category_tag {
                sql.push_str(&format!(" AND category_tag = ?{}", query_params.len() + 1));
                query_params.push(Box::new(v.clone()));
            }
            if let Some(v) = &f.session_id {
                sql.push_str(&format!(" AND session_id = ?{}", query_params.len() + 1));
                query_params.push(Box::new(v.clone()));
            }
        }
        sql.push_str(" ORDER BY bm25(documents) LIMIT ?");
        query_params.push(Box::new(k as i64));

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql).map_err(|e| MnemosError::storage(format!("search prepare: {e}")))?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = query_params.iter().map(std::convert::AsRef::as_ref).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(SearchHit {
                    fields: DocumentFields {
                        path: row.get(0)?,
                        filename: row.get(1)?,
                        content: row.get(2)?,
                        kind: row.get(3)?,
                        timestamp: row.get(4)?,
                        subject_tag: row.get(5)?,
                        action_tag: row.get(6)?,
                        category_tag: row.get(7)?,
                        session_id: row.get(8)?,
                        message_turn: row.get(9)?,
                    },
                    // bm25() returns more-negative-is-better; negate so higher rank == more relevant.
                    rank: -row.get::<_, f64>(10)?,
                })
            })
            .map_err(|e| MnemosError::storage(format!("search query: {e}")))?;

        let mut hits = Vec::new();
        for row in rows {
            hits.push(row.map_err(|e| MnemosError::storage(format!("search row: {e}")))?);
        }
        Ok(hits)
    }

    /// Looks up a single document by its unique `path` key, used by the
    /// verbatim search path (spec.md §4.C6) before falling back to a
    /// filesystem read.
    pub fn get_by_path(&self, path: &str) -> Result<Option<DocumentFields>, MnemosError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT path, filename, content, kind, timestamp, subject_tag, action_tag, category_tag, session_id, message_turn FROM documents WHERE path = ?1")
            .map_err(|e| MnemosError::storage(format!("get_by_path prepare: {e}")))?;
        stmt.query_row(params![path], |row| {
            Ok(DocumentFields {
                path: row.get(0)?,
                filename: row.get(1)?,
                content: row.get(2)?,
                kind: row.get(3)?,
                timestamp: row.get(4)?,
                subject_tag: row.get(5)?,
                action_tag: row.get(6)?,
                category_tag: row.get(7)?,
                session_id: row.get(8)?,
                message_turn: row.get(9)?,
            })
        })
        .optional()
        .map_err(|e| MnemosError::storage(format!("get_by_path: {e}")))
    }

    pub fn len(&self) -> Result<usize, MnemosError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(|e| MnemosError::storage(format!("count: {e}")))
    }

    pub fn is_empty(&self) -> Result<bool, MnemosError> {
        Ok(self.len()? == 0)
    }
}

fn insert_row(tx: &rusqlite::Transaction<'_>, fields: &DocumentFields) -> Result<(), MnemosError> {
    tx.execute(
        "INSERT INTO documents (path, filename, content, kind, timestamp, subject_tag, action_tag, category_tag, session_id, message_turn) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            fields.path,
            fields.filename,
            fields.content,
            fields.kind,
            fields.timestamp,
            fields.subject_tag,
            fields.action_tag,
            fields.category_tag,
            fields.session_id,
            fields.message_turn,
        ],
    )
    .map_err(|e| MnemosError::storage(format!("insert row: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: &str, content: &str) -> DocumentFields {
        DocumentFields { path: path.to_string(), filename: path.to_string(), content: content.to_string(), kind: "memory".to_string(), ..Default::default() }
    }

    #[test]
    fn update_then_search_finds_the_document() {
        let index = InvertedIndex::open_in_memory().unwrap();
        index.update(doc("a.json", "the quick brown fox")).unwrap();
        let hits = index.search("quick fox", None, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fields.path, "a.json");
    }

    #[test]
    fn update_is_idempotent_on_path() {
        let index = InvertedIndex::open_in_memory().unwrap();
        index.update(doc("a.json", "first version")).unwrap();
        index.update(doc("a.json", "second version")).unwrap();
        assert_eq!(index.len().unwrap(), 1);
        let fetched = index.get_by_path("a.json").unwrap().unwrap();
        assert_eq!(fetched.content, "second version");
    }

    #[test]
    fn rebuild_replaces_the_whole_table() {
        let index = InvertedIndex::open_in_memory().unwrap();
        index.update(doc("stale.json", "old content")).unwrap();
        index.update_batch(vec![doc("fresh.json", "new content")]).unwrap();
        assert_eq!(index.len().unwrap(), 1);
        assert!(index.get_by_path("stale.json").unwrap().is_none());
    }

    #[test]
    fn filter_restricts_by_tag() {
        let index = InvertedIndex::open_in_memory().unwrap();
        let mut rule_doc = doc("r1.json", "use pep8 style");
        rule_doc.kind = "rule".to_string();
        index.update(rule_doc).unwrap();
        index.update(doc("m1.json", "use pep8 style")).unwrap();

        let filter = SearchFilter { kind: Some("rule".to_string()), ..Default::default() };
        let hits = index.search("pep8", Some(&filter), 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fields.path, "r1.json");
    }

    #[test]
    fn search_query_cannot_inject_fts5_operators() {
        let index = InvertedIndex::open_in_memory().unwrap();
        index.update(doc("a.json", "alpha beta")).unwrap();
        // A naive MATCH with this raw string would be invalid FTS5 syntax
        // (an unbalanced quote); sanitisation must quote every token so
        // the query is still accepted and searches literally.
        let hits = index.search("alpha \"", None, 10).unwrap();
        assert!(!hits.is_empty());
    }
}
