// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed fact store with vector BLOB storage and brute-force
//! cosine similarity search.
//!
//! The contract is behavioral, not algorithmic: a native vector index could
//! replace the scan as long as filter semantics, descending-score order,
//! and id tie-breaking are preserved.

use rusqlite::types::Value;
use tokio_rusqlite::Connection;
use tracing::debug;

use engram_core::EngramError;

use crate::types::{
    blob_to_vec, cosine_similarity, vec_to_blob, FactRecord, QueueEntry, SearchFilters, SearchHit,
};

/// Converts tokio_rusqlite errors into `EngramError::Storage`.
fn storage_err(e: tokio_rusqlite::Error) -> EngramError {
    EngramError::Storage {
        source: Box::new(e),
    }
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS memories (
        id              TEXT PRIMARY KEY,
        timeStamp       TEXT NOT NULL,
        floatTimeStamp  REAL NOT NULL,
        weekday         TEXT,
        category        TEXT,
        subcategory     TEXT,
        memoryClass     TEXT,
        memory          TEXT NOT NULL,
        originalMemory  TEXT,
        compressedMemory TEXT,
        topicId         INTEGER,
        topicSummary    TEXT,
        speakerId       TEXT,
        speakerName     TEXT,
        hitTime         INTEGER DEFAULT 0,
        updateQueue     TEXT,
        embedding       BLOB,
        createdAt       TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );

    CREATE INDEX IF NOT EXISTS idx_memories_floatTimeStamp ON memories(floatTimeStamp);
    CREATE INDEX IF NOT EXISTS idx_memories_speakerId ON memories(speakerId);
    CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category);
";

const COLUMNS: &str = "id, timeStamp, floatTimeStamp, weekday, category, subcategory, \
     memoryClass, memory, originalMemory, compressedMemory, topicId, topicSummary, \
     speakerId, speakerName, hitTime, updateQueue";

/// Persistent store for fact records.
pub struct FactStore {
    conn: Connection,
    dimensions: usize,
}

impl FactStore {
    /// Opens (and if needed creates) the store at `path`.
    pub async fn open(path: &str, dimensions: usize, wal_mode: bool) -> Result<Self, EngramError> {
        let conn = Connection::open(path).await.map_err(storage_err)?;
        Self::initialize(conn, dimensions, wal_mode).await
    }

    /// Opens an in-memory store, used by tests and throwaway sessions.
    pub async fn open_in_memory(dimensions: usize) -> Result<Self, EngramError> {
        let conn = Connection::open_in_memory().await.map_err(storage_err)?;
        Self::initialize(conn, dimensions, false).await
    }

    async fn initialize(
        conn: Connection,
        dimensions: usize,
        wal_mode: bool,
    ) -> Result<Self, EngramError> {
        if dimensions == 0 {
            return Err(EngramError::Config(
                "store dimensions must be positive".into(),
            ));
        }
        conn.call(move |conn| {
            if wal_mode {
                conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            }
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(storage_err)?;
        debug!(dimensions, "fact store initialized");
        Ok(Self { conn, dimensions })
    }

    /// The configured embedding dimension.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Upserts a record by id.
    ///
    /// The embedding travels inside the record and must match the store's
    /// configured dimension.
    pub async fn insert(&self, record: &FactRecord) -> Result<(), EngramError> {
        if record.embedding.len() != self.dimensions {
            return Err(EngramError::Config(format!(
                "embedding dimension mismatch: record has {}, store expects {}",
                record.embedding.len(),
                self.dimensions
            )));
        }

        let r = record.clone();
        let embedding_blob = vec_to_blob(&r.embedding);
        let update_queue_json = serialize_queue(&r.update_queue)?;

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO memories (id, timeStamp, floatTimeStamp, weekday, \
                     category, subcategory, memoryClass, memory, originalMemory, \
                     compressedMemory, topicId, topicSummary, speakerId, speakerName, hitTime, \
                     updateQueue, embedding) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                    rusqlite::params![
                        r.id,
                        r.time_stamp,
                        r.float_time_stamp,
                        r.weekday,
                        r.category,
                        r.subcategory,
                        r.memory_class,
                        r.memory,
                        r.original_memory,
                        r.compressed_memory,
                        r.topic_id,
                        r.topic_summary,
                        r.speaker_id,
                        r.speaker_name,
                        r.hit_time,
                        update_queue_json,
                        embedding_blob,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    /// Single-record read including the embedding.
    pub async fn get(&self, id: &str) -> Result<Option<FactRecord>, EngramError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let sql = format!("SELECT {COLUMNS}, embedding FROM memories WHERE id = ?1");
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query(rusqlite::params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_record(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(storage_err)
    }

    /// Full scan; order is unspecified. Used by the consolidator, which
    /// must tolerate large results.
    pub async fn get_all(&self, include_embedding: bool) -> Result<Vec<FactRecord>, EngramError> {
        self.conn
            .call(move |conn| {
                let sql = if include_embedding {
                    format!("SELECT {COLUMNS}, embedding FROM memories")
                } else {
                    format!("SELECT {COLUMNS}, NULL AS embedding FROM memories")
                };
                let mut stmt = conn.prepare(&sql)?;
                let records = stmt
                    .query_map([], |row| row_to_record(row))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
            .map_err(storage_err)
    }

    /// Field-level patch. Only the fields carried by [`FactPatch`] can
    /// mutate; identity fields and `originalMemory` are immutable by
    /// construction.
    pub async fn update(&self, id: &str, patch: FactPatch) -> Result<(), EngramError> {
        if let Some(embedding) = &patch.embedding {
            if embedding.len() != self.dimensions {
                return Err(EngramError::Config(format!(
                    "embedding dimension mismatch: patch has {}, store expects {}",
                    embedding.len(),
                    self.dimensions
                )));
            }
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(memory) = patch.memory {
            sets.push("memory = ?");
            params.push(Value::Text(memory));
        }
        if let Some(category) = patch.category {
            sets.push("category = ?");
            params.push(Value::Text(category));
        }
        if let Some(subcategory) = patch.subcategory {
            sets.push("subcategory = ?");
            params.push(Value::Text(subcategory));
        }
        if let Some(hit_time) = patch.hit_time {
            sets.push("hitTime = ?");
            params.push(Value::Integer(hit_time));
        }
        if let Some(queue) = patch.update_queue {
            sets.push("updateQueue = ?");
            params.push(Value::Text(serialize_queue(&queue)?));
        }
        if let Some(embedding) = patch.embedding {
            sets.push("embedding = ?");
            params.push(Value::Blob(vec_to_blob(&embedding)));
        }

        if sets.is_empty() {
            return Ok(());
        }

        let sql = format!("UPDATE memories SET {} WHERE id = ?", sets.join(", "));
        params.push(Value::Text(id.to_string()));

        self.conn
            .call(move |conn| {
                conn.execute(&sql, rusqlite::params_from_iter(params))?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    /// Hard remove. Deleting a missing id is a no-op.
    pub async fn delete(&self, id: &str) -> Result<(), EngramError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM memories WHERE id = ?1", rusqlite::params![id])?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    /// Total record count.
    pub async fn count(&self) -> Result<u64, EngramError> {
        self.conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(storage_err)
    }

    /// Top-k by cosine similarity, metadata filters AND-combined.
    ///
    /// Ordering is strictly descending by score; ties break by ascending id.
    pub async fn search(
        &self,
        query: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, EngramError> {
        if query.len() != self.dimensions {
            return Err(EngramError::Config(format!(
                "query dimension mismatch: query has {}, store expects {}",
                query.len(),
                self.dimensions
            )));
        }

        let query = query.to_vec();
        let filters = filters.clone();
        self.conn
            .call(move |conn| {
                let mut clauses: Vec<&str> = Vec::new();
                let mut params: Vec<Value> = Vec::new();

                if let Some(range) = &filters.float_time_stamp {
                    if let Some(gte) = range.gte {
                        clauses.push("floatTimeStamp >= ?");
                        params.push(Value::Real(gte));
                    }
                    if let Some(lte) = range.lte {
                        clauses.push("floatTimeStamp <= ?");
                        params.push(Value::Real(lte));
                    }
                }
                if let Some(speaker_id) = &filters.speaker_id {
                    clauses.push("speakerId = ?");
                    params.push(Value::Text(speaker_id.clone()));
                }
                if let Some(category) = &filters.category {
                    clauses.push("category = ?");
                    params.push(Value::Text(category.clone()));
                }

                let where_clause = if clauses.is_empty() {
                    String::new()
                } else {
                    format!(" WHERE {}", clauses.join(" AND "))
                };
                let sql = format!("SELECT {COLUMNS}, embedding FROM memories{where_clause}");

                let mut stmt = conn.prepare(&sql)?;
                let records = stmt
                    .query_map(rusqlite::params_from_iter(params), |row| row_to_record(row))?
                    .collect::<Result<Vec<_>, _>>()?;

                let mut hits: Vec<SearchHit> = records
                    .into_iter()
                    .filter(|r| r.embedding.len() == query.len())
                    .map(|record| SearchHit {
                        id: record.id.clone(),
                        score: cosine_similarity(&query, &record.embedding),
                        record,
                    })
                    .collect();

                hits.sort_by(|a, b| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.id.cmp(&b.id))
                });
                hits.truncate(k);
                Ok(hits)
            })
            .await
            .map_err(storage_err)
    }
}

/// The mutable subset of a fact record.
#[derive(Debug, Clone, Default)]
pub struct FactPatch {
    pub memory: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub hit_time: Option<i64>,
    pub update_queue: Option<Vec<QueueEntry>>,
    pub embedding: Option<Vec<f32>>,
}

fn serialize_queue(queue: &[QueueEntry]) -> Result<String, EngramError> {
    serde_json::to_string(queue).map_err(|e| EngramError::Storage {
        source: Box::new(e),
    })
}

/// Converts a row (the shared column list plus embedding) to a record.
fn row_to_record(row: &rusqlite::Row) -> Result<FactRecord, rusqlite::Error> {
    let update_queue_json: Option<String> = row.get(15)?;
    let update_queue: Vec<QueueEntry> = update_queue_json
        .as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default();
    let embedding_blob: Option<Vec<u8>> = row.get(16)?;

    Ok(FactRecord {
        id: row.get(0)?,
        time_stamp: row.get(1)?,
        float_time_stamp: row.get(2)?,
        weekday: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        category: row.get(4)?,
        subcategory: row.get(5)?,
        memory_class: row.get(6)?,
        memory: row.get(7)?,
        original_memory: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        compressed_memory: row.get(9)?,
        topic_id: row.get(10)?,
        topic_summary: row.get(11)?,
        speaker_id: row.get::<_, Option<String>>(12)?.unwrap_or_default(),
        speaker_name: row.get::<_, Option<String>>(13)?.unwrap_or_default(),
        hit_time: row.get::<_, Option<i64>>(14)?.unwrap_or_default(),
        update_queue,
        embedding: embedding_blob.map(|b| blob_to_vec(&b)).unwrap_or_default(),
    })
}
