use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use swat_core::error::{codes, AppError};
use tracing::info;

use super::{Index, IndexEntry, IndexManifest};
use crate::corpus::Chunk;

pub const INDEX_FILE_NAME: &str = "index.sqlite";
const FORMAT_VERSION: &str = "1";

const SCHEMA: &str = r#"
CREATE TABLE meta (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
CREATE TABLE chunks (
    seq INTEGER PRIMARY KEY NOT NULL,
    chunk_id TEXT NOT NULL UNIQUE,
    source TEXT NOT NULL,
    rel_path TEXT NOT NULL,
    page INTEGER,
    sequence_index INTEGER NOT NULL,
    text TEXT NOT NULL,
    text_sha256 TEXT NOT NULL,
    char_start INTEGER NOT NULL,
    char_end INTEGER NOT NULL,
    embedding BLOB NOT NULL
);
"#;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStatus {
    pub ready: bool,
    pub path: String,
    pub manifest: Option<IndexManifest>,
}

/// On-disk home of one corpus index: a directory holding `index.sqlite`.
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    pub fn open(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        self.dir.as_path()
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE_NAME)
    }

    fn tmp_path(&self) -> PathBuf {
        self.dir.join(format!("{INDEX_FILE_NAME}.tmp"))
    }

    pub fn exists(&self) -> bool {
        self.index_path().is_file()
    }

    fn ensure_dirs(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::new(codes::INDEX_STORE_FAILED, "Failed to create index directory")
                .with_details(format!("path={}; err={}", self.dir.display(), e))
        })
    }

    pub fn status(&self) -> Result<IndexStatus, AppError> {
        let path = self.index_path();
        if !path.is_file() {
            return Ok(IndexStatus {
                ready: false,
                path: path.display().to_string(),
                manifest: None,
            });
        }
        let conn = open_read_only(&path)?;
        let manifest = read_manifest(&conn)?;
        Ok(IndexStatus {
            ready: true,
            path: path.display().to_string(),
            manifest: Some(manifest),
        })
    }

    /// Writes the whole index to a temp file and renames it over the live one. A failure at
    /// any step leaves a previously saved index untouched.
    pub fn save(&self, index: &Index) -> Result<(), AppError> {
        self.ensure_dirs()?;
        let tmp = self.tmp_path();
        let path = self.index_path();

        if tmp.exists() {
            fs::remove_file(&tmp).map_err(|e| {
                AppError::new(codes::INDEX_STORE_FAILED, "Failed to remove stale index temp file")
                    .with_details(format!("path={}; err={}", tmp.display(), e))
            })?;
        }

        if let Err(e) = write_index_file(&tmp, index) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            AppError::new(codes::INDEX_STORE_FAILED, "Failed to finalize index write")
                .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
        })?;

        info!(
            path = %path.display(),
            chunks = index.entries().len(),
            "index saved"
        );
        Ok(())
    }

    pub fn load(&self) -> Result<Index, AppError> {
        let path = self.index_path();
        if !path.is_file() {
            return Err(AppError::new(codes::INDEX_NOT_FOUND, "No persisted index found")
                .with_details(format!("path={}", path.display())));
        }

        let conn = open_read_only(&path)?;
        let manifest = read_manifest(&conn)?;
        let entries = read_entries(&conn)?;
        let index = Index::new(manifest, entries).map_err(|e| {
            AppError::new(codes::INDEX_STORE_FAILED, "Persisted index is inconsistent")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;

        info!(path = %path.display(), chunks = index.entries().len(), "index loaded");
        Ok(index)
    }
}

fn open_read_only(path: &Path) -> Result<Connection, AppError> {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(|e| {
        AppError::new(codes::INDEX_STORE_FAILED, "Failed to open index database")
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

fn store_err(message: &str) -> impl Fn(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::new(codes::INDEX_STORE_FAILED, message).with_details(e.to_string())
}

fn write_index_file(path: &Path, index: &Index) -> Result<(), AppError> {
    let mut conn = Connection::open(path).map_err(|e| {
        AppError::new(codes::INDEX_STORE_FAILED, "Failed to create index database")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    conn.execute_batch(SCHEMA)
        .map_err(store_err("Failed to create index schema"))?;

    let manifest_json = serde_json::to_string(index.manifest()).map_err(|e| {
        AppError::new(codes::INDEX_STORE_FAILED, "Failed to encode index manifest")
            .with_details(e.to_string())
    })?;

    let tx = conn
        .transaction()
        .map_err(store_err("Failed to start index transaction"))?;
    tx.execute(
        "INSERT INTO meta(key, value) VALUES ('format_version', ?1), ('manifest', ?2)",
        params![FORMAT_VERSION, manifest_json],
    )
    .map_err(store_err("Failed to write index manifest"))?;

    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO chunks(seq, chunk_id, source, rel_path, page, sequence_index, text, \
                 text_sha256, char_start, char_end, embedding) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )
            .map_err(store_err("Failed to prepare chunk insert"))?;
        for (seq, e) in index.entries().iter().enumerate() {
            let c = &e.chunk;
            stmt.execute(params![
                seq as i64,
                c.chunk_id,
                c.source,
                c.rel_path,
                c.page,
                c.sequence_index,
                c.text,
                c.text_sha256,
                c.char_range[0],
                c.char_range[1],
                encode_vector(&e.vector),
            ])
            .map_err(store_err("Failed to write indexed chunk"))?;
        }
    }

    tx.commit()
        .map_err(store_err("Failed to commit index transaction"))?;
    conn.close()
        .map_err(|(_, e)| store_err("Failed to close index database")(e))?;
    Ok(())
}

fn read_manifest(conn: &Connection) -> Result<IndexManifest, AppError> {
    let version: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'format_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(store_err("Failed to read index format version"))?;
    if version.as_deref() != Some(FORMAT_VERSION) {
        return Err(AppError::new(
            codes::INDEX_STORE_FAILED,
            "Unsupported index format; rebuild the index",
        )
        .with_details(format!("format_version={version:?}")));
    }

    let raw: String = conn
        .query_row("SELECT value FROM meta WHERE key = 'manifest'", [], |row| {
            row.get(0)
        })
        .map_err(store_err("Failed to read index manifest"))?;
    serde_json::from_str(&raw).map_err(|e| {
        AppError::new(codes::INDEX_STORE_FAILED, "Failed to decode index manifest")
            .with_details(e.to_string())
    })
}

fn read_entries(conn: &Connection) -> Result<Vec<IndexEntry>, AppError> {
    let mut stmt = conn
        .prepare(
            "SELECT chunk_id, source, rel_path, page, sequence_index, text, text_sha256, \
             char_start, char_end, embedding FROM chunks ORDER BY seq ASC",
        )
        .map_err(store_err("Failed to query indexed chunks"))?;

    let rows = stmt
        .query_map([], |row| {
            let chunk = Chunk {
                chunk_id: row.get(0)?,
                source: row.get(1)?,
                rel_path: row.get(2)?,
                page: row.get(3)?,
                sequence_index: row.get(4)?,
                text: row.get(5)?,
                text_sha256: row.get(6)?,
                char_range: [row.get(7)?, row.get(8)?],
            };
            let blob: Vec<u8> = row.get(9)?;
            Ok((chunk, blob))
        })
        .map_err(store_err("Failed to read indexed chunks"))?;

    let mut out = Vec::new();
    for r in rows {
        let (chunk, blob) = r.map_err(store_err("Failed to read indexed chunk row"))?;
        let vector = decode_vector(&blob).ok_or_else(|| {
            AppError::new(codes::INDEX_STORE_FAILED, "Corrupt embedding blob")
                .with_details(format!("chunk_id={}; bytes={}", chunk.chunk_id, blob.len()))
        })?;
        out.push(IndexEntry { chunk, vector });
    }
    Ok(out)
}

// f32 little-endian.
fn encode_vector(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}
