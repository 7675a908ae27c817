//! Access-log ingestion into SQLite.
//!
//! One log file is one transaction: every record in the file is inserted, or
//! none is. Files committed earlier are never touched by a later failure.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use flate2::read::MultiGzDecoder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::schema::TableSchema;

/// Open (creating if missing) the SQLite file at `path`.
///
/// A single connection is used; the tool never writes concurrently.
pub async fn open_store(path: &Path) -> Result<SqlitePool, IngestError> {
    let opts = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Off);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await?;
    debug!("Opened store {:?}", path);
    Ok(pool)
}

/// Decompress a gzip body in full.
pub fn decompress(body: &[u8]) -> Result<Vec<u8>, IngestError> {
    let mut out = Vec::new();
    MultiGzDecoder::new(body)
        .read_to_end(&mut out)
        .map_err(IngestError::Decompress)?;
    Ok(out)
}

/// Loads log objects from one bucket into the `logs` table.
pub struct IngestionEngine {
    store: Arc<dyn ObjectStore>,
    pool: SqlitePool,
    schema: TableSchema,
}

impl IngestionEngine {
    /// Create the engine and make sure the table and unique index exist.
    pub async fn new(
        store: Arc<dyn ObjectStore>,
        pool: SqlitePool,
        schema: TableSchema,
    ) -> Result<Self, IngestError> {
        for statement in schema.init_statements() {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self {
            store,
            pool,
            schema,
        })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Fetch, decompress and load one object.
    ///
    /// Returns the number of records executed, including rows the unique
    /// index silently dropped. Errors carry the object key.
    pub async fn ingest(&self, key: &str) -> Result<u64, IngestError> {
        self.ingest_object(key)
            .await
            .map_err(|e| e.for_key(key))
    }

    async fn ingest_object(&self, key: &str) -> Result<u64, IngestError> {
        let body = self
            .store
            .get(&ObjectPath::from(key))
            .await?
            .bytes()
            .await?;
        debug!("Fetched {} bytes from {}", body.len(), key);

        let data = decompress(&body)?;
        let rows = self.load(&data).await?;
        info!("Loaded {} records from {}", rows, key);
        Ok(rows)
    }

    /// Ingest at most `max` of `keys`, in the order given, stopping at the
    /// first failure. Keys past the limit are never fetched.
    ///
    /// Returns the total number of records executed.
    pub async fn ingest_all<'a>(
        &self,
        keys: impl IntoIterator<Item = &'a str>,
        max: usize,
    ) -> Result<u64, IngestError> {
        let mut rows = 0;
        for key in keys.into_iter().take(max) {
            info!("Processing {}", key);
            rows += self.ingest(key).await?;
        }
        Ok(rows)
    }

    /// Load already-decompressed log lines in a single transaction.
    pub async fn load(&self, data: &[u8]) -> Result<u64, IngestError> {
        let mut tx = self.pool.begin().await?;
        match self.insert_records(data, &mut tx).await {
            Ok(rows) => {
                tx.commit().await?;
                Ok(rows)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    async fn insert_records(
        &self,
        data: &[u8],
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    ) -> Result<u64, IngestError> {
        let expected = self.schema.width();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .flexible(true)
            .from_reader(data);

        let insert = self.schema.insert_sql();
        let mut record = csv::ByteRecord::new();
        let mut rows = 0u64;
        while reader.read_byte_record(&mut record)? {
            if record.len() != expected {
                return Err(IngestError::FieldCount {
                    line: record.position().map_or(0, |p| p.line()),
                    expected,
                    found: record.len(),
                });
            }

            let mut query = sqlx::query(insert);
            for value in record.iter() {
                query = query.bind(String::from_utf8_lossy(value).into_owned());
            }
            query.execute(&mut **tx).await?;
            rows += 1;
        }
        Ok(rows)
    }

    /// Run `PRAGMA optimize` and close the store.
    pub async fn close(self) {
        if let Err(e) = sqlx::query("PRAGMA optimize").execute(&self.pool).await {
            debug!("PRAGMA optimize failed: {}", e);
        }
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldSchema;
    use crate::schema::SchemaBuilder;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use object_store::memory::InMemory;
    use std::io::Write;

    fn gzip(text: &str) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(text.as_bytes()).unwrap();
        enc.finish().unwrap()
    }

    async fn engine(dir: &Path, fields: &[&str]) -> (IngestionEngine, Arc<InMemory>) {
        let store = Arc::new(InMemory::new());
        let pool = open_store(&dir.join("test.db")).await.unwrap();
        let schema = SchemaBuilder::build(&FieldSchema::new(fields.iter().copied()).unwrap());
        let engine = IngestionEngine::new(store.clone(), pool, schema).await.unwrap();
        (engine, store)
    }

    async fn count(engine: &IngestionEngine) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM logs")
            .fetch_one(engine.pool())
            .await
            .unwrap()
    }

    #[test]
    fn test_decompress_rejects_plain_text() {
        let err = decompress(b"not gzip at all").unwrap_err();
        assert!(matches!(err, IngestError::Decompress(_)));
    }

    #[test]
    fn test_decompress_roundtrip() {
        assert_eq!(decompress(&gzip("a b c\n")).unwrap(), b"a b c\n");
    }

    #[tokio::test]
    async fn test_load_quoted_fields() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _) = engine(dir.path(), &["kind", "request", "elb_status_code"]).await;

        let rows = engine
            .load(b"http \"GET http://example.com:80/ HTTP/1.1\" 200\n")
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let (request, status): (String, i64) =
            sqlx::query_as("SELECT request, elb_status_code FROM logs")
                .fetch_one(engine.pool())
                .await
                .unwrap();
        assert_eq!(request, "GET http://example.com:80/ HTTP/1.1");
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_field_count_mismatch_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _) = engine(dir.path(), &["a", "b", "c"]).await;

        let err = engine.load(b"1 2 3\n4 5 6\n7 8\n").await.unwrap_err();
        match err {
            IngestError::FieldCount {
                line,
                expected,
                found,
            } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(count(&engine).await, 0);
    }

    #[tokio::test]
    async fn test_ingest_attaches_key_to_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, store) = engine(dir.path(), &["a"]).await;
        store
            .put(&ObjectPath::from("logs/broken.log.gz"), b"plain".to_vec().into())
            .await
            .unwrap();

        let err = engine.ingest("logs/broken.log.gz").await.unwrap_err();
        match err {
            IngestError::File { key, source } => {
                assert_eq!(key, "logs/broken.log.gz");
                assert!(matches!(*source, IngestError::Decompress(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_ingest_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _) = engine(dir.path(), &["a"]).await;

        let err = engine.ingest("nope.log.gz").await.unwrap_err();
        match err {
            IngestError::File { source, .. } => {
                assert!(matches!(*source, IngestError::Storage(_)))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_ingest_gzip_object() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, store) = engine(dir.path(), &["a", "b"]).await;
        store
            .put(&ObjectPath::from("x.log.gz"), gzip("1 2\n3 4\n").into())
            .await
            .unwrap();

        assert_eq!(engine.ingest("x.log.gz").await.unwrap(), 2);
        assert_eq!(count(&engine).await, 2);
        engine.close().await;
    }

    #[tokio::test]
    async fn test_ingest_all_stops_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, store) = engine(dir.path(), &["file"]).await;
        let keys = ["c.log.gz", "a.log.gz", "b.log.gz"];
        for key in keys {
            store
                .put(&ObjectPath::from(key), gzip(&format!("{key}\n")).into())
                .await
                .unwrap();
        }

        assert_eq!(engine.ingest_all(keys, 2).await.unwrap(), 2);

        let loaded: Vec<String> = sqlx::query_scalar("SELECT file FROM logs ORDER BY rowid")
            .fetch_all(engine.pool())
            .await
            .unwrap();
        assert_eq!(loaded, vec!["c.log.gz", "a.log.gz"]);
    }

    #[tokio::test]
    async fn test_ingest_all_never_fetches_past_limit() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, store) = engine(dir.path(), &["file"]).await;
        store
            .put(&ObjectPath::from("first.log.gz"), gzip("first\n").into())
            .await
            .unwrap();

        // The second key does not exist; a limit of one must not reach it.
        let keys = ["first.log.gz", "missing.log.gz"];
        assert_eq!(engine.ingest_all(keys, 1).await.unwrap(), 1);

        let err = engine.ingest_all(keys, 2).await.unwrap_err();
        assert!(matches!(err, IngestError::File { key, .. } if key == "missing.log.gz"));
    }
}
