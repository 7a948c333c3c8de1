//! Source readers
//!
//! A [`SourceDescriptor`] carries everything needed to reach one source:
//! kind, live connection parameters (credential resolution happens upstream),
//! and source-specific addressing. [`open_reader`] turns a descriptor into a
//! reader owned by exactly one extraction task; readers are sequential and
//! must never be shared across tasks.
//!
//! - **database**: Postgres table or SQL statement, offset-paged
//! - **api**: REST endpoint returning JSON pages
//! - **object_store**: S3 object (CSV, optionally gzipped)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;
use crate::error::{AcquireError, AcquireResult};

pub mod api;
pub mod database;
pub mod object_store;

pub use api::ApiReader;
pub use database::DatabaseReader;
pub use object_store::ObjectStoreReader;

fn default_page_size() -> usize {
    1_000
}

/// Everything needed to reach one source. Immutable once a task starts;
/// owned by the caller and read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDescriptor {
    Database {
        /// Live connection string; secrets already resolved by the caller.
        url: String,
        /// Source table, optionally schema-qualified. Exactly one of
        /// `table`/`sql` must be set.
        #[serde(default)]
        table: Option<String>,
        /// Full SELECT statement to extract.
        #[serde(default)]
        sql: Option<String>,
    },
    Api {
        /// Endpoint returning a JSON array of flat objects per page.
        endpoint: String,
        #[serde(default = "default_page_size")]
        page_size: usize,
        #[serde(default)]
        bearer_token: Option<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    ObjectStore {
        bucket: String,
        /// Object key; a `.gz` suffix selects gzip decompression.
        key: String,
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
        /// Static credentials; when absent the ambient AWS environment is used.
        #[serde(default)]
        access_key: Option<String>,
        #[serde(default)]
        secret_key: Option<String>,
        #[serde(default)]
        path_style: bool,
    },
}

impl SourceDescriptor {
    /// Validate the calling convention before any task starts.
    pub fn validate(&self) -> AcquireResult<()> {
        match self {
            SourceDescriptor::Database { url, table, sql } => {
                if url.is_empty() {
                    return Err(AcquireError::Config(
                        "database source requires a connection url".to_string(),
                    ));
                }
                match (table, sql) {
                    (Some(_), None) | (None, Some(_)) => Ok(()),
                    _ => Err(AcquireError::Config(
                        "database source requires exactly one of 'table' or 'sql'".to_string(),
                    )),
                }
            },
            SourceDescriptor::Api { endpoint, page_size, .. } => {
                if endpoint.is_empty() {
                    return Err(AcquireError::Config("api source requires an endpoint".to_string()));
                }
                if *page_size == 0 {
                    return Err(AcquireError::Config("api page_size must be greater than 0".to_string()));
                }
                Ok(())
            },
            SourceDescriptor::ObjectStore { bucket, key, access_key, secret_key, .. } => {
                if bucket.is_empty() || key.is_empty() {
                    return Err(AcquireError::Config(
                        "object store source requires bucket and key".to_string(),
                    ));
                }
                if access_key.is_some() != secret_key.is_some() {
                    return Err(AcquireError::Config(
                        "object store credentials require both access_key and secret_key".to_string(),
                    ));
                }
                Ok(())
            },
        }
    }

    /// Short label for logging.
    pub fn address(&self) -> String {
        match self {
            SourceDescriptor::Database { table: Some(t), .. } => t.clone(),
            SourceDescriptor::Database { sql: Some(_), .. } => "<sql>".to_string(),
            SourceDescriptor::Database { .. } => "<unaddressed>".to_string(),
            SourceDescriptor::Api { endpoint, .. } => endpoint.clone(),
            SourceDescriptor::ObjectStore { bucket, key, .. } => format!("s3://{}/{}", bucket, key),
        }
    }
}

/// One raw record: ordered (column name, value) pairs exactly as produced by
/// the source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    pub fields: Vec<(String, serde_json::Value)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.fields.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Column names in source order.
    pub fn column_names(&self) -> Vec<String> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Outcome of one chunk read. Empty and short reads are normal terminal
/// states, not faults.
#[derive(Debug)]
pub enum ChunkRead {
    /// Zero rows: the source is exhausted (or was empty to begin with).
    Empty,
    /// A short chunk: the last one this source will produce.
    Partial(Chunk),
    /// A full chunk: more may follow.
    Complete(Chunk),
}

impl ChunkRead {
    pub fn from_records(offset: i64, records: Vec<crate::source::RawRecord>, requested: usize) -> Self {
        if records.is_empty() {
            ChunkRead::Empty
        } else if records.len() < requested {
            ChunkRead::Partial(Chunk::new(offset, records))
        } else {
            ChunkRead::Complete(Chunk::new(offset, records))
        }
    }
}

/// Sequential reader over one source. `&mut self` on every method keeps a
/// reader confined to the task that opened it.
#[async_trait]
pub trait SourceReader: Send {
    /// Best-effort total row count; 0 when unknown (API pages).
    async fn count(&mut self) -> AcquireResult<i64>;

    /// Read the next chunk in strict offset order.
    async fn next_chunk(&mut self, chunk_size: usize) -> AcquireResult<ChunkRead>;
}

/// Open a reader for the descriptor. Fails with [`AcquireError::Connect`]
/// when the source cannot be reached.
pub async fn open_reader(descriptor: &SourceDescriptor) -> AcquireResult<Box<dyn SourceReader>> {
    descriptor.validate()?;

    match descriptor {
        SourceDescriptor::Database { url, table, sql } => {
            let reader = DatabaseReader::open(url, table.as_deref(), sql.as_deref()).await?;
            Ok(Box::new(reader))
        },
        SourceDescriptor::Api { endpoint, page_size, bearer_token, timeout_secs } => {
            let reader =
                ApiReader::open(endpoint, *page_size, bearer_token.as_deref(), *timeout_secs)?;
            Ok(Box::new(reader))
        },
        SourceDescriptor::ObjectStore {
            bucket,
            key,
            region,
            endpoint,
            access_key,
            secret_key,
            path_style,
        } => {
            let reader = ObjectStoreReader::open(object_store::ObjectStoreParams {
                bucket: bucket.clone(),
                key: key.clone(),
                region: region.clone(),
                endpoint: endpoint.clone(),
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
                path_style: *path_style,
            })
            .await?;
            Ok(Box::new(reader))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_descriptor_requires_one_address() {
        let both = SourceDescriptor::Database {
            url: "postgresql://localhost/src".to_string(),
            table: Some("public.orders".to_string()),
            sql: Some("SELECT 1".to_string()),
        };
        assert!(both.validate().is_err());

        let neither = SourceDescriptor::Database {
            url: "postgresql://localhost/src".to_string(),
            table: None,
            sql: None,
        };
        assert!(neither.validate().is_err());

        let table_only = SourceDescriptor::Database {
            url: "postgresql://localhost/src".to_string(),
            table: Some("public.orders".to_string()),
            sql: None,
        };
        assert!(table_only.validate().is_ok());
    }

    #[test]
    fn test_object_store_credentials_come_in_pairs() {
        let half = SourceDescriptor::ObjectStore {
            bucket: "landing".to_string(),
            key: "exports/orders.csv".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key: Some("AK".to_string()),
            secret_key: None,
            path_style: false,
        };
        assert!(half.validate().is_err());
    }

    #[test]
    fn test_descriptor_roundtrips_through_json() {
        let descriptor = SourceDescriptor::Api {
            endpoint: "https://api.example.com/v1/orders".to_string(),
            page_size: 500,
            bearer_token: None,
            timeout_secs: Some(30),
        };
        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(json.contains("\"kind\":\"api\""));
        let back: SourceDescriptor = serde_json::from_str(&json).unwrap();
        assert!(back.validate().is_ok());
    }

    #[test]
    fn test_raw_record_preserves_field_order() {
        let mut record = RawRecord::new();
        record.push("zeta", serde_json::json!("1"));
        record.push("alpha", serde_json::json!("2"));
        assert_eq!(record.column_names(), vec!["zeta", "alpha"]);
        assert_eq!(record.get("alpha"), Some(&serde_json::json!("2")));
    }

    #[test]
    fn test_chunk_read_tagging() {
        let full: Vec<RawRecord> = (0..10).map(|_| RawRecord::new()).collect();
        assert!(matches!(ChunkRead::from_records(0, full, 10), ChunkRead::Complete(_)));

        let short: Vec<RawRecord> = (0..3).map(|_| RawRecord::new()).collect();
        assert!(matches!(ChunkRead::from_records(10, short, 10), ChunkRead::Partial(_)));

        assert!(matches!(ChunkRead::from_records(13, Vec::new(), 10), ChunkRead::Empty));
    }
}
