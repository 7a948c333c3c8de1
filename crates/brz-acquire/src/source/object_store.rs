//! Object-storage source reader (S3-compatible)
//!
//! Downloads the object at open time (connect failures surface there),
//! repairs its character encoding, parses it as CSV, and serves the parsed
//! rows as in-memory chunks. Keys ending in `.gz` are gunzipped first.

use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::Client;
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::{debug, info};

use super::{ChunkRead, RawRecord, SourceReader};
use crate::error::{AcquireError, AcquireResult};
use crate::normalize;

/// Payloads above this size are decoded off the scheduling thread.
const BLOCKING_DECODE_BYTES: usize = 4 * 1024 * 1024;

/// Connection parameters for one object, resolved by the caller.
#[derive(Debug, Clone)]
pub struct ObjectStoreParams {
    pub bucket: String,
    pub key: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub path_style: bool,
}

/// Reader over one downloaded object. The row count is exact after parsing.
pub struct ObjectStoreReader {
    records: Vec<RawRecord>,
    cursor: usize,
}

impl ObjectStoreReader {
    pub async fn open(params: ObjectStoreParams) -> AcquireResult<Self> {
        let client = build_client(&params).await;

        debug!(bucket = %params.bucket, key = %params.key, "Downloading object");

        let response = client
            .get_object()
            .bucket(&params.bucket)
            .key(&params.key)
            .send()
            .await
            .map_err(|e| {
                AcquireError::Connect(format!(
                    "s3://{}/{} unreachable: {}",
                    params.bucket, params.key, e
                ))
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| AcquireError::Read(format!("object body read failed: {}", e)))?
            .into_bytes()
            .to_vec();

        let gzipped = params.key.ends_with(".gz");
        let text = decode_payload(bytes, gzipped).await?;
        let records = parse_csv(&text)?;

        info!(
            bucket = %params.bucket,
            key = %params.key,
            rows = records.len(),
            "Object parsed"
        );

        Ok(Self { records, cursor: 0 })
    }
}

#[async_trait::async_trait]
impl SourceReader for ObjectStoreReader {
    async fn count(&mut self) -> AcquireResult<i64> {
        // The object is already materialized, so the count is exact.
        Ok(self.records.len() as i64)
    }

    async fn next_chunk(&mut self, chunk_size: usize) -> AcquireResult<ChunkRead> {
        if self.cursor >= self.records.len() {
            return Ok(ChunkRead::Empty);
        }

        let offset = self.cursor as i64;
        let end = (self.cursor + chunk_size).min(self.records.len());
        let records = self.records[self.cursor..end].to_vec();
        self.cursor = end;

        Ok(ChunkRead::from_records(offset, records, chunk_size))
    }
}

async fn build_client(params: &ObjectStoreParams) -> Client {
    match (&params.access_key, &params.secret_key) {
        (Some(access_key), Some(secret_key)) => {
            let credentials =
                Credentials::new(access_key, secret_key, None, None, "brz-object-source");

            let mut builder = aws_sdk_s3::Config::builder()
                .credentials_provider(credentials)
                .region(Region::new(params.region.clone()))
                .force_path_style(params.path_style);

            if let Some(endpoint) = &params.endpoint {
                builder = builder.endpoint_url(endpoint);
            }

            Client::from_conf(builder.build())
        },
        _ => {
            // No static credentials: fall back to the ambient AWS environment.
            let shared = aws_config::from_env()
                .region(Region::new(params.region.clone()))
                .load()
                .await;

            let mut builder =
                aws_sdk_s3::config::Builder::from(&shared).force_path_style(params.path_style);

            if let Some(endpoint) = &params.endpoint {
                builder = builder.endpoint_url(endpoint);
            }

            Client::from_conf(builder.build())
        },
    }
}

/// Gunzip (when needed) and repair the payload encoding. Large payloads run
/// off the scheduling thread; this path never fails on bad bytes, only on a
/// truncated gzip stream.
async fn decode_payload(bytes: Vec<u8>, gzipped: bool) -> AcquireResult<String> {
    if bytes.len() > BLOCKING_DECODE_BYTES {
        tokio::task::spawn_blocking(move || decode_payload_sync(bytes, gzipped))
            .await
            .map_err(|e| AcquireError::Read(format!("decode task failed: {}", e)))?
    } else {
        decode_payload_sync(bytes, gzipped)
    }
}

fn decode_payload_sync(bytes: Vec<u8>, gzipped: bool) -> AcquireResult<String> {
    let raw = if gzipped {
        let mut decoder = GzDecoder::new(bytes.as_slice());
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| AcquireError::Read(format!("gzip decompression failed: {}", e)))?;
        decompressed
    } else {
        bytes
    };

    Ok(normalize::decode_bytes(&raw))
}

/// Parse CSV text into raw records; the header row names the columns.
/// Short rows pad missing trailing fields with empty strings.
fn parse_csv(text: &str) -> AcquireResult<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AcquireError::Read(format!("csv header parse failed: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| AcquireError::Read(format!("csv row parse failed: {}", e)))?;

        let mut record = RawRecord::new();
        for (i, name) in headers.iter().enumerate() {
            let value = row.get(i).unwrap_or("");
            record.push(name.clone(), serde_json::Value::String(value.to_string()));
        }
        records.push(record);
    }

    Ok(records)
}
