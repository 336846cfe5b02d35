//! SQLite response cache
//!
//! Each netloc gets its own database file under the cache root, named after
//! the netloc with dots replaced by underscores.

use crate::cache::policy::CachePolicy;
use crate::cache::schema::initialize_schema;
use crate::cache::{CacheError, CacheResult, ResponseCache};
use crate::transport::{Request, Response};
use crate::url::cache_partition_name;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// File extension of partition databases
const PARTITION_EXTENSION: &str = "sqlite";

/// SQLite-backed response cache for one partition
pub struct SqliteCache {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    policy: CachePolicy,
}

impl std::fmt::Debug for SqliteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCache")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Returns the database path of the partition for a netloc
///
/// ```
/// use mannerly::cache::partition_path;
/// use std::path::Path;
///
/// assert_eq!(
///     partition_path(Path::new("data/cache/"), "pleiades.stoa.org"),
///     Path::new("data/cache/pleiades_stoa_org.sqlite")
/// );
/// ```
pub fn partition_path(cache_dir: &Path, netloc: &str) -> PathBuf {
    cache_dir.join(format!(
        "{}.{}",
        cache_partition_name(netloc),
        PARTITION_EXTENSION
    ))
}

impl SqliteCache {
    /// Opens (or creates) the partition for a netloc under `cache_dir`
    ///
    /// The cache directory is created if it does not exist.
    pub fn open(cache_dir: &Path, netloc: &str, policy: CachePolicy) -> CacheResult<Self> {
        std::fs::create_dir_all(cache_dir)?;
        Self::open_path(&partition_path(cache_dir, netloc), policy)
    }

    /// Opens (or creates) a cache database at an explicit path
    pub fn open_path(path: &Path, policy: CachePolicy) -> CacheResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
            policy,
        })
    }

    /// Creates an in-memory cache
    pub fn in_memory(policy: CachePolicy) -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
            policy,
        })
    }

    /// Location of the database file, if on disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of stored responses, fresh or not
    pub fn len(&self) -> CacheResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Returns true if nothing is stored
    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Removes every stored response
    pub fn clear(&self) -> CacheResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM responses", [])?;
        Ok(())
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }
}

impl ResponseCache for SqliteCache {
    fn lookup(&self, request: &Request) -> CacheResult<Option<Response>> {
        if self.policy.skips_lookup(&request.headers) {
            return Ok(None);
        }

        let key = cache_key(request);
        let row = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT response_url, status, headers, body, stored_at FROM responses WHERE cache_key = ?1",
                params![key],
                |row| {
                    Ok(StoredRow {
                        response_url: row.get(0)?,
                        status: row.get(1)?,
                        headers: row.get(2)?,
                        body: row.get(3)?,
                        stored_at: row.get(4)?,
                    })
                },
            )
            .optional()?
        };

        let Some(row) = row else {
            return Ok(None);
        };

        let stored_at = parse_timestamp(&row.stored_at)?;
        let response = row.into_response()?;
        if !self.policy.is_fresh(stored_at, &response.headers, Utc::now()) {
            tracing::debug!(url = %request.url, "Cached response expired");
            return Ok(None);
        }

        Ok(Some(response))
    }

    fn store(&self, request: &Request, response: &Response) -> CacheResult<()> {
        if !response.status.is_success() {
            return Ok(());
        }
        if !self
            .policy
            .is_storable(&request.headers, &response.headers)
        {
            return Ok(());
        }

        let headers = serde_json::to_string(&header_pairs(&response.headers))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO responses
             (cache_key, method, request_url, response_url, status, headers, body, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                cache_key(request),
                request.method.as_str(),
                request.url.as_str(),
                response.url.as_str(),
                response.status.as_u16(),
                headers,
                response.body,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

struct StoredRow {
    response_url: String,
    status: u16,
    headers: String,
    body: Vec<u8>,
    stored_at: String,
}

impl StoredRow {
    fn into_response(self) -> CacheResult<Response> {
        let url = Url::parse(&self.response_url)
            .map_err(|e| CacheError::Corrupt(format!("bad url '{}': {}", self.response_url, e)))?;
        let status = StatusCode::from_u16(self.status)
            .map_err(|e| CacheError::Corrupt(format!("bad status {}: {}", self.status, e)))?;
        let pairs: Vec<(String, String)> = serde_json::from_str(&self.headers)?;

        Ok(Response {
            url,
            status,
            headers: headers_from_stored(&pairs),
            body: self.body,
            from_cache: true,
        })
    }
}

fn parse_timestamp(raw: &str) -> CacheResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CacheError::Corrupt(format!("bad timestamp '{}': {}", raw, e)))
}

/// Hex SHA-256 of `METHOD URL`
pub(crate) fn cache_key(request: &Request) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.method.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(request.url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn headers_from_stored(pairs: &[(String, String)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.append(name, value);
        }
    }
    headers
}
