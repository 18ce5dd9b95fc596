//! Verified download of model files and vector tables
//!
//! Assets land in the cache directory only after they pass verification.
//! Downloads go to a temp file in the same directory and are renamed into
//! place, so a half-written file is never mistaken for a valid copy.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Bytes of the body kept for content sniffing
const HEAD_LEN: usize = 512;

/// What a valid payload looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Opaque binary (ONNX model)
    Binary,
    /// JSON document (tokenizer)
    Json,
    /// Plain text table (word vectors)
    Text,
}

/// A remote file the pipeline depends on
#[derive(Debug, Clone)]
pub struct AssetSpec {
    /// Human-readable name for logs and errors
    pub name: String,
    /// Remote location
    pub url: String,
    /// File name inside the cache directory
    pub file_name: String,
    /// Expected payload shape
    pub kind: AssetKind,
    /// Minimum plausible size in bytes
    pub min_bytes: u64,
    /// Expected SHA-256 (hex), if pinned
    pub sha256: Option<String>,
}

impl AssetSpec {
    fn failure(&self, message: impl Into<String>) -> Error {
        Error::asset(&self.name, message)
    }
}

/// Facts about a downloaded body, checked by [`verify_payload`]
#[derive(Debug, Clone)]
pub struct Payload<'a> {
    /// HTTP status was a success
    pub status_ok: bool,
    /// Declared `Content-Length`, if any
    pub declared_len: Option<u64>,
    /// Bytes actually received
    pub received: u64,
    /// First bytes of the body
    pub head: &'a [u8],
    /// SHA-256 of the full body (lowercase hex)
    pub sha256: &'a str,
}

/// Check a downloaded body against its spec
pub fn verify_payload(spec: &AssetSpec, payload: &Payload<'_>) -> Result<()> {
    if !payload.status_ok {
        return Err(spec.failure("server did not return success"));
    }

    if looks_like_html(payload.head) {
        return Err(spec.failure("server returned an HTML page instead of the file"));
    }
    if spec.kind != AssetKind::Json && payload.head.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{') {
        return Err(spec.failure("server returned a JSON body instead of the file"));
    }

    if let Some(declared) = payload.declared_len {
        if declared != payload.received {
            return Err(spec.failure(format!(
                "truncated download: received {} of {} bytes",
                payload.received, declared
            )));
        }
    }
    if payload.received < spec.min_bytes {
        return Err(spec.failure(format!(
            "payload is {} bytes, expected at least {}",
            payload.received, spec.min_bytes
        )));
    }

    if let Some(expected) = &spec.sha256 {
        if !expected.eq_ignore_ascii_case(payload.sha256) {
            return Err(spec.failure(format!(
                "checksum mismatch: expected {}, got {}",
                expected, payload.sha256
            )));
        }
    }

    Ok(())
}

fn looks_like_html(head: &[u8]) -> bool {
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start().to_ascii_lowercase();
    text.starts_with("<!doctype html") || text.starts_with("<html") || text.starts_with("<head")
}

/// Downloads and caches verified assets
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: Client,
    cache_dir: PathBuf,
}

impl AssetFetcher {
    /// Create a fetcher for a cache directory
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("policy-rag/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client, cache_dir))
    }

    /// Create a fetcher with an existing HTTP client
    pub fn with_client(client: Client, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            cache_dir: cache_dir.into(),
        }
    }

    /// Cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where an asset lives once acquired
    pub fn path_for(&self, spec: &AssetSpec) -> PathBuf {
        self.cache_dir.join(&spec.file_name)
    }

    /// Return a verified local copy, downloading it if needed
    pub async fn ensure(&self, spec: &AssetSpec) -> Result<PathBuf> {
        let path = self.path_for(spec);

        if path.exists() {
            match verify_local(&path, spec) {
                Ok(()) => {
                    tracing::debug!("Using cached {} at {}", spec.name, path.display());
                    return Ok(path);
                }
                Err(e) => {
                    tracing::warn!("Cached {} is invalid ({}), downloading again", spec.name, e);
                }
            }
        }

        std::fs::create_dir_all(&self.cache_dir).map_err(|e| {
            spec.failure(format!(
                "cannot create cache directory {}: {}",
                self.cache_dir.display(),
                e
            ))
        })?;

        tracing::info!("Downloading {} from: {}", spec.name, spec.url);
        let tmp = self.download(spec).await?;

        tmp.persist(&path)
            .map_err(|e| spec.failure(format!("cannot move download into place: {}", e.error)))?;

        tracing::info!("{} saved to {}", spec.name, path.display());
        Ok(path)
    }

    /// Stream the body into a temp file, hashing as it arrives
    ///
    /// The temp file is deleted on drop, so every early return cleans up.
    async fn download(&self, spec: &AssetSpec) -> Result<tempfile::NamedTempFile> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.cache_dir)
            .map_err(|e| spec.failure(format!("cannot create temp file: {}", e)))?;

        let response = self
            .client
            .get(&spec.url)
            .send()
            .await
            .map_err(|e| spec.failure(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(spec.failure(format!("HTTP {}", status)));
        }
        let declared_len = response.content_length();

        let mut hasher = Sha256::new();
        let mut head = Vec::with_capacity(HEAD_LEN);
        let mut received = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| spec.failure(format!("download interrupted: {}", e)))?;
            if head.len() < HEAD_LEN {
                let take = (HEAD_LEN - head.len()).min(chunk.len());
                head.extend_from_slice(&chunk[..take]);
            }
            hasher.update(&chunk);
            received += chunk.len() as u64;
            tmp.write_all(&chunk)
                .map_err(|e| spec.failure(format!("cannot write temp file: {}", e)))?;
        }
        tmp.flush()
            .map_err(|e| spec.failure(format!("cannot write temp file: {}", e)))?;

        let digest = hex::encode(hasher.finalize());
        verify_payload(
            spec,
            &Payload {
                status_ok: true,
                declared_len,
                received,
                head: &head,
                sha256: &digest,
            },
        )?;

        if spec.kind == AssetKind::Json {
            verify_json(tmp.path(), spec)?;
        }

        Ok(tmp)
    }
}

/// Re-check a file already in the cache
fn verify_local(path: &Path, spec: &AssetSpec) -> Result<()> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| spec.failure(format!("cannot open {}: {}", path.display(), e)))?;

    let mut hasher = Sha256::new();
    let mut head = Vec::with_capacity(HEAD_LEN);
    let mut received = 0u64;
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| spec.failure(format!("cannot read {}: {}", path.display(), e)))?;
        if n == 0 {
            break;
        }
        if head.len() < HEAD_LEN {
            let take = (HEAD_LEN - head.len()).min(n);
            head.extend_from_slice(&buf[..take]);
        }
        // Only hashed when a checksum is pinned
        if spec.sha256.is_some() {
            hasher.update(&buf[..n]);
        }
        received += n as u64;
    }

    let digest = hex::encode(hasher.finalize());
    verify_payload(
        spec,
        &Payload {
            status_ok: true,
            declared_len: None,
            received,
            head: &head,
            sha256: &digest,
        },
    )?;

    if spec.kind == AssetKind::Json {
        verify_json(path, spec)?;
    }
    Ok(())
}

/// A JSON asset must parse, and must not be an `{"error": ...}` reply
fn verify_json(path: &Path, spec: &AssetSpec) -> Result<()> {
    let raw = std::fs::read(path)
        .map_err(|e| spec.failure(format!("cannot read {}: {}", path.display(), e)))?;
    let value: serde_json::Value = serde_json::from_slice(&raw)
        .map_err(|e| spec.failure(format!("not valid JSON: {}", e)))?;

    match value.as_object() {
        Some(obj) if obj.contains_key("error") && obj.len() <= 2 => {
            Err(spec.failure(format!("server returned an error document: {}", obj["error"])))
        }
        Some(_) => Ok(()),
        None => Err(spec.failure("expected a JSON object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: AssetKind, sha256: Option<&str>) -> AssetSpec {
        AssetSpec {
            name: "test model".to_string(),
            // Nothing listens on the discard port; any download attempt fails fast
            url: "http://127.0.0.1:9/model.onnx".to_string(),
            file_name: "model.onnx".to_string(),
            kind,
            min_bytes: 8,
            sha256: sha256.map(str::to_string),
        }
    }

    fn payload<'a>(head: &'a [u8], received: u64, declared: Option<u64>, sha: &'a str) -> Payload<'a> {
        Payload {
            status_ok: true,
            declared_len: declared,
            received,
            head,
            sha256: sha,
        }
    }

    #[test]
    fn test_accepts_good_payload() {
        let s = spec(AssetKind::Binary, None);
        assert!(verify_payload(&s, &payload(b"\x08\x07onnx", 4096, Some(4096), "x")).is_ok());
    }

    #[test]
    fn test_rejects_html_error_page() {
        let s = spec(AssetKind::Binary, None);
        let err = verify_payload(
            &s,
            &payload(b"  <!DOCTYPE html><html><body>Rate limited", 4096, None, "x"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::AssetAcquisitionFailure { .. }));
    }

    #[test]
    fn test_rejects_json_for_binary_asset() {
        let s = spec(AssetKind::Binary, None);
        assert!(verify_payload(&s, &payload(b"{\"error\":\"not found\"}", 4096, None, "x")).is_err());
        let json = spec(AssetKind::Json, None);
        assert!(verify_payload(&json, &payload(b"{\"version\":\"1.0\"}", 4096, None, "x")).is_ok());
    }

    #[test]
    fn test_rejects_truncated_and_tiny_payloads() {
        let s = spec(AssetKind::Binary, None);
        assert!(verify_payload(&s, &payload(b"\x00\x01", 100, Some(4096), "x")).is_err());
        assert!(verify_payload(&s, &payload(b"\x00\x01", 4, None, "x")).is_err());
    }

    #[test]
    fn test_rejects_checksum_mismatch() {
        let s = spec(AssetKind::Binary, Some("ABCDEF"));
        assert!(verify_payload(&s, &payload(b"\x00\x01", 64, None, "abcdef")).is_ok());
        assert!(verify_payload(&s, &payload(b"\x00\x01", 64, None, "123456")).is_err());

        let mut status = payload(b"\x00\x01", 64, None, "abcdef");
        status.status_ok = false;
        assert!(verify_payload(&s, &status).is_err());
    }

    #[tokio::test]
    async fn test_cached_copy_is_not_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        let contents = b"\x08\x07 binary model weights";
        std::fs::write(dir.path().join("model.onnx"), contents).unwrap();

        let digest = hex::encode(Sha256::digest(contents));
        let fetcher = AssetFetcher::new(dir.path()).unwrap();
        let path = fetcher
            .ensure(&spec(AssetKind::Binary, Some(&digest)))
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("model.onnx"));
        assert_eq!(std::fs::read(path).unwrap(), contents);
    }

    #[tokio::test]
    async fn test_invalid_cached_copy_triggers_download() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.onnx"), b"<html>oops</html>").unwrap();

        let fetcher = AssetFetcher::new(dir.path()).unwrap();
        let err = fetcher
            .ensure(&spec(AssetKind::Binary, None))
            .await
            .unwrap_err();
        assert!(err.is_resource_error());

        // Only the stale file remains: no temp files left behind
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_json_error_document_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");
        std::fs::write(&path, br#"{"error":"Entry not found"}"#).unwrap();
        assert!(verify_json(&path, &spec(AssetKind::Json, None)).is_err());

        std::fs::write(&path, br#"{"version":"1.0","model":{}}"#).unwrap();
        assert!(verify_json(&path, &spec(AssetKind::Json, None)).is_ok());
    }
}
