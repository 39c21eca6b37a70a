//! HTTP-backed file transfer
//!
//! Streams downloads straight to disk and converts between base64 payloads
//! and local files. There are no retries here: a failed transfer is the
//! caller's to handle.

use async_trait::async_trait;
use base64::Engine;
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::FileTransfer;
use crate::error::{BackendError, BackendResult};

/// File transfer over `reqwest` and `tokio::fs`
#[derive(Debug, Clone, Default)]
pub struct HttpFileTransfer {
    client: Client,
}

impl HttpFileTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, timeouts, headers)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

async fn ensure_parent(path: &Path) -> BackendResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Decode a base64 payload, tolerating surrounding whitespace and line breaks
pub fn decode_payload(payload: &str) -> BackendResult<Vec<u8>> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| BackendError::Decode(e.to_string()))
}

#[async_trait]
impl FileTransfer for HttpFileTransfer {
    async fn download(&self, url: &str, dest: &Path) -> BackendResult<Option<PathBuf>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BackendError::Http {
                url: url.to_string(),
                source: e,
            })?;

        if !response.status().is_success() {
            tracing::warn!(
                url = %url,
                status = response.status().as_u16(),
                "Download produced no usable file"
            );
            return Ok(None);
        }

        ensure_parent(dest).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(dest)
            .await?;

        let mut bytes_written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| BackendError::Http {
                url: url.to_string(),
                source: e,
            })?;
            file.write_all(&chunk).await?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(url = %url, path = %dest.display(), bytes = bytes_written, "Downloaded");
        Ok(Some(dest.to_path_buf()))
    }

    async fn write_base64(&self, dest: &Path, payload: &str) -> BackendResult<()> {
        let bytes = decode_payload(payload)?;
        ensure_parent(dest).await?;
        fs::write(dest, &bytes).await?;
        tracing::debug!(path = %dest.display(), bytes = bytes.len(), "Wrote decoded payload");
        Ok(())
    }

    async fn read_base64(&self, path: &Path) -> BackendResult<String> {
        let bytes = fs::read(path).await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_payload_ignores_whitespace() {
        assert_eq!(decode_payload("aGVs\nbG8=\n").unwrap(), b"hello");
        assert!(matches!(
            decode_payload("not base64!"),
            Err(BackendError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_write_then_read_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("image_x.jpeg");
        let transfer = HttpFileTransfer::new();

        transfer.write_base64(&path, "aGVsbG8=").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert_eq!(transfer.read_base64(&path).await.unwrap(), "aGVsbG8=");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = HttpFileTransfer::new();
        let err = transfer
            .read_base64(&dir.path().join("missing.jpeg"))
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
