//! Input resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! The API receives documents inline as base64, so there is no need to keep
//! a file on disk: URL inputs are downloaded straight into memory. Both paths
//! check the `%PDF` magic bytes so a wrong file is reported here instead of
//! as an opaque 400 from the endpoint.

use crate::error::CiteError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Raw bytes of a resolved input plus where they came from.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    /// The path or URL as given.
    pub source: String,
    /// Suggested document title: file stem of the path or last URL segment.
    pub stem: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to PDF bytes.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, CiteError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        let path = PathBuf::from(input);
        tokio::task::spawn_blocking(move || read_local(&path))
            .await
            .map_err(|e| CiteError::Internal(format!("read task: {e}")))?
    }
}

/// Read a local file, validating existence, permissions and PDF magic bytes.
pub fn read_local(path: &Path) -> Result<ResolvedInput, CiteError> {
    if !path.exists() {
        return Err(CiteError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut bytes = Vec::new();
    match std::fs::File::open(path) {
        Ok(mut f) => {
            f.read_to_end(&mut bytes).map_err(|e| {
                CiteError::Internal(format!("reading '{}': {e}", path.display()))
            })?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(CiteError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(CiteError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    let source = path.display().to_string();
    check_magic(&source, &bytes)?;

    debug!("Resolved local PDF: {} ({} bytes)", source, bytes.len());
    Ok(ResolvedInput {
        stem: file_stem(path),
        source,
        bytes,
    })
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, CiteError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CiteError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            CiteError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            CiteError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(CiteError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| CiteError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    check_magic(url, &bytes)?;
    info!("Downloaded {} bytes", bytes.len());

    Ok(ResolvedInput {
        source: url.to_string(),
        stem: url_stem(url),
        bytes,
    })
}

fn check_magic(source: &str, bytes: &[u8]) -> Result<(), CiteError> {
    if !bytes.starts_with(PDF_MAGIC) {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(CiteError::NotAPdf {
            source_name: source.to_string(),
            magic,
        });
    }
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string())
}

/// Last path segment of the URL without its extension.
fn url_stem(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return file_stem(Path::new(last));
                }
            }
        }
    }
    "downloaded".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn url_stem_strips_extension() {
        assert_eq!(url_stem("https://x.test/files/Q1%202025.pdf"), "Q1%202025");
        assert_eq!(url_stem("https://x.test/"), "downloaded");
    }

    #[test]
    fn reads_pdf_and_derives_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Shopify Q1 2025 Report.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.7\n%%EOF")
            .unwrap();

        let resolved = read_local(&path).unwrap();
        assert_eq!(resolved.stem, "Shopify Q1 2025 Report");
        assert!(resolved.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"hello world").unwrap();

        match read_local(&path) {
            Err(CiteError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"hell"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pdf");
        std::fs::write(&path, b"%P").unwrap();

        match read_local(&path) {
            Err(CiteError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"%P\0\0"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn missing_file() {
        let err = read_local(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, CiteError::FileNotFound { .. }));
    }
}
