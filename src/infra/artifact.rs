//! Release archive download and agent extraction.
//!
//! Implements the `ArtifactStager` port with `ureq` for HTTP and
//! `tar` + `flate2` for unpacking. All blocking work runs on the
//! blocking pool.

use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ArtifactStager;
use crate::domain::ArtifactError;
use crate::domain::service::AGENT_BINARY;
use crate::infra::fs::{set_mode, sha256_file};

/// Largest archive accepted from the artifact host.
pub const MAX_ARCHIVE_BYTES: u64 = 256 * 1024 * 1024;

/// Downloads archives over HTTP(S) and unpacks the agent binary.
#[derive(Debug, Clone, Default)]
pub struct HttpArtifactStager;

impl HttpArtifactStager {
    fn download_blocking(url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let fail = |detail: String| ArtifactError::Download {
            url: url.to_string(),
            detail,
        };
        let name = archive_name(url);
        let dest = dest_dir.join(name);

        let response = match ureq::get(url)
            .set("User-Agent", concat!("aurelia-fleet/", env!("CARGO_PKG_VERSION")))
            .call()
        {
            Ok(r) => r,
            Err(ureq::Error::Status(code, _)) => return Err(fail(format!("HTTP {code}")).into()),
            Err(e) => return Err(fail(e.to_string()).into()),
        };

        let file = File::create(&dest)
            .with_context(|| format!("creating {}", dest.display()))?;
        let mut writer = BufWriter::new(file);
        let mut reader = response.into_reader().take(MAX_ARCHIVE_BYTES + 1);
        let written = std::io::copy(&mut reader, &mut writer)
            .map_err(|e| fail(format!("reading body: {e}")))?;
        if written > MAX_ARCHIVE_BYTES {
            return Err(fail(format!("archive larger than {MAX_ARCHIVE_BYTES} bytes")).into());
        }
        drop(writer);

        let digest = sha256_file(&dest)?;
        tracing::debug!(%url, bytes = written, sha256 = %digest, "archive downloaded");
        Ok(dest)
    }
}

/// Last path segment of `url`, without any query string.
fn archive_name(url: &str) -> &str {
    url.split(['?', '#'])
        .next()
        .and_then(|u| u.rsplit('/').next())
        .filter(|n| !n.is_empty())
        .unwrap_or("release.tar.gz")
}

/// Unpack the root `kernel` entry of a `.tar.gz` next to the archive.
///
/// Other entries are ignored. The binary is written with mode 0755.
///
/// # Errors
///
/// Returns `ArtifactError::Extraction` for unreadable archives and
/// `BinaryMissing` when the archive has no root `kernel` entry.
pub fn extract_agent(archive: &Path) -> Result<PathBuf> {
    let fail = |detail: String| ArtifactError::Extraction {
        archive: archive.to_path_buf(),
        detail,
    };
    let dir = archive
        .parent()
        .ok_or_else(|| fail("archive has no parent directory".into()))?;
    let dest = dir.join(AGENT_BINARY);

    let file = File::open(archive).map_err(|e| fail(e.to_string()))?;
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(file));
    let entries = tar.entries().map_err(|e| fail(e.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| fail(e.to_string()))?;
        let path = entry.path().map_err(|e| fail(e.to_string()))?.into_owned();
        let is_agent = path
            .to_str()
            .is_some_and(|p| p.trim_start_matches("./") == AGENT_BINARY);
        if !is_agent || !entry.header().entry_type().is_file() {
            continue;
        }
        let mut out = File::create(&dest)
            .with_context(|| format!("creating {}", dest.display()))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| fail(e.to_string()))?;
        set_mode(&dest, 0o755)?;
        tracing::debug!(binary = %dest.display(), "agent extracted");
        return Ok(dest);
    }
    Err(ArtifactError::BinaryMissing {
        archive: archive.to_path_buf(),
        binary: AGENT_BINARY.to_string(),
    }
    .into())
}

impl ArtifactStager for HttpArtifactStager {
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let url = url.to_string();
        let dest_dir = dest_dir.to_path_buf();
        tokio::task::spawn_blocking(move || Self::download_blocking(&url, &dest_dir))
            .await
            .context("download task panicked")?
    }

    async fn extract(&self, archive: &Path) -> Result<PathBuf> {
        let archive = archive.to_path_buf();
        tokio::task::spawn_blocking(move || extract_agent(&archive))
            .await
            .context("extract task panicked")?
    }
}
