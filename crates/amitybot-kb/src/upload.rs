//! Storage of uploaded knowledge-base files.
//!
//! Text files are stored as-is. PDFs and images are stored together with a
//! `<stored>.txt` sidecar holding the extracted text, which is what the
//! loader indexes.

use std::path::{Path, PathBuf};

use amitybot_common::config::KbConfig;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{KbError, Result};
use crate::extract::{extract_pdf_text, ocr_image};
use crate::loader::{extension_of, sidecar_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    PlainText,
    Pdf,
    Image,
}

impl UploadKind {
    pub fn from_file_name(name: &str) -> Result<Self> {
        match extension_of(Path::new(name)).as_str() {
            "txt" | "md"          => Ok(Self::PlainText),
            "pdf"                 => Ok(Self::Pdf),
            "jpg" | "jpeg" | "png" => Ok(Self::Image),
            other => Err(KbError::UnsupportedFileType(if other.is_empty() {
                name.to_string()
            } else {
                format!(".{other}")
            })),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredUpload {
    pub original_name: String,
    pub stored_path: PathBuf,
    /// The file the loader will index (the upload itself or its sidecar).
    pub text_path: PathBuf,
    pub kind: UploadKind,
    pub extracted_chars: usize,
}

/// Keep only the final path component and replace anything outside
/// `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(name: &str) -> Result<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base.chars().all(|c| c == '.') {
        return Err(KbError::InvalidFileName(name.to_string()));
    }
    Ok(base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect())
}

/// Store an uploaded file under `data_dir` as `<uuid>_<name>` and extract
/// its text.
///
/// Unsupported types are rejected before anything is written. If extraction
/// fails or yields no text, the stored file is removed again.
pub async fn store_upload(cfg: &KbConfig, file_name: &str, bytes: &[u8]) -> Result<StoredUpload> {
    let name = sanitize_file_name(file_name)?;
    let kind = UploadKind::from_file_name(&name)?;

    tokio::fs::create_dir_all(&cfg.data_dir).await?;
    let stored_path = cfg.data_dir.join(format!("{}_{}", Uuid::new_v4(), name));
    tokio::fs::write(&stored_path, bytes).await?;

    match extract(cfg, kind, &stored_path, bytes).await {
        Ok((text_path, extracted_chars)) => {
            info!(
                file = %name,
                stored = %stored_path.display(),
                kind = ?kind,
                chars = extracted_chars,
                "Stored upload"
            );
            Ok(StoredUpload {
                original_name: name,
                stored_path,
                text_path,
                kind,
                extracted_chars,
            })
        }
        Err(e) => {
            warn!(file = %name, error = %e, "Upload rejected, removing stored file");
            if let Err(rm) = tokio::fs::remove_file(&stored_path).await {
                warn!(path = %stored_path.display(), error = %rm, "Failed to remove rejected upload");
            }
            Err(e)
        }
    }
}

/// Remove an upload and its sidecar, used when the upload could not be
/// indexed.
pub async fn discard_upload(stored: &StoredUpload) {
    let mut paths = vec![&stored.stored_path];
    if stored.text_path != stored.stored_path {
        paths.push(&stored.text_path);
    }
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove discarded upload");
        }
    }
    info!(file = %stored.original_name, "Discarded upload");
}

async fn extract(
    cfg: &KbConfig,
    kind: UploadKind,
    stored_path: &Path,
    bytes: &[u8],
) -> Result<(PathBuf, usize)> {
    let text = match kind {
        UploadKind::PlainText => String::from_utf8_lossy(bytes).into_owned(),
        UploadKind::Pdf => {
            let owned = bytes.to_vec();
            tokio::task::spawn_blocking(move || extract_pdf_text(&owned)).await??
        }
        UploadKind::Image => ocr_image(&cfg.ocr_command, stored_path).await?,
    };

    let display_name = stored_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    // counted the way the cleaner counts, so an accepted upload always survives cleaning
    let chars = text.split_whitespace().collect::<Vec<_>>().join(" ").chars().count();
    if chars == 0 {
        return Err(KbError::NoTextExtracted(display_name));
    }
    if chars < cfg.min_document_chars {
        return Err(KbError::DocumentTooShort { chars, min: cfg.min_document_chars });
    }

    if kind == UploadKind::PlainText {
        return Ok((stored_path.to_path_buf(), chars));
    }
    let sidecar = sidecar_path(stored_path);
    tokio::fs::write(&sidecar, text.as_bytes()).await?;
    Ok((sidecar, chars))
}
