//! Text extraction for binary uploads.
//! PDFs go through lopdf; images are handed to an OCR command (tesseract).

use std::path::Path;
use tracing::{debug, warn};

use crate::error::{KbError, Result};

/// Extract the text of every page of an in-memory PDF.
///
/// Pages that fail to decode are skipped with a warning; an unreadable
/// document is an error.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    let pdf = lopdf::Document::load_mem(bytes).map_err(|e| KbError::Pdf(e.to_string()))?;

    let mut text = String::new();
    for page_num in pdf.get_pages().keys() {
        match pdf.extract_text(&[*page_num]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => warn!(page = page_num, error = %e, "Skipping unreadable PDF page"),
        }
    }
    Ok(text.trim().to_string())
}

/// Run `<command> <image> stdout` and return the recognised text.
pub async fn ocr_image(command: &str, image: &Path) -> Result<String> {
    debug!(command, image = %image.display(), "Running OCR");
    let output = tokio::process::Command::new(command)
        .arg(image)
        .arg("stdout")
        .output()
        .await
        .map_err(|e| KbError::Ocr(format!("failed to run {command}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(KbError::Ocr(stderr.trim().to_string()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_not_a_pdf() {
        let err = extract_pdf_text(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, KbError::Pdf(_)));
    }

    #[tokio::test]
    async fn test_missing_ocr_binary_is_reported() {
        let err = ocr_image("amitybot-no-such-ocr-binary", Path::new("x.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, KbError::Ocr(_)));
    }
}
