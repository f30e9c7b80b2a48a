//! Page text extraction.
//!
//! [`PageExtractor`] reads a location (a web URL, a `file://` URL, or a
//! plain path) and returns its text. PDFs are parsed page by page, HTML is
//! converted to readable text, and anything else is returned as-is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pagechat_core::content::ContentExtractor;
use pagechat_types::content::ContentKind;
use pagechat_types::error::ExtractError;

/// Where a location points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Web(String),
    File(PathBuf),
}

impl Source {
    pub fn parse(location: &str) -> Self {
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Source::Web(location.to_string())
        } else if let Some(path) = location.strip_prefix("file://") {
            Source::File(PathBuf::from(path))
        } else {
            Source::File(PathBuf::from(location))
        }
    }
}

/// How the raw bytes of a location should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Pdf,
    Html,
    /// Plain text, unless the body sniffs as HTML.
    Text,
}

/// Default [`ContentExtractor`]: HTTP(S) via reqwest, local files via tokio.
#[derive(Debug, Clone)]
pub struct PageExtractor {
    client: reqwest::Client,
}

impl PageExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ExtractError::Read {
                location: String::new(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<(Vec<u8>, Format), ExtractError> {
        let read_error = |reason: String| ExtractError::Read {
            location: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .header(
                "accept",
                "text/html,application/pdf,text/plain;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(|e| read_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(read_error(format!("HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let format = if content_type.contains("application/pdf") {
            Format::Pdf
        } else if content_type.contains("html") {
            Format::Html
        } else if ["image/", "audio/", "video/"]
            .iter()
            .any(|prefix| content_type.starts_with(prefix))
        {
            return Err(ExtractError::Unsupported(format!("{url} ({content_type})")));
        } else {
            Format::Text
        };

        let body = response.bytes().await.map_err(|e| read_error(e.to_string()))?;
        Ok((body.to_vec(), format))
    }

    async fn read_file(&self, path: &Path, location: &str) -> Result<(Vec<u8>, Format), ExtractError> {
        let body = tokio::fs::read(path).await.map_err(|e| ExtractError::Read {
            location: location.to_string(),
            reason: e.to_string(),
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let format = match ext.as_str() {
            "pdf" => Format::Pdf,
            "html" | "htm" => Format::Html,
            _ => Format::Text,
        };
        Ok((body, format))
    }
}

impl ContentExtractor for PageExtractor {
    async fn extract(&self, location: &str) -> Result<String, ExtractError> {
        let (body, mut format) = match Source::parse(location) {
            Source::Web(url) => self.fetch(&url).await?,
            Source::File(path) => self.read_file(&path, location).await?,
        };
        if ContentKind::from_location(location) == ContentKind::Pdf || body.starts_with(b"%PDF-") {
            format = Format::Pdf;
        }

        let text = match format {
            Format::Pdf => pdf_to_text(body, location).await?,
            Format::Html => html_to_text(&String::from_utf8_lossy(&body)),
            Format::Text => {
                let body = String::from_utf8_lossy(&body);
                if looks_like_html(&body) {
                    html_to_text(&body)
                } else {
                    body.into_owned()
                }
            }
        };
        tracing::debug!(%location, ?format, chars = text.chars().count(), "extracted page text");
        Ok(text)
    }
}

/// Text of every page in order, one line per page.
///
/// Parsing runs on the blocking pool; a parser panic on a malformed file is
/// reported as a read error like any other parse failure.
async fn pdf_to_text(body: Vec<u8>, location: &str) -> Result<String, ExtractError> {
    let read_error = |reason: String| ExtractError::Read {
        location: location.to_string(),
        reason,
    };

    let pages = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&body))
        .await
        .map_err(|e| read_error(format!("PDF parser aborted: {e}")))?
        .map_err(|e| read_error(format!("invalid PDF: {e}")))?;

    tracing::debug!(%location, pages = pages.len(), "parsed PDF");
    Ok(pages
        .iter()
        .map(|page| page.split_whitespace().collect::<Vec<_>>().join(" "))
        .map(|page| page + "\n")
        .collect())
}

fn looks_like_html(body: &str) -> bool {
    let lower = body
        .trim_start()
        .chars()
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    lower.starts_with("<!doctype html") || lower.starts_with("<html")
}

/// Readable text of an HTML document. Falls back to the raw markup if the
/// converter fails.
pub fn html_to_text(html: &str) -> String {
    htmd::convert(html).unwrap_or_else(|_| html.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn source_parsing() {
        assert_eq!(
            Source::parse("https://example.com/terms"),
            Source::Web("https://example.com/terms".to_string())
        );
        assert_eq!(
            Source::parse("file:///tmp/terms.txt"),
            Source::File(PathBuf::from("/tmp/terms.txt"))
        );
        assert_eq!(
            Source::parse("docs/terms.txt"),
            Source::File(PathBuf::from("docs/terms.txt"))
        );
    }

    #[tokio::test]
    async fn plain_file_is_returned_verbatim() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("terms.txt");
        tokio::fs::write(&path, "1. We keep your data forever.").await.unwrap();

        let text = PageExtractor::new()
            .unwrap()
            .extract(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(text, "1. We keep your data forever.");
    }

    #[tokio::test]
    async fn html_file_is_converted_to_text() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("terms.html");
        tokio::fs::write(
            &path,
            "<html><body><h1>Terms</h1><p>You agree to arbitration.</p></body></html>",
        )
        .await
        .unwrap();

        let location = format!("file://{}", path.display());
        let text = PageExtractor::new().unwrap().extract(&location).await.unwrap();

        assert!(text.contains("Terms"));
        assert!(text.contains("You agree to arbitration."));
        assert!(!text.contains("<p>"));
    }

    /// A minimal PDF with one Helvetica text line per page.
    fn pdf_fixture(pages: &[&str]) -> Vec<u8> {
        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            String::new(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];
        let mut kids = Vec::new();
        for text in pages {
            let page_id = objects.len() + 1;
            kids.push(format!("{page_id} 0 R"));
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                page_id + 1
            ));
            let stream = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
            objects.push(format!(
                "<< /Length {} >>\nstream\n{stream}\nendstream",
                stream.len()
            ));
        }
        objects[1] = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        );

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
        }
        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
                objects.len() + 1
            )
            .as_bytes(),
        );
        out
    }

    #[tokio::test]
    async fn pdf_file_text_is_extracted_in_page_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Policy.PDF");
        tokio::fs::write(
            &path,
            pdf_fixture(&["Terms of Service", "Disputes go to arbitration"]),
        )
        .await
        .unwrap();

        let text = PageExtractor::new()
            .unwrap()
            .extract(path.to_str().unwrap())
            .await
            .unwrap();

        let terms = text.find("Terms of Service").unwrap();
        let disputes = text.find("arbitration").unwrap();
        assert!(terms < disputes);
        assert!(text.ends_with('\n'));
    }

    #[tokio::test]
    async fn pdf_is_detected_by_signature_without_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("download");
        tokio::fs::write(&path, pdf_fixture(&["Refund policy"])).await.unwrap();

        let text = PageExtractor::new()
            .unwrap()
            .extract(path.to_str().unwrap())
            .await
            .unwrap();
        assert!(text.contains("Refund policy"));
    }

    #[tokio::test]
    async fn corrupt_pdf_is_a_read_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        tokio::fs::write(&path, b"%PDF-1.4\nthis is not a pdf").await.unwrap();

        let err = PageExtractor::new()
            .unwrap()
            .extract(path.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Read { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let err = PageExtractor::new()
            .unwrap()
            .extract("/definitely/not/here.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Read { .. }));
    }

    #[test]
    fn html_sniffing() {
        assert!(looks_like_html("  <!DOCTYPE html><html></html>"));
        assert!(!looks_like_html("plain text"));
    }
}
