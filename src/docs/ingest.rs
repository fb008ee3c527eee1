use anyhow::{Context, Result};
use tracing::info;

use super::types::{DocId, FileKind, FileNode};
use super::DocumentTree;

/// Convert a fetched body to document text. HTML goes through html2text at width 120.
pub fn body_to_text(body: &[u8], content_type: &str) -> String {
    if content_type.contains("html") {
        html2text::from_read(body, 120).unwrap_or_else(|_| String::from_utf8_lossy(body).to_string())
    } else {
        String::from_utf8_lossy(body).to_string()
    }
}

/// Document name for a URL when the caller didn't supply one: last path segment.
pub fn name_from_url(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}

/// Fetch a web page and add it to the tree as a text document under `folder`.
/// Returns (doc_id, text_len).
pub async fn ingest_url(
    tree: &tokio::sync::RwLock<DocumentTree>,
    url: &str,
    name: Option<&str>,
    folder: &str,
) -> Result<(DocId, usize)> {
    let resp = reqwest::get(url)
        .await
        .context("Failed to fetch URL")?
        .error_for_status()
        .context("URL returned an error status")?;

    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body = resp.bytes().await.context("Failed to read response body")?;
    let text = body_to_text(&body, &content_type);

    let name = name.unwrap_or_else(|| name_from_url(url)).to_string();
    let len = text.len();
    let node = FileNode {
        id: String::new(),
        name,
        kind: FileKind::Text,
        content: Some(text),
        children: Vec::new(),
        last_modified: Some(chrono::Utc::now()),
    };

    let doc_id = tree.write().await.insert(folder, node);
    info!(doc_id = %doc_id, size = len, folder, url, "URL ingested");
    Ok((doc_id, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_to_text_html() {
        let html = b"<html><body><h1>Title</h1><p>Some <b>bold</b> text.</p></body></html>";
        let text = body_to_text(html, "text/html; charset=utf-8");
        assert!(text.contains("Title"));
        assert!(text.contains("bold"));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn test_body_to_text_plain() {
        assert_eq!(body_to_text("纯文本".as_bytes(), "text/plain"), "纯文本");
    }

    #[test]
    fn test_name_from_url() {
        assert_eq!(name_from_url("https://example.com/docs/guide.md"), "guide.md");
        assert_eq!(name_from_url("https://example.com/docs/"), "docs");
    }
}
