use std::time::Duration;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RagError;

/// Page-scrape HTTP timeout.
pub const SCRAPE_TIMEOUT: Duration = Duration::from_secs(60);

/// Paragraph separator inside a chunk.
const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// One reorderable chunk of scraped page text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub index: usize,
    pub content: String,
    pub word_count: usize,
}

/// Fetch a page and return paragraph-packed chunks bounded by `chunk_size`
/// characters.
pub async fn scrape_page(
    client: &reqwest::Client,
    page_url: &str,
    chunk_size: usize,
) -> Result<Vec<ChunkInfo>, RagError> {
    debug!(page_url, chunk_size, "scraping page");
    let response = client
        .get(page_url)
        .timeout(SCRAPE_TIMEOUT)
        .send()
        .await
        .map_err(|e| RagError::Scrape(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RagError::Scrape(format!("HTTP {status}")));
    }

    let html = response
        .text()
        .await
        .map_err(|e| RagError::Scrape(e.to_string()))?;

    let paragraphs = extract_paragraphs(&html);
    let chunks = chunk_paragraphs(&paragraphs, chunk_size);
    debug!(page_url, chunks = chunks.len(), "page chunked");
    Ok(chunks)
}

/// Extract non-empty `<p>` texts in document order.
#[must_use]
pub fn extract_paragraphs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("p").expect("p selector is valid");
    document
        .select(&selector)
        .map(|element| {
            element
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty())
        .collect()
}

/// Pack paragraphs into chunks of at most `chunk_size` characters,
/// preserving paragraph boundaries. A paragraph longer than `chunk_size`
/// becomes its own oversized chunk rather than being split mid-sentence.
#[must_use]
pub fn chunk_paragraphs(paragraphs: &[String], chunk_size: usize) -> Vec<ChunkInfo> {
    let mut chunks: Vec<ChunkInfo> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    let mut flush = |current: &mut Vec<&str>, chunks: &mut Vec<ChunkInfo>| {
        if current.is_empty() {
            return;
        }
        let content = current.join(PARAGRAPH_SEPARATOR);
        let word_count = content.split_whitespace().count();
        chunks.push(ChunkInfo {
            index: chunks.len(),
            content,
            word_count,
        });
        current.clear();
    };

    for paragraph in paragraphs {
        let para_len = paragraph.len();
        if current_len == 0 {
            current.push(paragraph);
            current_len = para_len;
            continue;
        }
        let projected = current_len + PARAGRAPH_SEPARATOR.len() + para_len;
        if projected > chunk_size {
            flush(&mut current, &mut chunks);
            current.push(paragraph);
            current_len = para_len;
        } else {
            current.push(paragraph);
            current_len = projected;
        }
    }
    flush(&mut current, &mut chunks);
    chunks
}
