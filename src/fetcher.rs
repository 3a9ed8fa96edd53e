//! Article fetching and extraction.
//!
//! Uses reqwest for fetching and scraper for HTML parsing. Extraction prefers
//! semantic containers over a blind paragraph scan and drops navigation noise.

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// User-Agent string sent with every fetch. Some origins reject clients
/// without a recognisable identity.
const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; newsbrief/",
    env!("CARGO_PKG_VERSION"),
    "; +https://github.com/cladam/newsbrief)"
);

/// Default timeout for HTTP requests
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default minimum length for an extract to count as article text.
/// Shorter results are almost always navigation debris.
pub const MIN_CONTENT_LEN: usize = 80;

/// Elements whose subtrees never contain article text
const NOISE_TAGS: [&str; 6] = ["script", "style", "nav", "footer", "header", "aside"];

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("not a valid article URL: {0}")]
    InvalidUrl(String),
    #[error("failed to fetch URL: {0}")]
    FetchError(#[from] reqwest::Error),
    #[error("server answered with status {0}")]
    BadStatus(reqwest::StatusCode),
    #[error("no article content found ({0} chars extracted)")]
    NoContent(usize),
}

/// Extracted content from an article page
#[derive(Debug, Clone)]
pub struct Article {
    /// The original URL
    pub url: String,
    /// Page title
    pub title: Option<String>,
    /// Main body text, paragraphs joined with single spaces
    pub text: String,
}

/// Check that a candidate string is a well-formed, fetchable URL.
///
/// True iff it parses with both a scheme and a host. Never performs I/O
/// and never panics on malformed input.
pub fn is_valid_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(parsed) => !parsed.scheme().is_empty() && parsed.has_host(),
        Err(_) => false,
    }
}

/// Create a configured HTTP client for fetching articles
pub fn create_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Fetch a page and extract its article text.
///
/// The URL is validated before any network I/O. A single GET is issued with
/// no retries; every failure reason maps to a [`FetchError`] variant so the
/// caller can treat them uniformly as "no text".
pub async fn extract_article(
    url: &str,
    timeout: Duration,
    min_content_len: usize,
) -> Result<Article, FetchError> {
    if !is_valid_url(url) {
        warn!(url, "rejected before fetch: not a well-formed URL");
        return Err(FetchError::InvalidUrl(url.to_string()));
    }

    let client = create_client(timeout)?;
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(err) => {
            warn!(url, %err, "fetch failed in transport");
            return Err(err.into());
        }
    };
    let status = response.status();
    if !status.is_success() {
        warn!(url, %status, "fetch failed");
        return Err(FetchError::BadStatus(status));
    }

    let html = match response.text().await {
        Ok(html) => html,
        Err(err) => {
            warn!(url, %err, "failed reading response body");
            return Err(err.into());
        }
    };
    let document = Html::parse_document(&html);

    let title = extract_title(&document);
    let text = extract_text(&document);

    if text.len() < min_content_len {
        warn!(url, extracted = text.len(), "extract below content threshold");
        return Err(FetchError::NoContent(text.len()));
    }

    Ok(Article {
        url: url.to_string(),
        title,
        text,
    })
}

/// Extract the page title from <title> or <h1>
fn extract_title(document: &Html) -> Option<String> {
    for selector_str in ["title", "h1"] {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let title: String = element.text().collect();
                if !title.trim().is_empty() {
                    return Some(title.trim().to_string());
                }
            }
        }
    }
    None
}

/// Extract article body text from the parsed document.
///
/// Paragraph source priority: the first `<article>` container, then a main
/// content container, then every paragraph in the document. Semantic
/// containers are unreliable but higher-precision when present.
pub fn extract_text(document: &Html) -> String {
    let p_selector = Selector::parse("p").unwrap();

    if let Ok(article_selector) = Selector::parse("article") {
        if let Some(container) = document.select(&article_selector).next() {
            let text = join_paragraphs(container.select(&p_selector));
            if !text.is_empty() {
                debug!("extracted from <article> container");
                return text;
            }
        }
    }

    let main_selectors = ["main", "[role='main']", "#content", ".content"];
    for selector_str in main_selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(container) = document.select(&selector).next() {
                let text = join_paragraphs(container.select(&p_selector));
                if !text.is_empty() {
                    debug!(container = selector_str, "extracted from main container");
                    return text;
                }
            }
        }
    }

    join_paragraphs(document.select(&p_selector))
}

/// Join paragraph texts with single spaces, collapsing internal whitespace
/// and skipping paragraphs inside noise subtrees.
fn join_paragraphs<'a>(paragraphs: impl Iterator<Item = ElementRef<'a>>) -> String {
    let mut parts: Vec<String> = Vec::new();

    for element in paragraphs {
        if in_noise_subtree(&element) {
            continue;
        }
        let text: String = element.text().collect::<Vec<_>>().join(" ");
        let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !cleaned.is_empty() {
            parts.push(cleaned);
        }
    }

    parts.join(" ")
}

/// True if any ancestor of the element is a script/style/nav/footer subtree
fn in_noise_subtree(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| NOISE_TAGS.contains(&ancestor.value().name()))
}
