use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, warn};
use url::Url;

use crate::domain::{BookFormat, CatalogId, Language, Listing};
use crate::error::BookgrabError;
use crate::extract;

/// Seam between the session and the catalog site. Implementations must be
/// shareable with the background workers the session spawns.
pub trait CatalogClient: Send + Sync {
    /// Fetches one page of search results for `term`. `page_index` is
    /// zero-based; the wire format is one-based.
    fn search(&self, term: &str, page_index: u32) -> Result<Vec<Listing>, BookgrabError>;

    /// Fetches the detail page for `id` and resolves the binary URL.
    fn resolve_download(&self, id: &CatalogId) -> Result<Url, BookgrabError>;
}

pub struct CatalogHttpClient {
    client: Client,
    catalog_url: Url,
    mirror_url: Url,
    language: Language,
    format: BookFormat,
}

impl CatalogHttpClient {
    pub fn new(catalog_url: Url, mirror_url: Url) -> Result<Self, BookgrabError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(format!("bookgrab/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| BookgrabError::CatalogHttp(err.to_string()))?;
        Ok(Self {
            client,
            catalog_url,
            mirror_url,
            language: Language::English,
            format: BookFormat::Epub,
        })
    }
}

impl CatalogClient for CatalogHttpClient {
    fn search(&self, term: &str, page_index: u32) -> Result<Vec<Listing>, BookgrabError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(BookgrabError::InvalidInput(
                "search term cannot be empty".to_string(),
            ));
        }

        let url = build_search_url(&self.catalog_url, term, self.language, self.format, page_index);
        debug!(%url, "catalog.search");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| BookgrabError::CatalogHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "catalog request failed".to_string());
            return Err(BookgrabError::CatalogStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| BookgrabError::CatalogHttp(err.to_string()))?;

        let extracted = extract::extract_listings(&body);
        if extracted.dropped > 0 {
            warn!(
                dropped = extracted.dropped,
                surfaced = extracted.listings.len(),
                "catalog.search dropped records without a catalog id"
            );
        }
        Ok(extracted.listings)
    }

    fn resolve_download(&self, id: &CatalogId) -> Result<Url, BookgrabError> {
        let url = build_detail_url(&self.mirror_url, id);
        debug!(%url, "catalog.resolve_download");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| BookgrabError::MirrorHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "mirror request failed".to_string());
            return Err(BookgrabError::MirrorStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| BookgrabError::MirrorHttp(err.to_string()))?;

        extract::extract_download_url(&body)
            .ok_or_else(|| BookgrabError::DownloadLinkNotFound(id.to_string()))
    }
}

/// `{base}?q={term}&criteria=&language={language}&format={format}&page={page_index+1}`
pub fn build_search_url(
    base: &Url,
    term: &str,
    language: Language,
    format: BookFormat,
    page_index: u32,
) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("q", term)
        .append_pair("criteria", "")
        .append_pair("language", language.as_str())
        .append_pair("format", format.as_str())
        .append_pair("page", &(page_index + 1).to_string());
    url
}

/// `{mirror}/{catalogId}`
pub fn build_detail_url(mirror: &Url, id: &CatalogId) -> String {
    format!(
        "{}/{}",
        mirror.as_str().trim_end_matches('/'),
        id.as_str()
    )
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn search_url_encodes_term_and_shifts_page() {
        let base = Url::parse("https://catalog.example/fiction/").unwrap();
        let url = build_search_url(&base, "Dune Frank Herbert", Language::English, BookFormat::Epub, 0);
        assert_eq!(
            url.as_str(),
            "https://catalog.example/fiction/?q=Dune+Frank+Herbert&criteria=&language=English&format=epub&page=1"
        );
    }

    #[test]
    fn detail_url_has_single_separator() {
        let mirror = Url::parse("http://mirror.example/").unwrap();
        let id: CatalogId = "5A2F91".parse().unwrap();
        assert_eq!(build_detail_url(&mirror, &id), "http://mirror.example/5A2F91");
    }

    #[test]
    fn whitespace_term_is_rejected_before_any_request() {
        // The catalog URL points nowhere routable; an attempted request
        // would surface as CatalogHttp, not InvalidInput.
        let client = CatalogHttpClient::new(
            Url::parse("http://127.0.0.1:1/").unwrap(),
            Url::parse("http://127.0.0.1:1/").unwrap(),
        )
        .unwrap();
        let err = client.search("   ", 0).unwrap_err();
        assert_matches!(err, BookgrabError::InvalidInput(_));
    }
}
