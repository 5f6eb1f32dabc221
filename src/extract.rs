//! Turns the catalog's HTML pages into typed data.
//!
//! The results page carries no per-record ids: the author list is the only
//! reliably marked node, and everything else is reached through positional
//! sibling hops from it. Those hops are isolated in the named accessors
//! below so the traversal rules stay testable against fixtures.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::domain::{CatalogId, Listing};

const AUTHOR_MARKER: &str = "ul.catalog_authors";
const CATALOG_ID_PATTERN: &str = r"/fiction/(?P<catalog_id>[0-9A-Z]*)";
const ISBN_PATTERN: &str = r"ISBN: (?P<isbn>\d*)";
const ISBN_LOOKUP_PREFIX: &str = "https://isbnsearch.org/isbn/";

/// Result of one pass over a search-results page.
#[derive(Debug)]
pub struct ExtractedListings {
    /// Surfaced records, in document order (page ranking is meaningful).
    pub listings: Vec<Listing>,
    /// Author-marked nodes that failed to yield a catalog id.
    pub dropped: usize,
}

/// Extracts listing records from a search-results page.
///
/// Best-effort per record: a record without a catalog id is dropped and
/// counted, every other missing field degrades to an empty value.
pub fn extract_listings(html: &str) -> ExtractedListings {
    let document = Html::parse_document(html);
    let author_marker = Selector::parse(AUTHOR_MARKER).unwrap();
    let catalog_id_re = Regex::new(CATALOG_ID_PATTERN).unwrap();
    let isbn_re = Regex::new(ISBN_PATTERN).unwrap();

    let mut listings = Vec::new();
    let mut dropped = 0usize;

    for author_node in document.select(&author_marker) {
        let author = collect_text(author_node);

        let Some(title_link) = title_link_of(author_node) else {
            dropped += 1;
            continue;
        };
        let Some(catalog_id) = catalog_id_of(&catalog_id_re, title_link) else {
            dropped += 1;
            continue;
        };

        let title = collect_text(title_link);
        let isbn_url = isbn_cell_of(title_link)
            .and_then(|text| isbn_lookup_url(&isbn_re, &text));
        let size_label = size_cell_of(author_node)
            .map(|text| size_segment(&text))
            .unwrap_or_default();

        listings.push(Listing {
            author,
            title,
            size_label,
            catalog_id,
            isbn_url,
        });
    }

    ExtractedListings { listings, dropped }
}

/// Extracts the resolved binary URL from a detail page: the designated
/// download container, its first heading, the first hyperlink inside it.
/// The scheme is forced to plain `http`; the mirror is only reachable
/// unencrypted.
pub fn extract_download_url(html: &str) -> Option<Url> {
    let document = Html::parse_document(html);
    let container = Selector::parse("div#download").unwrap();
    let heading = Selector::parse("h2").unwrap();
    let link = Selector::parse("a").unwrap();

    // The chain is strict: only the first heading counts, even when a later
    // heading carries a hyperlink.
    let href = document
        .select(&container)
        .next()?
        .select(&heading)
        .next()?
        .select(&link)
        .next()?
        .value()
        .attr("href")?;

    let mut url = Url::parse(href).ok()?;
    url.set_scheme("http").ok()?;
    Some(url)
}

/// All element siblings of `element`, in document order, excluding itself.
fn sibling_elements(element: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut before: Vec<ElementRef<'_>> = element
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .collect();
    before.reverse();
    before.extend(element.next_siblings().filter_map(ElementRef::wrap));
    before
}

fn parent_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.parent().and_then(ElementRef::wrap)
}

/// The first hyperlink inside the second sibling of the author node's
/// parent cell; carries both the title text and the catalog-id href.
fn title_link_of(author_node: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let anchor = Selector::parse("a").unwrap();
    let cell = parent_element(author_node)?;
    sibling_elements(cell)
        .get(1)
        .and_then(|title_cell| title_cell.select(&anchor).next())
}

/// Text of the sibling immediately preceding the title block, where a
/// labelled ISBN token may live.
fn isbn_cell_of(title_link: ElementRef<'_>) -> Option<String> {
    let block = parent_element(title_link)?;
    sibling_elements(block)
        .first()
        .map(|cell| collect_text(*cell))
}

/// Text of the fourth sibling of the author node's parent cell, holding
/// `language / size`.
fn size_cell_of(author_node: ElementRef<'_>) -> Option<String> {
    let cell = parent_element(author_node)?;
    sibling_elements(cell)
        .get(3)
        .map(|size_cell| collect_text(*size_cell))
}

fn catalog_id_of(re: &Regex, title_link: ElementRef<'_>) -> Option<CatalogId> {
    let href = title_link.value().attr("href")?;
    let captured = re.captures(href)?.name("catalog_id")?.as_str();
    captured.parse().ok()
}

fn isbn_lookup_url(re: &Regex, cell_text: &str) -> Option<Url> {
    let digits = re.captures(cell_text.trim())?.name("isbn")?.as_str();
    if digits.is_empty() {
        return None;
    }
    Url::parse(&format!("{ISBN_LOOKUP_PREFIX}{digits}")).ok()
}

/// Segment after the first slash of a `language / size` cell, or empty when
/// the cell has fewer than two segments.
fn size_segment(cell_text: &str) -> String {
    let mut segments = cell_text.split('/');
    let _language = segments.next();
    segments
        .next()
        .map(|size| size.trim().to_string())
        .unwrap_or_default()
}

fn collect_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(author: &str, href: &str, title: &str, isbn: &str, size_cell: &str) -> String {
        format!(
            r#"<tr>
                <td><ul class="catalog_authors"><li><a href="/authors/x">{author}</a></li></ul></td>
                <td>Series</td>
                <td>
                    <p class="catalog_identifier">{isbn}</p>
                    <p><a href="{href}">{title}</a></p>
                </td>
                <td>2020</td>
                <td>{size_cell}</td>
            </tr>"#
        )
    }

    fn page(rows: &[String]) -> String {
        format!("<table><tbody>{}</tbody></table>", rows.join("\n"))
    }

    #[test]
    fn extracts_full_record() {
        let html = page(&[row(
            "Frank Herbert",
            "/fiction/5A2F91",
            "Dune",
            "ISBN: 9780441013593",
            "English / 3.2 MB",
        )]);
        let extracted = extract_listings(&html);
        assert_eq!(extracted.dropped, 0);
        assert_eq!(extracted.listings.len(), 1);

        let listing = &extracted.listings[0];
        assert_eq!(listing.author, "Frank Herbert");
        assert_eq!(listing.title, "Dune");
        assert_eq!(listing.catalog_id.as_str(), "5A2F91");
        assert_eq!(listing.size_label, "3.2 MB");
        assert_eq!(
            listing.isbn_url.as_ref().unwrap().as_str(),
            "https://isbnsearch.org/isbn/9780441013593"
        );
    }

    #[test]
    fn preserves_document_order() {
        let html = page(&[
            row("B", "/fiction/B1", "Second", "", "English / 1 MB"),
            row("A", "/fiction/A1", "First", "", "English / 2 MB"),
        ]);
        let extracted = extract_listings(&html);
        let ids: Vec<&str> = extracted
            .listings
            .iter()
            .map(|l| l.catalog_id.as_str())
            .collect();
        assert_eq!(ids, ["B1", "A1"]);
    }

    #[test]
    fn drops_record_without_catalog_id() {
        let html = page(&[
            row("Kept", "/fiction/AA11", "Good", "", "English / 1 MB"),
            row("Dropped", "/elsewhere/AA22", "Bad", "", "English / 1 MB"),
            row("Dropped too", "/fiction/", "Empty id", "", "English / 1 MB"),
        ]);
        let extracted = extract_listings(&html);
        assert_eq!(extracted.listings.len(), 1);
        assert_eq!(extracted.dropped, 2);
        assert_eq!(extracted.listings[0].title, "Good");
    }

    #[test]
    fn missing_isbn_and_size_degrade_to_empty() {
        let html = page(&[row("A", "/fiction/AB12", "T", "no token here", "English")]);
        let extracted = extract_listings(&html);
        let listing = &extracted.listings[0];
        assert!(listing.isbn_url.is_none());
        assert_eq!(listing.size_label, "");
    }

    #[test]
    fn empty_isbn_digits_are_not_a_lookup_url() {
        let html = page(&[row("A", "/fiction/AB12", "T", "ISBN: ", "English / 1 MB")]);
        let extracted = extract_listings(&html);
        assert!(extracted.listings[0].isbn_url.is_none());
    }

    #[test]
    fn download_url_found_and_forced_to_http() {
        let html = r#"
            <div id="download">
                <h2><a href="https://mirror.example/get/file.epub">GET</a></h2>
            </div>"#;
        let url = extract_download_url(html).unwrap();
        assert_eq!(url.as_str(), "http://mirror.example/get/file.epub");
    }

    #[test]
    fn download_url_absent_when_chain_breaks() {
        assert!(extract_download_url("<div id=\"download\"><h2>no link</h2></div>").is_none());
        assert!(extract_download_url("<div><h2><a href=\"http://x\">a</a></h2></div>").is_none());
        assert!(extract_download_url("").is_none());
    }

    #[test]
    fn link_in_a_later_heading_does_not_count() {
        let html = r#"
            <div id="download">
                <h2>no link</h2>
                <h2><a href="https://mirror.example/get/file.epub">GET</a></h2>
            </div>"#;
        assert!(extract_download_url(html).is_none());
    }
}
