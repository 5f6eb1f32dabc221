use std::path::{Path, PathBuf};

use regex::Regex;

use crate::domain::{BookFormat, Listing};

/// Strips characters that are illegal in filesystem path components.
///
/// Total over any input: an all-forbidden string collapses to an empty
/// component, which callers must surface to the user before use rather than
/// treat as an error here.
pub fn sanitize(raw: &str) -> String {
    let forbidden = Regex::new(r#"[/<>:"\\|?*]+"#).unwrap();
    forbidden.replace_all(raw, "").into_owned()
}

/// Composes `{base_dir}/{author} - {title}/{title}.{extension}` from a
/// listing, with author and title run through [`sanitize`].
pub fn build_destination(base_dir: &Path, listing: &Listing, format: BookFormat) -> PathBuf {
    let author = sanitize(&listing.author);
    let title = sanitize(&listing.title);
    base_dir
        .join(format!("{author} - {title}"))
        .join(format!("{title}.{}", format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CatalogId;

    fn listing(author: &str, title: &str) -> Listing {
        Listing {
            author: author.to_string(),
            title: title.to_string(),
            size_label: String::new(),
            catalog_id: "ABC123".parse::<CatalogId>().unwrap(),
            isbn_url: None,
        }
    }

    #[test]
    fn strips_every_forbidden_character() {
        let cleaned = sanitize(r#"a/b<c>d:e"f\g|h?i*j"#);
        assert_eq!(cleaned, "abcdefghij");
    }

    #[test]
    fn clean_input_passes_through() {
        assert_eq!(sanitize("Dune - Frank Herbert"), "Dune - Frank Herbert");
    }

    #[test]
    fn idempotent() {
        let once = sanitize(r#"T:1/2"#);
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn empty_input_yields_empty_component() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("/*?"), "");
    }

    #[test]
    fn destination_has_no_forbidden_characters_in_components() {
        let dest = build_destination(Path::new("C:/books"), &listing("A/B", "T:1"), BookFormat::Epub);
        let mut components = dest.components().rev();
        let file = components.next().unwrap().as_os_str().to_str().unwrap();
        let folder = components.next().unwrap().as_os_str().to_str().unwrap();
        assert_eq!(file, "T1.epub");
        assert_eq!(folder, "AB - T1");
    }

    #[test]
    fn destination_layout() {
        let dest = build_destination(
            Path::new("/books"),
            &listing("Frank Herbert", "Dune"),
            BookFormat::Epub,
        );
        assert_eq!(
            dest,
            PathBuf::from("/books/Frank Herbert - Dune/Dune.epub")
        );
    }
}
