use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum BundleSplitError {
    #[error("could not read the bundle: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("the bundle has no bookmark outline")]
    NoOutline,
    #[error("no bookmark in the bundle resolves to a page")]
    NoPageDestinations,
    #[error("bundle split was cancelled")]
    Cancelled,
}

/// One per-candidate PDF successfully carved out of the bundle.
#[derive(Debug, Clone)]
pub struct SplitEntry {
    pub name: String,
    pub external_id: Option<String>,
    pub first_page: u32,
    pub last_page: u32,
    pub pdf: Vec<u8>,
}

/// One bookmark whose sub-document could not be built. Failures never stop
/// the remaining entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitFailure {
    pub name: String,
    pub page: u32,
    pub detail: String,
}

#[derive(Debug)]
pub struct SplitOutcome {
    pub entries: Vec<SplitEntry>,
    pub failures: Vec<SplitFailure>,
    pub page_count: u32,
}

/// Emitted after every entry, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitProgressUpdate {
    pub completed: u32,
    pub total: u32,
    pub current_name: String,
}

struct Bookmark {
    title: String,
    page: u32,
}

/// Splits a bundle into per-candidate PDFs along its top-level bookmarks.
///
/// Bookmarks without an explicit page destination are skipped. The rest are
/// sorted by target page; each entry spans from its own page up to the page
/// before the next entry, and the last entry runs to the end of the
/// document. Page boundaries come from bookmark order alone, so a bookmark
/// that leaves no pages before its successor fails on its own while every
/// other entry still builds. Cancellation is honoured between entries.
pub fn split_bundle<F>(
    bytes: &[u8],
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<SplitOutcome, BundleSplitError>
where
    F: FnMut(&SplitProgressUpdate),
{
    let document = Document::load_mem(bytes)?;
    let pages = document.get_pages();
    let page_count = pages.len() as u32;
    let pages_by_id: HashMap<ObjectId, u32> =
        pages.iter().map(|(number, id)| (*id, *number)).collect();

    let mut bookmarks = bookmark_entries(&document, &pages_by_id)?;
    bookmarks.sort_by_key(|bookmark| bookmark.page);

    let total = bookmarks.len() as u32;
    let mut entries = Vec::new();
    let mut failures = Vec::new();

    for (index, bookmark) in bookmarks.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(BundleSplitError::Cancelled);
        }

        let (name, external_id) = parse_title(&bookmark.title);
        let first_page = bookmark.page;
        let last_page = match bookmarks.get(index + 1) {
            Some(next) => next.page.saturating_sub(1),
            None => page_count,
        };

        if last_page < first_page {
            failures.push(SplitFailure {
                name: name.clone(),
                page: first_page,
                detail: format!(
                    "bookmark at page {first_page} spans no pages before the next bookmark"
                ),
            });
        } else {
            match build_entry_pdf(&document, first_page, last_page, page_count) {
                Ok(pdf) => entries.push(SplitEntry {
                    name: name.clone(),
                    external_id,
                    first_page,
                    last_page,
                    pdf,
                }),
                Err(error) => failures.push(SplitFailure {
                    name: name.clone(),
                    page: first_page,
                    detail: error.to_string(),
                }),
            }
        }

        on_progress(&SplitProgressUpdate {
            completed: (index + 1) as u32,
            total,
            current_name: name,
        });
    }

    Ok(SplitOutcome {
        entries,
        failures,
        page_count,
    })
}

/// Walks the top-level outline chain. A `Next` cycle in a malformed file
/// ends the walk instead of looping.
fn bookmark_entries(
    document: &Document,
    pages_by_id: &HashMap<ObjectId, u32>,
) -> Result<Vec<Bookmark>, BundleSplitError> {
    let catalog = document.catalog()?;
    let outlines = catalog
        .get(b"Outlines")
        .ok()
        .and_then(|object| resolve_dict(document, object))
        .ok_or(BundleSplitError::NoOutline)?;

    let mut bookmarks = Vec::new();
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut found_any = false;
    let mut current = outlines.get(b"First").ok();

    while let Some(object) = current {
        let id = match object.as_reference() {
            Ok(id) => id,
            Err(_) => break,
        };
        if !visited.insert(id) {
            break;
        }
        let item = match resolve_dict(document, object) {
            Some(item) => item,
            None => break,
        };
        found_any = true;

        if let Some(page) = destination_page(document, item, pages_by_id) {
            let title = item
                .get(b"Title")
                .ok()
                .and_then(|object| resolve_string(document, object))
                .unwrap_or_default();
            bookmarks.push(Bookmark { title, page });
        }

        current = item.get(b"Next").ok();
    }

    if !found_any {
        return Err(BundleSplitError::NoOutline);
    }
    if bookmarks.is_empty() {
        return Err(BundleSplitError::NoPageDestinations);
    }
    Ok(bookmarks)
}

/// Resolves a bookmark's target page through either a direct `Dest` or a
/// `GoTo` action. Named destinations and non-page targets yield `None`.
fn destination_page(
    document: &Document,
    item: &Dictionary,
    pages_by_id: &HashMap<ObjectId, u32>,
) -> Option<u32> {
    let dest = match item.get(b"Dest") {
        Ok(dest) => Some(dest),
        Err(_) => item
            .get(b"A")
            .ok()
            .and_then(|action| resolve_dict(document, action))
            .and_then(|action| action.get(b"D").ok()),
    }?;
    let array = resolve_array(document, dest)?;
    match array.first() {
        Some(Object::Reference(page_id)) => pages_by_id.get(page_id).copied(),
        _ => None,
    }
}

fn resolve_dict<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => match document.get_object(*id) {
            Ok(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        },
        _ => None,
    }
}

fn resolve_array<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Vec<Object>> {
    match object {
        Object::Array(array) => Some(array),
        Object::Reference(id) => match document.get_object(*id) {
            Ok(Object::Array(array)) => Some(array),
            _ => None,
        },
        _ => None,
    }
}

fn resolve_string(document: &Document, object: &Object) -> Option<String> {
    match object {
        Object::String(raw, _) => Some(decode_pdf_text(raw)),
        Object::Reference(id) => match document.get_object(*id) {
            Ok(Object::String(raw, _)) => Some(decode_pdf_text(raw)),
            _ => None,
        },
        _ => None,
    }
}

/// Copies the source and keeps only the pages in `[first_page, last_page]`.
/// The bundle's own outline is dropped from the copy so sub-documents do not
/// carry dangling bookmarks.
fn build_entry_pdf(
    source: &Document,
    first_page: u32,
    last_page: u32,
    page_count: u32,
) -> Result<Vec<u8>, lopdf::Error> {
    let mut document = source.clone();

    let excluded: Vec<u32> = (1..=page_count)
        .filter(|page| *page < first_page || *page > last_page)
        .collect();
    if !excluded.is_empty() {
        document.delete_pages(&excluded);
    }

    let catalog_id = document.trailer.get(b"Root")?.as_reference()?;
    if let Object::Dictionary(catalog) = document.get_object_mut(catalog_id)? {
        catalog.remove(b"Outlines");
    }

    document.prune_objects();
    document.renumber_objects();
    document.compress();

    let mut buffer = Vec::new();
    document.save_to(&mut buffer)?;
    Ok(buffer)
}

/// Bookmark titles follow a `Name (ID)` convention. Titles without the
/// parenthesized suffix are taken whole as the name.
fn parse_title(title: &str) -> (String, Option<String>) {
    let trimmed = title.trim();
    if trimmed.ends_with(')') {
        if let Some(open) = trimmed.rfind('(') {
            let name = trimmed[..open].trim();
            let identifier = trimmed[open + 1..trimmed.len() - 1].trim();
            if !name.is_empty() && !identifier.is_empty() {
                return (name.to_string(), Some(identifier.to_string()));
            }
        }
    }
    (trimmed.to_string(), None)
}

/// PDF text strings are UTF-16BE when they carry a byte-order mark,
/// otherwise treated as UTF-8 with a Latin-1 fallback for legacy producers.
fn decode_pdf_text(raw: &[u8]) -> String {
    if let Some(body) = raw.strip_prefix(&[0xfe, 0xff]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(raw) {
        Ok(text) => text.to_string(),
        Err(_) => raw.iter().map(|byte| char::from(*byte)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_split_into_name_and_identifier() {
        assert_eq!(
            parse_title("Ada Lovelace (4471)"),
            ("Ada Lovelace".to_string(), Some("4471".to_string()))
        );
        assert_eq!(
            parse_title("  Grace Hopper  "),
            ("Grace Hopper".to_string(), None)
        );
        assert_eq!(
            parse_title("Kim Holt ()"),
            ("Kim Holt ()".to_string(), None)
        );
        assert_eq!(parse_title("(4471)"), ("(4471)".to_string(), None));
        assert_eq!(parse_title(""), (String::new(), None));
    }

    #[test]
    fn pdf_text_decoding_handles_both_encodings() {
        assert_eq!(decode_pdf_text(b"Plain Title"), "Plain Title");

        let utf16 = [0xfe, 0xff, 0x00, 0x4a, 0x00, 0x6f, 0x00, 0x73, 0x00, 0xe9];
        assert_eq!(decode_pdf_text(&utf16), "Jos\u{e9}");

        assert_eq!(decode_pdf_text(&[0x4a, 0x6f, 0x73, 0xe9]), "Jos\u{e9}");
    }
}
