//! Link annotations.

use lopdf::{Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::model::{Link, Rect};

use super::resources::{resolve_array, resolve_dict};

/// Collect the link annotations of a page, in `/Annots` order.
///
/// Annotations without a usable `/Rect` are skipped; non-URI actions
/// (internal destinations, launch actions) are listed with `uri: None`.
pub fn page_links(doc: &Document, page_num: u32, page_id: ObjectId) -> Vec<Link> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    let Some(annots) = page.get(b"Annots").ok().and_then(|a| resolve_array(doc, a)) else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for (index, annot) in annots.iter().enumerate() {
        let Some(dict) = resolve_dict(doc, annot) else {
            continue;
        };
        if dict.get(b"Subtype").and_then(Object::as_name).ok() != Some(b"Link".as_slice()) {
            continue;
        }
        let Some(rect) = dict
            .get(b"Rect")
            .ok()
            .and_then(|r| resolve_array(doc, r))
            .and_then(|arr| Rect::from_pdf_array(arr))
        else {
            continue;
        };

        let uri = dict
            .get(b"A")
            .ok()
            .and_then(|a| resolve_dict(doc, a))
            .filter(|action| action.get(b"S").and_then(Object::as_name).ok() == Some(b"URI".as_slice()))
            .and_then(|action| action.get(b"URI").ok())
            .and_then(|u| doc.dereference(u).ok())
            .and_then(|(_, u)| u.as_str().ok())
            .map(|bytes| String::from_utf8_lossy(bytes).to_string());

        links.push(Link {
            page: page_num,
            index,
            uri,
            rect,
        });
    }
    links
}

/// Remove entries from a page's `/Annots` array by position.
///
/// The array may live directly in the page dictionary or in its own object.
/// The annotation objects themselves are left for garbage collection.
pub fn remove_annotations(doc: &mut Document, page_id: ObjectId, indices: &[usize]) -> Result<()> {
    if indices.is_empty() {
        return Ok(());
    }

    let annots_ref = doc
        .get_dictionary(page_id)?
        .get(b"Annots")
        .and_then(Object::as_reference)
        .ok();

    let annots = match annots_ref {
        Some(id) => doc.get_object_mut(id)?.as_array_mut()?,
        None => doc
            .get_dictionary_mut(page_id)?
            .get_mut(b"Annots")
            .map_err(|_| Error::MissingObject("page /Annots".to_string()))?
            .as_array_mut()?,
    };

    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    for &i in sorted.iter().rev() {
        if i < annots.len() {
            annots.remove(i);
        }
    }
    Ok(())
}
