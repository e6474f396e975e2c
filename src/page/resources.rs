//! Resource dictionary lookup with page-tree inheritance.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Guard against cyclic `/Parent` chains.
const MAX_TREE_DEPTH: usize = 64;

/// Resolve an object that should be a dictionary, following references.
pub fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    doc.dereference(obj).ok()?.1.as_dict().ok()
}

/// Resolve an object that should be an array, following references.
pub fn resolve_array<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Vec<Object>> {
    doc.dereference(obj).ok()?.1.as_array().ok()
}

/// The `/Resources` dictionary in effect for a page.
///
/// Walks up the `/Parent` chain when the page itself has none.
pub fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(res) = node.get(b"Resources") {
            return resolve_dict(doc, res);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// A named sub-dictionary of a resource dictionary, e.g. `/Font` or `/XObject`.
pub fn resource_category<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    category: &[u8],
) -> Option<&'a Dictionary> {
    resources
        .get(category)
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
}

/// Name of an object, or of the first element when it is an array
/// (used for `/ColorSpace` and `/Filter`).
pub fn name_or_first(doc: &Document, obj: &Object) -> Option<String> {
    let obj = doc.dereference(obj).ok()?.1;
    match obj {
        Object::Name(n) => Some(String::from_utf8_lossy(n).to_string()),
        Object::Array(arr) => arr.first().and_then(|o| name_or_first(doc, o)),
        _ => None,
    }
}
