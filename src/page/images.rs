//! Image XObjects of a page.

use std::collections::{HashMap, HashSet};

use lopdf::{Document, Object, ObjectId};

use crate::content::{PageContent, XObjectKind, PAGE_STREAM};
use crate::model::{PageImage, Rect};

use super::resources::{name_or_first, page_resources, resource_category};

/// List the images of a page: those in the page's resources, in resource
/// order, then those drawn from inside forms, in drawing order.
///
/// `content` supplies the placements and the images nested in forms;
/// images listed in the resources but never drawn are still reported with
/// no placements. An image stream is listed once per page.
pub fn page_images(
    doc: &Document,
    page_num: u32,
    page_id: ObjectId,
    content: Option<&PageContent>,
) -> Vec<PageImage> {
    let mut placements: HashMap<ObjectId, Vec<Rect>> = HashMap::new();
    let mut nested: Vec<(String, ObjectId)> = Vec::new();
    if let Some(content) = content {
        for draw in content.xobjects.iter().filter(|d| d.kind == XObjectKind::Image) {
            let Some(id) = draw.target else {
                continue;
            };
            placements.entry(id).or_default().push(draw.rect);
            if draw.stream != PAGE_STREAM {
                nested.push((draw.name.clone(), id));
            }
        }
    }

    let listed = page_resources(doc, page_id)
        .and_then(|r| resource_category(doc, r, b"XObject"))
        .into_iter()
        .flat_map(|xobjects| xobjects.iter())
        .filter_map(|(name, obj)| {
            let id = obj.as_reference().ok()?;
            Some((String::from_utf8_lossy(name).to_string(), id))
        });

    let mut seen = HashSet::new();
    let mut images = Vec::new();
    for (name, id) in listed.chain(nested) {
        if !seen.insert(id) {
            continue;
        }
        if let Some(mut image) = describe_image(doc, page_num, name, id) {
            image.placements = placements.remove(&id).unwrap_or_default();
            images.push(image);
        }
    }
    images
}

/// Describe an image stream, or `None` when `id` is not an image XObject.
fn describe_image(doc: &Document, page_num: u32, name: String, id: ObjectId) -> Option<PageImage> {
    let stream = doc.get_object(id).and_then(Object::as_stream).ok()?;
    let dict = &stream.dict;
    if dict.get(b"Subtype").and_then(Object::as_name).ok() != Some(b"Image".as_slice()) {
        return None;
    }

    let int = |key: &[u8]| {
        dict.get(key)
            .ok()
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_i64().ok())
    };
    let is_mask = dict
        .get(b"ImageMask")
        .and_then(Object::as_bool)
        .unwrap_or(false);

    Some(PageImage {
        page: page_num,
        width: int(b"Width").unwrap_or(0).max(0) as u32,
        height: int(b"Height").unwrap_or(0).max(0) as u32,
        bits_per_component: if is_mask {
            1
        } else {
            int(b"BitsPerComponent").unwrap_or(8).clamp(0, 16) as u8
        },
        color_space: dict.get(b"ColorSpace").ok().and_then(|cs| name_or_first(doc, cs)),
        filter: last_filter(doc, dict.get(b"Filter").ok()),
        placements: Vec::new(),
        name,
        id,
    })
}

/// The last filter of a `/Filter` entry, which determines the image encoding.
fn last_filter(doc: &Document, filter: Option<&Object>) -> Option<String> {
    let filter = doc.dereference(filter?).ok()?.1;
    match filter {
        Object::Name(n) => Some(String::from_utf8_lossy(n).to_string()),
        Object::Array(arr) => arr
            .last()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string()),
        _ => None,
    }
}
