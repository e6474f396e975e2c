//! Per-page object helpers: resources, link annotations, image XObjects.

mod images;
mod links;
pub mod resources;

pub use images::page_images;
pub use links::{page_links, remove_annotations};
