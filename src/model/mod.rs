//! Plain data types shared by the editor, the CLI and reports.
//!
//! Nothing here touches `lopdf` documents directly; page scanning lives in
//! [`crate::page`] and [`crate::content`].

mod geometry;
mod image;
mod link;
mod report;
mod request;

pub use geometry::{get_number, Matrix, Rect};
pub use image::PageImage;
pub use link::Link;
pub use report::{ExportReport, Inventory, JsonFormat, RemovalReport};
pub use request::{Filter, ImageFilter, ImageSize, RemovalRequest};
