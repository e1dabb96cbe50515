pub mod image;
pub mod import;

pub use image::{ImageHost, UploadedImageCache};
pub use import::CatalogImporter;
