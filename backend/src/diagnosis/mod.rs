pub mod catalog;
pub mod image;
pub mod parser;
pub mod pipeline;

pub use image::ImageUpload;
pub use pipeline::DiagnosisPipeline;

/// Rejections raised before any model call is made.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Please describe the symptoms")]
    EmptySymptoms,
    #[error("No image uploaded")]
    MissingImage,
    #[error("Unsupported image format. Use JPEG, PNG, WebP or GIF")]
    UnsupportedImage,
    #[error("Image exceeds the 10 MB upload limit")]
    ImageTooLarge,
}
