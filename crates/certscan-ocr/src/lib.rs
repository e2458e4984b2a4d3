//! Text acquisition: source normalisation, cloud OCR, local OCR fallback.

mod backend;
mod error;
mod extractor;
mod normalize;

pub use backend::{CloudInput, CloudOcr, LocalInput, LocalOcr, OcrText};
pub use error::OcrError;
pub use extractor::{DEFAULT_CALL_TIMEOUT, MIN_TEXT_CHARS, TextExtractor};
pub use normalize::{NormalizedSource, PDF_MEDIA_TYPE, media_type_for_extension, normalize};

#[cfg(feature = "vision")]
mod vision;
#[cfg(feature = "vision")]
pub use vision::{VisionAuth, VisionClient};

#[cfg(feature = "tesseract")]
mod tesseract;
#[cfg(feature = "tesseract")]
pub use tesseract::TesseractEngine;
