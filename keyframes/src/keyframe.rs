pub mod extractor;
#[cfg(test)]
pub(crate) mod fakes;
pub mod logger;
pub mod request;
pub mod time_points;

pub use extractor::{
    ExtractionResult, Extractor, FrameReader, ImageWriter, MetadataResolver,
    ResolvedSource, StreamOpener,
};
pub use logger::ExtractionLog;
pub use request::{ExtractError, ExtractionRequest};
