pub mod area;
pub mod extraction;
pub mod peak_locator;

pub use extraction::{
    ExtractionBatch,
    ExtractionParams,
    ExtractionTimings,
    PrecursorExtractor,
    PrecursorQuant,
};
