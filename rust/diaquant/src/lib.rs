pub mod data_sources;
pub mod errors;
pub mod models;
pub mod scoring;
pub mod utils;

pub use data_sources::{
    LibrarySchema,
    PrecursorQuery,
    Speclib,
};
pub use models::FragmentTraceMatrix;
pub use scoring::{
    ExtractionParams,
    PrecursorExtractor,
    PrecursorQuant,
};
