pub mod speclib;

pub use speclib::{
    FragmentTarget,
    LibraryFormat,
    LibraryRow,
    LibrarySchema,
    PrecursorQuery,
    Speclib,
};
