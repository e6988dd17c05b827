pub mod fragment_matrix;

pub use fragment_matrix::{
    FragmentTraceMatrix,
    QualityThresholds,
};
