pub mod correlation;
pub mod partition;
