pub mod document;
pub mod prescription;

pub use document::*;
pub use prescription::*;
