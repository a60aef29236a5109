//! Domain value types shared across the agent, index, and CLI layers.

pub mod document;
pub mod verdict;

pub use document::Document;
pub use verdict::Verdict;
