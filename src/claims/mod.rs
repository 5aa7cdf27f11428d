//! Claim extraction, classification, and prioritization.

mod analyzer;
mod extractor;
mod types;

pub use analyzer::ClaimAnalyzer;
pub use extractor::{parse_contradiction_output, parse_extraction_output, ClaimExtractor};
pub use types::{Claim, ClaimType, Verifiability};
