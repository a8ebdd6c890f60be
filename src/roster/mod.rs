mod aggregate;
mod backends;
mod chain;
mod config;
mod diagnostics;
mod fold;
mod grammar;
mod parser;
mod pipeline;
mod quality;
mod variant;

#[cfg(test)]
mod pipeline_tests;

pub use backends::{command_version_optional, tesseract_languages};
pub use config::ExtractionConfig;
pub use pipeline::Pipeline;
