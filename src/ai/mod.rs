mod analyzer;

pub use analyzer::{Analyzer, AnalyzerSettings, DEFAULT_API_URL, DEFAULT_MODEL};
