//! # I/O
//!
//! Adapters around the core: CSV price source, CSV table sink and console preview.

pub mod preview;
pub mod sink;
pub mod source;

pub use preview::render_preview;
pub use sink::CsvSink;
pub use source::sample_assets;
pub use source::CsvPriceSource;
