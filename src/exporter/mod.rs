// file: src/exporter/mod.rs
// description: report export module exports
// reference: internal module structure

pub mod markdown;

pub use markdown::{ExportManifest, ReportExporter};
