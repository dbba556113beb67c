// file: src/parser/mod.rs
// description: checklist definition parsing module exports
// reference: internal module structure

pub mod checklist;

pub use checklist::ChecklistParser;
