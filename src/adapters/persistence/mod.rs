//! Persistence Adapters - JSONL-based File Storage
//!
//! Implements the Repository port with append-only daily JSONL files.
//! No database dependency.

pub mod journal;

pub use journal::JsonlJournal;
