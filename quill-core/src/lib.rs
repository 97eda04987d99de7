//! Quill core library — parser, relationship inference, graph store, and sync.
//!
//! The main entry point is [`sync::SyncEngine`], which runs the
//! Scan, Parse, Infer, Diff, Apply pipeline against a [`store::GraphStore`].

pub mod config;
pub mod corpus;
pub mod error;
pub mod export;
pub mod infer;
pub mod parse;
pub mod progress;
pub mod store;
pub mod sync;
pub mod templates;
pub mod types;
