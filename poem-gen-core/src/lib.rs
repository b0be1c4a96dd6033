//! Corpus-compiled poem generation library.
//!
//! This crate provides a batch compilation pipeline and a runtime engine:
//! - Parsing of annotated corpus documents with a derived link graph
//! - Multi-heuristic weighted keyword extraction
//! - A word-level bigram transition table built through an external
//!   morphological tokenizer, plus a starter pool and a reverse token index
//! - A stateless generation engine producing short lines with explainable
//!   per-step probabilities and alternative candidates
//!
//! The build pipeline runs once and yields an immutable artifact bundle;
//! the engine only ever reads that bundle.

/// Corpus ingestion: document parsing, link graph, keyword extraction.
pub mod corpus;

/// Fatal build errors and the crate-wide `Result` alias.
pub mod error;

/// Model artifacts and generation logic.
///
/// This module exposes the tokenizer contract, the artifact builders and
/// the runtime generator interface.
pub mod model;

/// I/O utilities (file loading, path helpers).
///
/// Not exposed
pub(crate) mod io;
