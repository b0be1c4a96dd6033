//! Corpus ingestion.
//!
//! A corpus is a set of source units, each carrying a typed header block
//! and a free-form body. This module parses units into immutable
//! [`document::Document`]s with a derived backlink graph, and mines the
//! weighted keyword vocabulary from their bodies.

/// Document parsing, duplicate/link validation and backlink derivation.
pub mod document;

/// Multi-heuristic weighted keyword extraction.
///
/// Accumulates per-word totals across the corpus and finalizes them into
/// the retained, capped keyword list.
pub mod keyword;

/// Inline body conventions: cross-reference and keyword markers,
/// sentence splitting, character classes.
pub(crate) mod text;
