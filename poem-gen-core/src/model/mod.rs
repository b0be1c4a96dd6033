//! Model artifacts and generation logic.
//!
//! The build side turns tokenized corpus bodies into three immutable
//! artifacts (transition table, starter pool, reverse token index) and
//! bundles them with the documents and keywords; the runtime side walks
//! the chain to generate explainable lines.

/// External morphological tokenizer contract.
///
/// The pipeline depends on a collaborator implementing [`tokenizer::Tokenizer`];
/// the analysis itself is never reimplemented here.
pub mod tokenizer;

/// Bigram transition table and starter pool.
///
/// Folds tokenized sentences into flow-unit sequences, accumulates
/// directed edge weights, and finalizes the capped, sorted table.
pub mod chain;

/// Reverse token index: content word → containing document ids.
pub mod token_index;

/// The immutable artifact bundle: build pipeline, persistence and
/// corpus queries.
pub mod artifacts;

/// Stateless generation engine over a finalized artifact bundle.
///
/// Exposes seed resolution, the weighted-random walk with per-token
/// probabilities, and alternative candidates per step.
pub mod generator;
