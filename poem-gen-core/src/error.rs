use thiserror::Error;

/// Fatal errors raised by the corpus build pipeline.
///
/// Every variant aborts the whole build; no partial artifacts are
/// persisted. Degradable conditions (an empty or malformed body) are not
/// errors and simply contribute nothing to the artifacts.
///
/// # Variants
/// - `Parse`: absent, malformed or incomplete header block of one unit
/// - `DuplicateId`: the same document id declared by two units
/// - `UnknownLinkTarget`: a `linksTo` entry naming no existing document
/// - `Tokenizer`: the external morphological tokenizer failed to initialize
/// - `Io` / `Serialization`: artifact persistence failures
#[derive(Error, Debug)]
pub enum BuildError {
	#[error("parse error in '{unit}': {reason}")]
	Parse { unit: String, reason: String },

	#[error("duplicate document id {id}")]
	DuplicateId { id: u32 },

	#[error("document {from} links to unknown document {to}")]
	UnknownLinkTarget { from: u32, to: u32 },

	#[error("tokenizer initialization failed: {0}")]
	Tokenizer(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] postcard::Error),
}

impl BuildError {
	/// Builds a `Parse` error for the given source unit.
	pub(crate) fn parse(unit: &str, reason: impl Into<String>) -> Self {
		Self::Parse { unit: unit.to_owned(), reason: reason.into() }
	}
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BuildError>;
