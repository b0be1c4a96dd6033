use serde::{Deserialize, Serialize};

/// Primary grammatical category of a morpheme.
///
/// Mirrors the part-of-speech granularity the pipeline filters on; any
/// category the filters never look at maps to `Other`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordCategory {
	Noun,
	Verb,
	Adjective,
	Adverb,
	Conjunction,
	Interjection,
	Particle,
	Auxiliary,
	Other,
}

impl WordCategory {
	/// Categories that stand as their own flow unit in the chain.
	pub fn is_flow_content(self) -> bool {
		matches!(
			self,
			Self::Noun
				| Self::Verb
				| Self::Adjective
				| Self::Adverb
				| Self::Conjunction
				| Self::Interjection
		)
	}

	/// Categories concatenated onto the preceding flow unit.
	pub fn is_attachable(self) -> bool {
		matches!(self, Self::Particle | Self::Auxiliary)
	}

	/// Categories eligible for the reverse token index.
	pub fn is_indexable(self) -> bool {
		matches!(self, Self::Noun | Self::Verb | Self::Adjective | Self::Adverb)
	}
}

/// Secondary subcategory of a morpheme.
///
/// Only the four excluded subcategories are distinguished; everything
/// else is `General`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordSubcategory {
	NonIndependent,
	Suffix,
	Numeral,
	Pronoun,
	General,
}

impl WordSubcategory {
	/// Subcategories excluded from both the chain and the index.
	pub fn is_excluded(self) -> bool {
		!matches!(self, Self::General)
	}
}

/// One token of the external tokenizer's output stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Morpheme {
	pub surface: String,
	pub category: WordCategory,
	pub subcategory: WordSubcategory,
}

impl Morpheme {
	pub fn new(
		surface: impl Into<String>,
		category: WordCategory,
		subcategory: WordSubcategory,
	) -> Self {
		Self { surface: surface.into(), category, subcategory }
	}
}

/// External morphological tokenizer.
///
/// Constructed once before the pipeline runs; a failed construction is
/// surfaced as [`crate::error::BuildError::Tokenizer`] and aborts the
/// whole build. The core is agnostic to the implementation: production
/// builds plug a dictionary-based analyzer, tests plug stubs.
pub trait Tokenizer {
	/// Splits a sentence into its ordered morpheme stream.
	fn tokenize(&self, text: &str) -> Vec<Morpheme>;
}
