use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::corpus::text::{has_content_char, strip_markers};
use crate::model::tokenizer::Tokenizer;

/// Generic copulas, light verbs and catch-all nouns that would index
/// almost every document.
const STOP_TOKENS: [&str; 19] = [
	"する", "いる", "ある", "なる", "れる", "られる", "せる", "させる", "ない",
	"よう", "こと", "もの", "ところ", "ため", "それ", "これ", "どの", "この",
	"その",
];

/// Indexed words must span at least this many characters.
const MIN_TOKEN_CHARS: usize = 2;

/// Reverse index: content word → sorted ascending list of containing
/// document ids.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct TokenIndex {
	entries: BTreeMap<String, Vec<u32>>,
}

impl TokenIndex {
	/// Document ids containing the word, or `None` when unindexed.
	pub fn docs_for(&self, word: &str) -> Option<&[u32]> {
		self.entries.get(word).map(Vec::as_slice)
	}

	pub fn contains(&self, word: &str) -> bool {
		self.entries.contains_key(word)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Longest indexed word contained in `text`.
	///
	/// Exact hits win outright; otherwise every indexed word is scanned
	/// and the longest substring match is kept (first-encountered on
	/// equal lengths). Handles flow units with attached particles, e.g.
	/// `計算は` still resolves to `計算`.
	pub fn longest_match<'a>(&'a self, text: &str) -> Option<&'a str> {
		if let Some((word, _)) = self.entries.get_key_value(text) {
			return Some(word);
		}

		let mut best: Option<&str> = None;
		for word in self.entries.keys() {
			if word.chars().count() < MIN_TOKEN_CHARS || !text.contains(word.as_str()) {
				continue;
			}
			if best.is_none_or(|b| word.chars().count() > b.chars().count()) {
				best = Some(word);
			}
		}
		best
	}
}

/// Accumulates the word → document-id sets of the reverse index.
///
/// An independent tokenization pass over the full, marker-stripped
/// bodies; shares nothing with the chain pass.
#[derive(Default)]
pub struct IndexBuilder {
	entries: HashMap<String, BTreeSet<u32>>,
}

impl IndexBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Indexes the retainable content words of one document body.
	pub fn add_document<T: Tokenizer + ?Sized>(&mut self, id: u32, body: &str, tokenizer: &T) {
		let clean = strip_markers(body);
		for morpheme in tokenizer.tokenize(&clean) {
			let surface = morpheme.surface.trim();
			if !morpheme.category.is_indexable() || morpheme.subcategory.is_excluded() {
				continue;
			}
			if surface.chars().count() < MIN_TOKEN_CHARS
				|| !has_content_char(surface)
				|| STOP_TOKENS.contains(&surface)
			{
				continue;
			}
			self.entries.entry(surface.to_owned()).or_default().insert(id);
		}
	}

	/// Merges another builder into this one. Id sets are unions; order
	/// never matters here.
	pub fn merge(&mut self, other: Self) {
		for (word, ids) in other.entries {
			self.entries.entry(word).or_default().extend(ids);
		}
	}

	pub fn finalize(self) -> TokenIndex {
		let entries = self
			.entries
			.into_iter()
			.map(|(word, ids)| (word, ids.into_iter().collect()))
			.collect();
		TokenIndex { entries }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::tokenizer::{Morpheme, WordCategory, WordSubcategory};

	/// Whitespace-splitting stub: `surface/category[/subcategory]` tokens.
	struct TaggedTokenizer;

	impl Tokenizer for TaggedTokenizer {
		fn tokenize(&self, text: &str) -> Vec<Morpheme> {
			text.split_whitespace()
				.map(|token| {
					let mut parts = token.split('/');
					let surface = parts.next().unwrap_or_default();
					let category = match parts.next() {
						Some("n") => WordCategory::Noun,
						Some("v") => WordCategory::Verb,
						Some("adj") => WordCategory::Adjective,
						Some("adv") => WordCategory::Adverb,
						Some("prt") => WordCategory::Particle,
						_ => WordCategory::Other,
					};
					let subcategory = match parts.next() {
						Some("pron") => WordSubcategory::Pronoun,
						Some("num") => WordSubcategory::Numeral,
						Some("suf") => WordSubcategory::Suffix,
						Some("dep") => WordSubcategory::NonIndependent,
						_ => WordSubcategory::General,
					};
					Morpheme::new(surface, category, subcategory)
				})
				.collect()
		}
	}

	fn index(docs: &[(u32, &str)]) -> TokenIndex {
		let mut builder = IndexBuilder::new();
		for (id, body) in docs {
			builder.add_document(*id, body, &TaggedTokenizer);
		}
		builder.finalize()
	}

	#[test]
	fn indexes_content_words_with_sorted_ids() {
		let built = index(&[(3, "機械/n 歩く/v"), (1, "機械/n"), (2, "機械/n")]);
		assert_eq!(built.docs_for("機械"), Some(&[1, 2, 3][..]));
		assert_eq!(built.docs_for("歩く"), Some(&[3][..]));
	}

	#[test]
	fn filters_categories_subcategories_and_stopwords() {
		let built = index(&[(
			1,
			"それ/n/pron 三/n/num が/prt する/v テープ/n 字/n ff/x",
		)]);
		// pronoun, numeral, particle, stop token, single char, non-indexable
		assert_eq!(built.len(), 1);
		assert!(built.contains("テープ"));
	}

	#[test]
	fn hiragana_only_tokens_are_skipped() {
		let built = index(&[(1, "ゆらぎ/n テープ/n")]);
		assert!(!built.contains("ゆらぎ"));
		assert!(built.contains("テープ"));
	}

	#[test]
	fn markers_are_stripped_before_tokenizing() {
		// the cross-reference sigil must not reach the tokenizer
		let built = index(&[(1, "【機械/n】 →§12/n")]);
		assert!(built.contains("機械"));
		assert_eq!(built.len(), 1);
	}

	#[test]
	fn longest_match_prefers_exact_then_longest() {
		let built = index(&[(1, "計算/n 計算機械/n 機械/n")]);
		assert_eq!(built.longest_match("計算"), Some("計算"));
		assert_eq!(built.longest_match("計算機械は"), Some("計算機械"));
		assert_eq!(built.longest_match("その機械が"), Some("機械"));
		assert_eq!(built.longest_match("無関係"), None);
	}

	#[test]
	fn merge_is_a_set_union() {
		let mut left = IndexBuilder::new();
		left.add_document(2, "機械/n", &TaggedTokenizer);
		let mut right = IndexBuilder::new();
		right.add_document(1, "機械/n 詩人/n", &TaggedTokenizer);
		left.merge(right);
		let built = left.finalize();

		assert_eq!(built.docs_for("機械"), Some(&[1, 2][..]));
		assert_eq!(built.docs_for("詩人"), Some(&[1][..]));
	}
}
