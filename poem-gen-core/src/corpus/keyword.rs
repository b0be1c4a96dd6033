use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Explicit keyword marker span, e.g. `【差異》…` → captures the span text.
static KEYWORD_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"【([^】]+)】").unwrap());

/// Dense ideographic/syllabic run: CJK ideographs, hiragana, katakana and
/// the long-vowel mark, 2 to 8 characters. Longer runs split greedily.
static TERM_RUN: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"[\u{4e00}-\u{9fff}\u{3041}-\u{3096}\u{30a1}-\u{30f6}ー]{2,8}").unwrap()
});

/// Capitalized Latin term of length >= 4.
static LATIN_TERM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z][A-Za-z]{3,}").unwrap());

/// Weight of one explicit keyword marker occurrence.
const MARKER_WEIGHT: u32 = 3;

/// Cap on the retained keyword list.
const MAX_KEYWORDS: usize = 300;

/// Common grammatical fragments the run scan must not promote to keywords.
const STOP_FRAGMENTS: [&str; 40] = [
	"ことが", "として", "という", "それは", "これは", "ここで", "しかし",
	"つまり", "すなわち", "あるいは", "ものである", "ことである", "である",
	"において", "について", "よって", "ための", "による", "それが",
	"ないこと", "あること", "していた", "されている", "している", "したこと",
	"こととは", "ことは", "ことの", "ことを", "ものは", "ものを", "ものの",
	"したのは", "されたの", "するのは", "するもの", "したもの",
	"ここには", "そこには", "これを",
];

/// A retained corpus keyword.
///
/// `weight` is the summed score of all extraction passes over all
/// documents; `document_ids` is sorted ascending and never empty.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Keyword {
	pub word: String,
	pub document_ids: Vec<u32>,
	pub weight: u32,
}

#[derive(Clone, Debug)]
struct Entry {
	weight: u32,
	documents: BTreeSet<u32>,
	seq: u64,
}

/// Accumulates weighted keyword totals across the corpus.
///
/// # Responsibilities
/// - Run the three extraction passes over each body
/// - Track per-word total weight and containing-document ids
/// - Merge partial accumulators from parallel workers (counts are
///   additive; discovery order is preserved by in-order merging)
/// - Finalize into the retained, weight-sorted, capped keyword list
///
/// # Invariants
/// - `seq` reflects first-discovery order and is unique per word
/// - retained keywords satisfy `weight >= 3` or `documents.len() >= 2`
#[derive(Default)]
pub struct KeywordAccumulator {
	entries: HashMap<String, Entry>,
	next_seq: u64,
}

impl KeywordAccumulator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Extracts keywords from one document body.
	///
	/// Three passes, each adding to the word's running total:
	/// explicit `【…】` spans (+3), ideographic/syllabic runs outside the
	/// stoplist (+1), capitalized Latin terms (+1). An empty body simply
	/// contributes nothing.
	pub fn add_document(&mut self, id: u32, body: &str) {
		for captures in KEYWORD_SPAN.captures_iter(body) {
			self.bump(captures[1].trim(), MARKER_WEIGHT, id);
		}

		for found in TERM_RUN.find_iter(body) {
			let word = found.as_str();
			if !STOP_FRAGMENTS.contains(&word) {
				self.bump(word, 1, id);
			}
		}

		for found in LATIN_TERM.find_iter(body) {
			self.bump(found.as_str(), 1, id);
		}
	}

	fn bump(&mut self, word: &str, weight: u32, id: u32) {
		if word.is_empty() {
			return;
		}
		let seq = self.next_seq;
		let entry = self.entries.entry(word.to_owned()).or_insert_with(|| {
			Entry { weight: 0, documents: BTreeSet::new(), seq }
		});
		if entry.seq == seq {
			self.next_seq += 1;
		}
		entry.weight += weight;
		entry.documents.insert(id);
	}

	/// Merges another accumulator into this one.
	///
	/// The other accumulator's words are folded in by their own discovery
	/// order, so merging chunk deltas in chunk order reproduces the
	/// sequential pass exactly.
	pub fn merge(&mut self, other: Self) {
		let mut incoming: Vec<(String, Entry)> = other.entries.into_iter().collect();
		incoming.sort_by_key(|(_, entry)| entry.seq);

		for (word, entry) in incoming {
			let seq = self.next_seq;
			let slot = self.entries.entry(word).or_insert_with(|| {
				Entry { weight: 0, documents: BTreeSet::new(), seq }
			});
			if slot.seq == seq {
				self.next_seq += 1;
			}
			slot.weight += entry.weight;
			slot.documents.extend(entry.documents);
		}
	}

	/// Applies the retention invariant and produces the final list.
	///
	/// Keeps words appearing in 2+ documents or with weight >= 3, sorted
	/// by weight descending (ties by first discovery), truncated to 300.
	pub fn finalize(self) -> Vec<Keyword> {
		let mut retained: Vec<(String, Entry)> = self
			.entries
			.into_iter()
			.filter(|(_, entry)| entry.documents.len() >= 2 || entry.weight >= MARKER_WEIGHT)
			.collect();

		retained.sort_by(|(_, a), (_, b)| b.weight.cmp(&a.weight).then(a.seq.cmp(&b.seq)));
		retained.truncate(MAX_KEYWORDS);

		retained
			.into_iter()
			.map(|(word, entry)| Keyword {
				word,
				document_ids: entry.documents.into_iter().collect(),
				weight: entry.weight,
			})
			.collect()
	}
}
