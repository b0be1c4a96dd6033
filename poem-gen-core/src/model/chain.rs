use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::corpus::text::{split_sentences, strip_markers};
use crate::model::tokenizer::{Morpheme, Tokenizer};

/// Edges kept per source unit after finalization.
const MAX_TRANSITIONS: usize = 12;

/// Cap on the starter pool.
const MAX_STARTERS: usize = 300;

/// Sentences shorter than this (after marker stripping) are discarded.
const MIN_SENTENCE_CHARS: usize = 5;

/// Flow sequences shorter than this are discarded.
const MIN_FLOW_UNITS: usize = 2;

/// One weighted outgoing edge of the transition table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Transition {
	pub next: String,
	pub count: u32,
}

/// Finalized bigram table: flow unit → outgoing edges, sorted descending
/// by weight and truncated to 12. Units without outgoing edges are
/// absent. Keys iterate in a stable (lexicographic) order, which makes
/// substring scans reproducible.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct TransitionTable {
	entries: BTreeMap<String, Vec<Transition>>,
}

impl TransitionTable {
	pub fn get(&self, unit: &str) -> Option<&[Transition]> {
		self.entries.get(unit).map(Vec::as_slice)
	}

	pub fn contains(&self, unit: &str) -> bool {
		self.entries.contains_key(unit)
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Deduplicated first flow units of retained sentences, in first-seen
/// order, capped at 300.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct StarterPool {
	entries: Vec<String>,
}

impl StarterPool {
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(String::as_str)
	}

	pub fn get(&self, index: usize) -> Option<&str> {
		self.entries.get(index).map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[derive(Clone, Copy, Debug)]
struct EdgeStat {
	count: u32,
	seq: u64,
}

/// Accumulates bigram edges and starter occurrences across the corpus.
///
/// # Responsibilities
/// - Split bodies into sentences, strip markers, drop short sentences
/// - Fold morpheme streams into flow-unit sequences
/// - Count directed edges between adjacent flow units
/// - Merge partial builders from parallel workers
/// - Finalize into [`TransitionTable`] and [`StarterPool`]
///
/// # Invariants
/// - every recorded edge has count >= 1
/// - `seq` reflects first-observation order of edges, unique per edge
#[derive(Default)]
pub struct ChainBuilder {
	edges: HashMap<String, HashMap<String, EdgeStat>>,
	starters: Vec<String>,
	next_seq: u64,
}

impl ChainBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Feeds one document body into the chain.
	///
	/// Sentences too short after marker stripping, and sentences whose
	/// flow sequence has fewer than 2 units, contribute nothing.
	pub fn add_document<T: Tokenizer + ?Sized>(&mut self, body: &str, tokenizer: &T) {
		for sentence in split_sentences(body) {
			let clean = strip_markers(&sentence);
			let clean = clean.trim();
			if clean.chars().count() < MIN_SENTENCE_CHARS {
				continue;
			}
			self.add_sentence(tokenizer.tokenize(clean));
		}
	}

	fn add_sentence(&mut self, morphemes: Vec<Morpheme>) {
		let flow = flow_units(morphemes);
		if flow.len() < MIN_FLOW_UNITS {
			return;
		}

		self.starters.push(flow[0].clone());
		for pair in flow.windows(2) {
			self.record(&pair[0], &pair[1]);
		}
	}

	fn record(&mut self, from: &str, to: &str) {
		let seq = self.next_seq;
		let stat = self
			.edges
			.entry(from.to_owned())
			.or_default()
			.entry(to.to_owned())
			.or_insert(EdgeStat { count: 0, seq });
		if stat.seq == seq {
			self.next_seq += 1;
		}
		stat.count += 1;
	}

	/// Merges another builder into this one.
	///
	/// The other builder's edges are folded in by their own observation
	/// order; merging chunk deltas in chunk order therefore reproduces
	/// the sequential pass, starter order included.
	pub fn merge(&mut self, other: Self) {
		let mut incoming: Vec<(String, String, EdgeStat)> = other
			.edges
			.into_iter()
			.flat_map(|(from, edges)| {
				edges.into_iter().map(move |(to, stat)| (from.clone(), to, stat))
			})
			.collect();
		incoming.sort_by_key(|(_, _, stat)| stat.seq);

		for (from, to, stat) in incoming {
			let seq = self.next_seq;
			let slot = self
				.edges
				.entry(from)
				.or_default()
				.entry(to)
				.or_insert(EdgeStat { count: 0, seq });
			if slot.seq == seq {
				self.next_seq += 1;
			}
			slot.count += stat.count;
		}

		self.starters.extend(other.starters);
	}

	/// Sorts and caps every unit's outgoing edges, deduplicates the
	/// starter pool in first-seen order.
	pub fn finalize(self) -> (TransitionTable, StarterPool) {
		let mut entries = BTreeMap::new();
		for (unit, edges) in self.edges {
			let mut sorted: Vec<(String, EdgeStat)> = edges.into_iter().collect();
			sorted.sort_by(|(_, a), (_, b)| b.count.cmp(&a.count).then(a.seq.cmp(&b.seq)));
			sorted.truncate(MAX_TRANSITIONS);

			let transitions: Vec<Transition> = sorted
				.into_iter()
				.map(|(next, stat)| Transition { next, count: stat.count })
				.collect();
			entries.insert(unit, transitions);
		}

		let mut seen = HashSet::new();
		let mut starters = Vec::new();
		for starter in self.starters {
			if starters.len() >= MAX_STARTERS {
				break;
			}
			if seen.insert(starter.clone()) {
				starters.push(starter);
			}
		}

		(TransitionTable { entries }, StarterPool { entries: starters })
	}
}

/// Folds a morpheme stream into the flow sequence.
///
/// Content words stand alone; particles and auxiliaries glue onto the
/// preceding unit. A particle opening a sentence has nothing to attach
/// to and is dropped.
fn flow_units(morphemes: Vec<Morpheme>) -> Vec<String> {
	let mut flow: Vec<String> = Vec::new();

	for morpheme in morphemes {
		if morpheme.surface.trim().is_empty() {
			continue;
		}
		if morpheme.category.is_flow_content() && !morpheme.subcategory.is_excluded() {
			flow.push(morpheme.surface);
		} else if morpheme.category.is_attachable() {
			if let Some(last) = flow.last_mut() {
				last.push_str(&morpheme.surface);
			}
		}
	}

	flow
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;
	use crate::model::tokenizer::{WordCategory, WordSubcategory};

	fn m(surface: &str, category: WordCategory) -> Morpheme {
		Morpheme::new(surface, category, WordSubcategory::General)
	}

	/// Sentence-keyed stub standing in for the external analyzer.
	struct MapTokenizer(HashMap<String, Vec<Morpheme>>);

	impl MapTokenizer {
		fn new(sentences: Vec<(&str, Vec<Morpheme>)>) -> Self {
			Self(sentences.into_iter().map(|(s, ms)| (s.to_owned(), ms)).collect())
		}
	}

	impl Tokenizer for MapTokenizer {
		fn tokenize(&self, text: &str) -> Vec<Morpheme> {
			self.0.get(text).cloned().unwrap_or_default()
		}
	}

	fn cat_dog_tokenizer() -> MapTokenizer {
		MapTokenizer::new(vec![
			(
				"猫が歩く。",
				vec![
					m("猫", WordCategory::Noun),
					m("が", WordCategory::Particle),
					m("歩く。", WordCategory::Verb),
				],
			),
			(
				"犬が走る。",
				vec![
					m("犬", WordCategory::Noun),
					m("が", WordCategory::Particle),
					m("走る。", WordCategory::Verb),
				],
			),
		])
	}

	#[test]
	fn particles_attach_to_the_preceding_unit() {
		let tokenizer = cat_dog_tokenizer();
		let mut builder = ChainBuilder::new();
		builder.add_document("猫が歩く。犬が走る。", &tokenizer);
		let (table, starters) = builder.finalize();

		let edges = table.get("猫が").unwrap();
		assert_eq!(edges, &[Transition { next: "歩く。".to_owned(), count: 1 }]);
		assert_eq!(table.get("犬が").unwrap()[0].next, "走る。");
		// sentence-final units have no outgoing edges and no table entry
		assert!(table.get("歩く。").is_none());

		let pool: Vec<&str> = starters.iter().collect();
		assert_eq!(pool, vec!["猫が", "犬が"]);
	}

	#[test]
	fn leading_particle_is_dropped() {
		let tokenizer = MapTokenizer::new(vec![(
			"がそこに機械が響く",
			vec![
				m("が", WordCategory::Particle),
				m("機械", WordCategory::Noun),
				m("が", WordCategory::Particle),
				m("響く", WordCategory::Verb),
			],
		)]);
		let mut builder = ChainBuilder::new();
		builder.add_document("がそこに機械が響く", &tokenizer);
		let (table, starters) = builder.finalize();

		assert_eq!(starters.iter().collect::<Vec<_>>(), vec!["機械が"]);
		assert!(table.contains("機械が"));
	}

	#[test]
	fn excluded_subcategories_and_other_tokens_are_dropped() {
		let tokenizer = MapTokenizer::new(vec![(
			"それは昨日の計算だ",
			vec![
				Morpheme::new("それ", WordCategory::Noun, WordSubcategory::Pronoun),
				m("昨日", WordCategory::Noun),
				m("の", WordCategory::Particle),
				m("計算", WordCategory::Noun),
				m("、", WordCategory::Other),
				m("だ", WordCategory::Auxiliary),
			],
		)]);
		let mut builder = ChainBuilder::new();
		builder.add_document("それは昨日の計算だ", &tokenizer);
		let (table, starters) = builder.finalize();

		// the pronoun never enters the flow; punctuation is dropped
		assert_eq!(starters.iter().collect::<Vec<_>>(), vec!["昨日の"]);
		assert_eq!(table.get("昨日の").unwrap()[0].next, "計算だ");
	}

	#[test]
	fn short_sentences_are_discarded_after_stripping() {
		// raw length passes, stripped length does not
		let tokenizer = MapTokenizer::new(vec![(
			"を見よ",
			vec![m("見よ", WordCategory::Verb), m("何か", WordCategory::Noun)],
		)]);
		let mut builder = ChainBuilder::new();
		builder.add_document("→§12を見よ", &tokenizer);
		let (table, starters) = builder.finalize();

		assert!(table.is_empty());
		assert!(starters.is_empty());
	}

	#[test]
	fn single_unit_flows_are_discarded() {
		let tokenizer = MapTokenizer::new(vec![(
			"静かな機械仕掛け",
			vec![m("機械仕掛け", WordCategory::Noun)],
		)]);
		let mut builder = ChainBuilder::new();
		builder.add_document("静かな機械仕掛け", &tokenizer);
		let (table, starters) = builder.finalize();

		assert!(table.is_empty());
		assert!(starters.is_empty());
	}

	#[test]
	fn edges_are_sorted_capped_and_tie_broken_by_observation() {
		let mut sentences = Vec::new();
		for i in 0..15 {
			let key = format!("sentence{i:02}");
			sentences.push((
				key,
				vec![m("源", WordCategory::Noun), m(&format!("次{i:02}"), WordCategory::Noun)],
			));
		}
		let tokenizer = MapTokenizer(sentences.iter().cloned().collect());

		let mut builder = ChainBuilder::new();
		// sentence i observed i + 1 times
		for (i, (key, _)) in sentences.iter().enumerate() {
			for _ in 0..=i {
				builder.add_document(key, &tokenizer);
			}
		}
		let (table, _) = builder.finalize();

		let edges = table.get("源").unwrap();
		assert_eq!(edges.len(), 12);
		assert_eq!(edges[0], Transition { next: "次14".to_owned(), count: 15 });
		assert_eq!(edges[11], Transition { next: "次03".to_owned(), count: 4 });
		assert!(edges.windows(2).all(|w| w[0].count >= w[1].count));
	}

	#[test]
	fn equal_counts_keep_first_observed_order() {
		let tokenizer = MapTokenizer::new(vec![
			("甲から乙まで", vec![m("甲", WordCategory::Noun), m("乙", WordCategory::Noun)]),
			("甲から丙まで", vec![m("甲", WordCategory::Noun), m("丙", WordCategory::Noun)]),
		]);
		let mut builder = ChainBuilder::new();
		builder.add_document("甲から乙まで\n甲から丙まで", &tokenizer);
		let (table, _) = builder.finalize();

		let nexts: Vec<&str> = table.get("甲").unwrap().iter().map(|t| t.next.as_str()).collect();
		assert_eq!(nexts, vec!["乙", "丙"]);
	}

	#[test]
	fn starter_pool_is_deduplicated_and_capped() {
		let mut sentences = Vec::new();
		for i in 0..310 {
			let key = format!("sentence{i:03}");
			sentences.push((
				key,
				vec![m(&format!("頭{i:03}"), WordCategory::Noun), m("尾", WordCategory::Noun)],
			));
		}
		let tokenizer = MapTokenizer(sentences.iter().cloned().collect());

		let mut builder = ChainBuilder::new();
		for (key, _) in &sentences {
			// each sentence twice: duplicates must not inflate the pool
			builder.add_document(key, &tokenizer);
			builder.add_document(key, &tokenizer);
		}
		let (_, starters) = builder.finalize();

		assert_eq!(starters.len(), 300);
		assert_eq!(starters.get(0), Some("頭000"));
		assert_eq!(starters.get(299), Some("頭299"));
	}

	#[test]
	fn chunked_merge_matches_sequential_pass() {
		let tokenizer = cat_dog_tokenizer();
		let bodies = ["猫が歩く。", "犬が走る。猫が歩く。", "猫が歩く。犬が走る。"];

		let mut sequential = ChainBuilder::new();
		for body in &bodies {
			sequential.add_document(body, &tokenizer);
		}

		let mut merged = ChainBuilder::new();
		for body in &bodies {
			let mut delta = ChainBuilder::new();
			delta.add_document(body, &tokenizer);
			merged.merge(delta);
		}

		assert_eq!(sequential.finalize(), merged.finalize());
	}
}
