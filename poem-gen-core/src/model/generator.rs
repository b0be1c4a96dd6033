use rand::Rng;
use serde::Serialize;

use crate::corpus::text::ends_with_terminal;
use crate::model::artifacts::Artifacts;
use crate::model::chain::Transition;

/// Alternatives listed per step (also the starter subset shown for a
/// line-initial position).
const MAX_ALTERNATIVES: usize = 12;

/// One generated unit with its explanation.
///
/// `prev` is the unit this one was reached from (`None` when
/// line-initial) and `probability` the transition probability given
/// `prev` (1.0 when line-initial).
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PoemToken {
	pub text: String,
	pub is_keyword: bool,
	pub prev: Option<String>,
	pub probability: f32,
}

/// One generated line.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PoemLine {
	pub tokens: Vec<PoemToken>,
}

/// Candidate unit for one step of the walk.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Alternative {
	pub text: String,
	pub probability: f32,
	pub is_keyword: bool,
}

/// Stateless generation engine over a finalized artifact bundle.
///
/// # Responsibilities
/// - Resolve a seed word to a chain unit through the fallback cascade
/// - Walk the chain with weighted-random edge selection, carrying the
///   per-token probability and keyword flag
/// - Expose the alternative candidates of any step
///
/// # Invariants
/// - never mutates the artifacts; concurrent calls need no coordination
/// - never fails on unmatched input: unknown seeds degrade to random
///   starters, unknown previous units to an empty alternative list
/// - all randomness flows through the caller's `Rng`
pub struct Generator<'a> {
	artifacts: &'a Artifacts,
}

impl<'a> Generator<'a> {
	pub fn new(artifacts: &'a Artifacts) -> Self {
		Self { artifacts }
	}

	/// Resolves a seed word to the unit a line starts from.
	///
	/// Resolution order: exact transition-table key, then a uniformly
	/// random table key containing the word, then a uniformly random
	/// starter containing it, then any starter. Reproducible under a
	/// fixed rng. `None` only when the starter pool is empty, which a
	/// successful build rules out.
	pub fn find_seed<R: Rng + ?Sized>(&self, word: &str, rng: &mut R) -> Option<String> {
		let table = &self.artifacts.table;
		if table.contains(word) {
			return Some(word.to_owned());
		}

		let containing: Vec<&str> = table.keys().filter(|key| key.contains(word)).collect();
		if !containing.is_empty() {
			return Some(containing[rng.random_range(0..containing.len())].to_owned());
		}

		let starters = &self.artifacts.starters;
		let matching: Vec<&str> = starters.iter().filter(|s| s.contains(word)).collect();
		if !matching.is_empty() {
			return Some(matching[rng.random_range(0..matching.len())].to_owned());
		}

		if starters.is_empty() {
			return None;
		}
		starters.get(rng.random_range(0..starters.len())).map(str::to_owned)
	}

	/// Generates up to `line_count` lines of at most
	/// `max_tokens_per_line` units each.
	///
	/// Every line independently re-resolves the seed, then walks the
	/// chain; a line ends early when the just-emitted unit carries a
	/// terminal mark or has no outgoing edges. Lines that end up empty
	/// are dropped silently, so the result may be shorter than
	/// `line_count`, never an error.
	pub fn generate<R: Rng + ?Sized>(
		&self,
		seed_word: &str,
		line_count: usize,
		max_tokens_per_line: usize,
		rng: &mut R,
	) -> Vec<PoemLine> {
		let mut poem = Vec::new();

		for _ in 0..line_count {
			let Some(start) = self.find_seed(seed_word, rng) else {
				break;
			};

			let mut tokens: Vec<PoemToken> = Vec::new();
			let mut current = start;
			let mut prev: Option<String> = None;
			let mut probability = 1.0_f32;

			while tokens.len() < max_tokens_per_line {
				tokens.push(PoemToken {
					text: current.clone(),
					is_keyword: self.keyword_of(&current).is_some(),
					prev: prev.clone(),
					probability,
				});

				if ends_with_terminal(&current) {
					break;
				}
				let Some(edges) = self.artifacts.table.get(&current) else {
					break;
				};
				let Some(chosen) = weighted_pick(edges, rng) else {
					break;
				};

				let total: u32 = edges.iter().map(|t| t.count).sum();
				probability = chosen.count as f32 / total as f32;
				prev = Some(std::mem::replace(&mut current, chosen.next.clone()));
			}

			if !tokens.is_empty() {
				poem.push(PoemLine { tokens });
			}
		}

		poem
	}

	/// Candidates for the step following `prev`.
	///
	/// A line-initial position (`prev` = `None`) lists the first 12
	/// starters with uniform probability. A unit with a table entry
	/// lists its edges with probability weight/total. Otherwise the
	/// first table key matching by substring (either direction) stands
	/// in; no match yields an empty list.
	pub fn alternatives(&self, prev: Option<&str>) -> Vec<Alternative> {
		let Some(prev) = prev else {
			let subset: Vec<&str> =
				self.artifacts.starters.iter().take(MAX_ALTERNATIVES).collect();
			let probability = 1.0 / subset.len().max(1) as f32;
			return subset
				.into_iter()
				.map(|text| Alternative {
					text: text.to_owned(),
					probability,
					is_keyword: self.keyword_of(text).is_some(),
				})
				.collect();
		};

		if let Some(edges) = self.artifacts.table.get(prev) {
			return self.edge_alternatives(edges);
		}

		let fallback = self
			.artifacts
			.table
			.keys()
			.find(|key| key.contains(prev) || prev.contains(*key));
		match fallback.and_then(|key| self.artifacts.table.get(key)) {
			Some(edges) => self.edge_alternatives(edges),
			None => Vec::new(),
		}
	}

	fn edge_alternatives(&self, edges: &[Transition]) -> Vec<Alternative> {
		let total: u32 = edges.iter().map(|t| t.count).sum();
		edges
			.iter()
			.map(|transition| Alternative {
				text: transition.next.clone(),
				probability: transition.count as f32 / total as f32,
				is_keyword: self.keyword_of(&transition.next).is_some(),
			})
			.collect()
	}

	/// The indexed word a unit's surface carries, if any.
	pub fn keyword_of(&self, token_text: &str) -> Option<&str> {
		self.artifacts.index.longest_match(token_text)
	}

	/// Ids of the documents containing an indexed word.
	pub fn documents_for(&self, word: &str) -> &[u32] {
		self.artifacts.index.docs_for(word).unwrap_or(&[])
	}
}

/// Weighted-random edge selection.
///
/// One uniform draw over the cumulative weight mass; candidates are
/// scanned in stored order and the first one whose cumulative weight
/// exceeds the draw wins. The last candidate backstops the boundary.
fn weighted_pick<'t, R: Rng + ?Sized>(
	transitions: &'t [Transition],
	rng: &mut R,
) -> Option<&'t Transition> {
	let total: u32 = transitions.iter().map(|t| t.count).sum();
	if total == 0 {
		return None;
	}

	let draw = rng.random_range(0..total);
	let mut cumulative = 0;
	for transition in transitions {
		cumulative += transition.count;
		if draw < cumulative {
			return Some(transition);
		}
	}
	transitions.last()
}
