use std::path::Path;
use std::{fs, thread};

use log::info;
use serde::{Deserialize, Serialize};

use crate::corpus::document::{self, Document};
use crate::corpus::keyword::{Keyword, KeywordAccumulator};
use crate::error::Result;
use crate::io;
use crate::model::chain::{ChainBuilder, StarterPool, TransitionTable};
use crate::model::token_index::{IndexBuilder, TokenIndex};
use crate::model::tokenizer::Tokenizer;

/// Keywords reported per document.
const KEYWORDS_PER_DOCUMENT: usize = 40;

/// Documents returned by a corpus search.
const MAX_SEARCH_RESULTS: usize = 10;

/// Queries shorter than this match nothing.
const MIN_SEARCH_CHARS: usize = 2;

/// Snippet context: characters kept before and after the matched word.
const SNIPPET_BEFORE: usize = 30;
const SNIPPET_AFTER: usize = 40;

/// The immutable artifact bundle produced by one corpus build.
///
/// Holds the sorted document list with derived backlinks and the four
/// generation artifacts: keyword list, transition table, starter pool
/// and reverse token index. Built once, then only read; the generation
/// engine and every query below take `&self`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Artifacts {
	pub documents: Vec<Document>,
	pub keywords: Vec<Keyword>,
	pub table: TransitionTable,
	pub starters: StarterPool,
	pub index: TokenIndex,
}

/// One worker's contribution: the three accumulators over its chunk of
/// documents.
#[derive(Default)]
struct BuildDelta {
	keywords: KeywordAccumulator,
	chain: ChainBuilder,
	index: IndexBuilder,
}

impl BuildDelta {
	fn add_document<T: Tokenizer + ?Sized>(&mut self, document: &Document, tokenizer: &T) {
		self.keywords.add_document(document.id, &document.body);
		self.chain.add_document(&document.body, tokenizer);
		self.index.add_document(document.id, &document.body, tokenizer);
	}

	fn merge(&mut self, other: Self) {
		self.keywords.merge(other.keywords);
		self.chain.merge(other.chain);
		self.index.merge(other.index);
	}
}

impl Artifacts {
	/// Compiles the whole corpus into the artifact bundle.
	///
	/// Documents are split into chunks processed by one worker thread
	/// each; every worker accumulates a local delta and the deltas are
	/// merged strictly in chunk order, so the result is identical to a
	/// sequential pass whatever the core count.
	pub fn build<T>(mut documents: Vec<Document>, tokenizer: &T) -> Self
	where
		T: Tokenizer + Sync + ?Sized,
	{
		documents.sort_by_key(|d| d.id);

		let mut merged = BuildDelta::default();
		if !documents.is_empty() {
			let cpus = num_cpus::get();
			let factor = 8;
			let chunk_size = documents.len().div_ceil(cpus * factor).max(1);

			merged = thread::scope(|scope| {
				let handles: Vec<_> = documents
					.chunks(chunk_size)
					.map(|chunk| {
						scope.spawn(move || {
							let mut delta = BuildDelta::default();
							for document in chunk {
								delta.add_document(document, tokenizer);
							}
							delta
						})
					})
					.collect();

				let mut merged = BuildDelta::default();
				for handle in handles {
					merged.merge(handle.join().expect("corpus worker panicked"));
				}
				merged
			});
		}

		let keywords = merged.keywords.finalize();
		let (table, starters) = merged.chain.finalize();
		let index = merged.index.finalize();

		info!(
			"compiled {} documents: {} keywords, {} chain units, {} starters, {} indexed words",
			documents.len(),
			keywords.len(),
			table.len(),
			starters.len(),
			index.len()
		);

		Self { documents, keywords, table, starters, index }
	}

	/// Serializes the bundle to a compact binary file.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let bytes = postcard::to_stdvec(self)?;
		fs::write(path, bytes)?;
		Ok(())
	}

	/// Loads a bundle previously written by [`Artifacts::save`].
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = fs::read(path)?;
		Ok(postcard::from_bytes(&bytes)?)
	}

	/// Loads the binary bundle cached next to `corpus_dir` if present,
	/// otherwise parses the directory, builds the artifacts and writes
	/// the cache.
	///
	/// `corpus/` is cached as `corpus.bin`. A failed build persists
	/// nothing.
	pub fn load_or_build<P, T>(corpus_dir: P, tokenizer: &T) -> Result<Self>
	where
		P: AsRef<Path>,
		T: Tokenizer + Sync + ?Sized,
	{
		let cache = io::build_output_path(&corpus_dir, "bin")?;
		if cache.exists() {
			info!("loading artifact bundle from {}", cache.display());
			return Self::load(&cache);
		}

		let documents = document::load_dir(&corpus_dir)?;
		let artifacts = Self::build(documents, tokenizer);
		artifacts.save(&cache)?;
		Ok(artifacts)
	}

	/// Looks a document up by id.
	pub fn document(&self, id: u32) -> Option<&Document> {
		self.documents
			.binary_search_by_key(&id, |d| d.id)
			.ok()
			.map(|index| &self.documents[index])
	}

	/// Retained keywords appearing in the given document, strongest
	/// first, at most 40.
	pub fn keywords_for(&self, id: u32) -> Vec<&Keyword> {
		self.keywords
			.iter()
			.filter(|keyword| keyword.document_ids.binary_search(&id).is_ok())
			.take(KEYWORDS_PER_DOCUMENT)
			.collect()
	}

	/// Body context around the first occurrence of `word` in a document.
	///
	/// Up to 30 characters before and 40 after, ellipses at cut edges,
	/// newlines flattened to spaces. Empty when the document or the word
	/// is absent.
	pub fn snippet(&self, id: u32, word: &str) -> String {
		let Some(document) = self.document(id) else {
			return String::new();
		};
		let body = &document.body;
		let Some(position) = body.find(word) else {
			return String::new();
		};

		let start = body[..position]
			.char_indices()
			.rev()
			.nth(SNIPPET_BEFORE - 1)
			.map_or(0, |(i, _)| i);
		let word_end = position + word.len();
		let end = body[word_end..]
			.char_indices()
			.nth(SNIPPET_AFTER)
			.map_or(body.len(), |(i, _)| word_end + i);

		let mut snippet = String::new();
		if start > 0 {
			snippet.push('…');
		}
		snippet.push_str(&body[start..end].replace('\n', " "));
		if end < body.len() {
			snippet.push('…');
		}
		snippet
	}

	/// Case-insensitive substring search over titles and bodies.
	///
	/// Queries shorter than 2 characters match nothing; at most the
	/// first 10 documents (in id order) are returned.
	pub fn search(&self, query: &str) -> Vec<&Document> {
		let query = query.trim().to_lowercase();
		if query.chars().count() < MIN_SEARCH_CHARS {
			return Vec::new();
		}

		self.documents
			.iter()
			.filter(|d| {
				d.title.to_lowercase().contains(&query) || d.body.to_lowercase().contains(&query)
			})
			.take(MAX_SEARCH_RESULTS)
			.collect()
	}
}
