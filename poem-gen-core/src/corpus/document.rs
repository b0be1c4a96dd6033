use std::collections::{HashMap, HashSet};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};
use crate::io;

/// A single corpus document.
///
/// Parsed from a source unit: a `---`-fenced header of typed fields
/// followed by the body text. `linked_from` is never authored; it is
/// derived from the other documents' `links_to` lists at finalization.
///
/// # Invariants
/// - `id` is unique across the corpus and strictly positive
/// - every entry of `links_to` names an existing document
/// - `linked_from` is sorted ascending and free of duplicates
/// - immutable once the corpus is finalized
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Document {
	pub id: u32,
	pub title: String,
	pub cluster: u32,
	pub cluster_name: String,
	pub links_to: Vec<u32>,
	pub linked_from: Vec<u32>,
	pub body: String,
}

/// Header block: fenced by `---` lines, body follows the closing fence.
static HEADER: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"(?s)\A---\r?\n(.*?)\r?\n---\r?\n?(.*)\z").unwrap());

/// Parses one source unit into a [`Document`].
///
/// # Errors
/// Returns [`BuildError::Parse`] when the header fence is absent, a
/// header line has no `key: value` shape, a required field is missing,
/// or a field fails its typed coercion. `unit` names the source in the
/// error message.
pub(crate) fn parse_unit(unit: &str, content: &str) -> Result<Document> {
	let captures = HEADER
		.captures(content)
		.ok_or_else(|| BuildError::parse(unit, "missing header block"))?;
	let header = captures.get(1).map_or("", |m| m.as_str());
	let body = captures.get(2).map_or("", |m| m.as_str()).trim().to_owned();

	let mut fields: HashMap<&str, &str> = HashMap::new();
	for line in header.lines() {
		let line = line.trim();
		if line.is_empty() || line.starts_with('#') {
			continue;
		}
		let Some((key, value)) = line.split_once(':') else {
			return Err(BuildError::parse(unit, format!("malformed header line '{line}'")));
		};
		fields.insert(key.trim(), value.trim());
	}

	let id = int_field(unit, &fields, "id")?;
	if id == 0 {
		return Err(BuildError::parse(unit, "field `id` must be positive"));
	}

	Ok(Document {
		id,
		title: string_field(unit, &fields, "title")?,
		cluster: int_field(unit, &fields, "cluster")?,
		cluster_name: string_field(unit, &fields, "clusterName")?,
		links_to: id_list_field(unit, &fields, "linksTo")?,
		linked_from: Vec::new(),
		body,
	})
}

fn raw_field<'a>(unit: &str, fields: &HashMap<&str, &'a str>, name: &str) -> Result<&'a str> {
	fields
		.get(name)
		.copied()
		.ok_or_else(|| BuildError::parse(unit, format!("missing field `{name}`")))
}

fn int_field(unit: &str, fields: &HashMap<&str, &str>, name: &str) -> Result<u32> {
	raw_field(unit, fields, name)?
		.parse()
		.map_err(|_| BuildError::parse(unit, format!("invalid integer in field `{name}`")))
}

fn string_field(unit: &str, fields: &HashMap<&str, &str>, name: &str) -> Result<String> {
	let value = raw_field(unit, fields, name)?;
	// Double quotes around header strings are optional
	let unquoted = value
		.strip_prefix('"')
		.and_then(|v| v.strip_suffix('"'))
		.unwrap_or(value);
	Ok(unquoted.replace("\\\"", "\""))
}

fn id_list_field(unit: &str, fields: &HashMap<&str, &str>, name: &str) -> Result<Vec<u32>> {
	let value = raw_field(unit, fields, name)?;
	let inner = value
		.strip_prefix('[')
		.and_then(|v| v.strip_suffix(']'))
		.ok_or_else(|| BuildError::parse(unit, format!("field `{name}` must be a [..] list")))?;

	inner
		.split(',')
		.map(str::trim)
		.filter(|part| !part.is_empty())
		.map(|part| {
			part.parse()
				.map_err(|_| BuildError::parse(unit, format!("invalid id '{part}' in field `{name}`")))
		})
		.collect()
}

/// Accumulates parsed units and finalizes them into the sorted,
/// backlinked document list.
///
/// # Responsibilities
/// - Reject duplicate document ids as soon as they appear
/// - Sort documents ascending by id
/// - Validate that every link names an existing document
/// - Derive each document's `linked_from` set
#[derive(Default)]
pub struct CorpusBuilder {
	documents: Vec<Document>,
	seen: HashSet<u32>,
}

impl CorpusBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses and registers one source unit.
	///
	/// # Errors
	/// Propagates parse failures; returns [`BuildError::DuplicateId`]
	/// when the unit re-declares an already registered id.
	pub fn add_unit(&mut self, unit: &str, content: &str) -> Result<()> {
		let document = parse_unit(unit, content)?;
		if !self.seen.insert(document.id) {
			return Err(BuildError::DuplicateId { id: document.id });
		}
		self.documents.push(document);
		Ok(())
	}

	/// Sorts, validates links and derives backlinks.
	///
	/// For every document, its id is appended to each link target's
	/// backlink set (unless already present); backlink sets are sorted
	/// ascending at the end.
	///
	/// # Errors
	/// Returns [`BuildError::UnknownLinkTarget`] when a link references
	/// an id no document declares.
	pub fn finalize(mut self) -> Result<Vec<Document>> {
		self.documents.sort_by_key(|d| d.id);

		let links: Vec<(u32, Vec<u32>)> =
			self.documents.iter().map(|d| (d.id, d.links_to.clone())).collect();
		for (from, targets) in &links {
			for to in targets {
				let Ok(index) = self.documents.binary_search_by_key(to, |d| d.id) else {
					return Err(BuildError::UnknownLinkTarget { from: *from, to: *to });
				};
				let backlinks = &mut self.documents[index].linked_from;
				if !backlinks.contains(from) {
					backlinks.push(*from);
				}
			}
		}

		for document in &mut self.documents {
			document.linked_from.sort_unstable();
		}
		Ok(self.documents)
	}
}

/// Loads every `.md` unit of a directory, in file-name order.
pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<Document>> {
	let mut builder = CorpusBuilder::new();
	for path in io::list_files(&dir, "md")? {
		let unit = path
			.file_stem()
			.map(|s| s.to_string_lossy().to_string())
			.unwrap_or_default();
		let content = io::read_file(&path)?;
		builder.add_unit(&unit, &content)?;
	}
	builder.finalize()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn unit(id: u32, links: &str, body: &str) -> String {
		format!(
			"---\nid: {id}\ntitle: \"Unit {id}\"\ncluster: 1\nclusterName: test\nlinksTo: [{links}]\n---\n{body}"
		)
	}

	fn corpus(units: &[(u32, &str)]) -> Result<Vec<Document>> {
		let mut builder = CorpusBuilder::new();
		for (id, links) in units {
			builder.add_unit(&format!("unit{id}"), &unit(*id, links, "body text"))?;
		}
		builder.finalize()
	}

	#[test]
	fn parses_typed_header_and_body() {
		let content = "---\n# comment line\nid: 7\n\ntitle: \"The \\\"Tape\\\"\"\ncluster: 3\nclusterName: machines\nlinksTo: [1, 2]\n---\nBody here.";
		let document = parse_unit("seven", content).unwrap();
		assert_eq!(document.id, 7);
		assert_eq!(document.title, "The \"Tape\"");
		assert_eq!(document.cluster, 3);
		assert_eq!(document.cluster_name, "machines");
		assert_eq!(document.links_to, vec![1, 2]);
		assert!(document.linked_from.is_empty());
		assert_eq!(document.body, "Body here.");
	}

	#[test]
	fn empty_links_list_is_allowed() {
		let document = parse_unit("u", &unit(1, "", "text")).unwrap();
		assert!(document.links_to.is_empty());
	}

	#[test]
	fn missing_header_block_fails() {
		let err = parse_unit("u", "no fence at all").unwrap_err();
		assert!(matches!(err, BuildError::Parse { .. }));
	}

	#[test]
	fn missing_id_fails_naming_the_field() {
		let content = "---\ntitle: t\ncluster: 1\nclusterName: c\nlinksTo: []\n---\nbody";
		let err = parse_unit("u", content).unwrap_err().to_string();
		assert!(err.contains("`id`"), "{err}");
	}

	#[test]
	fn mistyped_cluster_fails() {
		let content = "---\nid: 1\ntitle: t\ncluster: loud\nclusterName: c\nlinksTo: []\n---\nbody";
		let err = parse_unit("u", content).unwrap_err().to_string();
		assert!(err.contains("`cluster`"), "{err}");
	}

	#[test]
	fn zero_id_is_rejected() {
		let content = "---\nid: 0\ntitle: t\ncluster: 1\nclusterName: c\nlinksTo: []\n---\nbody";
		assert!(parse_unit("u", content).is_err());
	}

	#[test]
	fn malformed_links_list_fails() {
		let content = "---\nid: 1\ntitle: t\ncluster: 1\nclusterName: c\nlinksTo: 2, 3\n---\nbody";
		assert!(parse_unit("u", content).is_err());
	}

	#[test]
	fn duplicate_ids_are_fatal() {
		let err = corpus(&[(1, ""), (1, "")]).unwrap_err();
		assert!(matches!(err, BuildError::DuplicateId { id: 1 }));
	}

	#[test]
	fn backlinks_are_derived() {
		let documents = corpus(&[(1, "2"), (2, "")]).unwrap();
		assert_eq!(documents[0].linked_from, Vec::<u32>::new());
		assert_eq!(documents[1].linked_from, vec![1]);
	}

	#[test]
	fn backlinks_are_sorted_and_deduplicated() {
		let documents = corpus(&[(3, "1"), (1, ""), (2, "1, 1")]).unwrap();
		// sorted by id: 1, 2, 3
		assert_eq!(documents[0].linked_from, vec![2, 3]);
	}

	#[test]
	fn unknown_link_target_is_fatal() {
		let err = corpus(&[(1, "9")]).unwrap_err();
		assert!(matches!(err, BuildError::UnknownLinkTarget { from: 1, to: 9 }));
	}

	#[test]
	fn load_dir_visits_units_in_file_order() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("b.md"), unit(2, "", "two")).unwrap();
		std::fs::write(dir.path().join("a.md"), unit(1, "2", "one")).unwrap();

		let documents = load_dir(dir.path()).unwrap();
		assert_eq!(documents.len(), 2);
		assert_eq!(documents[0].id, 1);
		assert_eq!(documents[1].linked_from, vec![1]);
	}
}
