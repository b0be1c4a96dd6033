use once_cell::sync::Lazy;
use regex::Regex;

/// Cross-reference marker: `§` plus a target id, optionally preceded by
/// an arrow, e.g. `→§12`.
static CROSS_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:→)?§\d+").unwrap());

/// Surface marks ending a generated line.
const TERMINAL_MARKS: [&str; 3] = ["。", "、", "——"];

/// Removes the inline markers from a body fragment.
///
/// Cross-reference sigils are dropped entirely; keyword markers keep
/// their span text, only the brackets go.
pub(crate) fn strip_markers(text: &str) -> String {
	let stripped = CROSS_REF.replace_all(text, "");
	stripped.replace(['【', '】'], "")
}

/// Splits a body into sentences on sentence-terminal punctuation and
/// newlines.
///
/// The terminator stays attached to its sentence, so units derived from
/// sentence-final morphemes keep their closing mark.
pub(crate) fn split_sentences(body: &str) -> Vec<String> {
	let mut sentences = Vec::new();
	let mut current = String::new();

	for c in body.chars() {
		match c {
			'。' => {
				current.push(c);
				flush(&mut current, &mut sentences);
			}
			'\n' => flush(&mut current, &mut sentences),
			_ => current.push(c),
		}
	}
	flush(&mut current, &mut sentences);

	sentences
}

fn flush(current: &mut String, sentences: &mut Vec<String>) {
	let trimmed = current.trim();
	if !trimmed.is_empty() {
		sentences.push(trimmed.to_owned());
	}
	current.clear();
}

/// True when the unit's surface ends with a terminal punctuation mark.
pub(crate) fn ends_with_terminal(surface: &str) -> bool {
	TERMINAL_MARKS.iter().any(|mark| surface.ends_with(mark))
}

/// True when the surface carries at least one CJK ideograph, katakana or
/// Latin letter. Hiragana-only tokens are too generic to index.
pub(crate) fn has_content_char(surface: &str) -> bool {
	surface.chars().any(|c| {
		matches!(c,
			'\u{4e00}'..='\u{9fff}'
			| '\u{30a1}'..='\u{30f6}'
			| 'A'..='Z'
			| 'a'..='z')
	})
}
