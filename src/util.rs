use std::{
	collections::{HashMap, HashSet},
	hash::BuildHasherDefault,
};

use hashers::fnv::FNV1aHasher64;
use itertools::Itertools;

pub(crate) fn hash_set<K>() -> HashSet<K, BuildHasherDefault<FNV1aHasher64>> {
	HashSet::default()
}

pub(crate) fn hash_map<K, V>() -> HashMap<K, V, BuildHasherDefault<FNV1aHasher64>> {
	HashMap::default()
}

pub(crate) type HashM<K, V> = HashMap<K, V, BuildHasherDefault<FNV1aHasher64>>;
pub(crate) type HashS<K> = HashSet<K, BuildHasherDefault<FNV1aHasher64>>;

/// Splits on runs of spaces and tabs, skipping empty fields.
pub(crate) fn split_fields(line: &str) -> Vec<&str> {
	line.split([' ', '\t']).filter(|s| !s.is_empty()).collect_vec()
}

/// Joins `\`-continued lines, strips `#` comments and surrounding blanks, and drops empty lines.
/// Each logical line is paired with the 1-based physical line number it started on.
pub(crate) fn logical_lines(text: &str) -> Vec<(usize, String)> {
	let mut ret = vec![];
	let mut pending: Option<(usize, String)> = None;
	for (idx, raw) in text.lines().enumerate() {
		let without_comment = match raw.find('#') {
			Some(pos) => &raw[..pos],
			None => raw,
		};
		let trimmed = without_comment.trim_matches([' ', '\t', '\r']);
		let (body, continues) = match trimmed.strip_suffix('\\') {
			Some(body) => (body, true),
			None => (trimmed, false),
		};
		let (line_no, mut acc) = pending.take().unwrap_or((idx + 1, String::new()));
		acc.push_str(body);
		if continues {
			// Keep the boundary between continued fields.
			acc.push(' ');
			pending = Some((line_no, acc));
			continue;
		}
		if !acc.trim().is_empty() {
			ret.push((line_no, acc));
		}
	}
	if let Some((line_no, acc)) = pending {
		if !acc.trim().is_empty() {
			ret.push((line_no, acc));
		}
	}
	ret
}
