// ---------------------------------------------------------------------------
// Title search
// ---------------------------------------------------------------------------
//
// Search-as-you-type over the canonical title list: prefix matches first,
// then substring matches, each group in stored order.
// ---------------------------------------------------------------------------

pub const DEFAULT_SEARCH_LIMIT: usize = 8;

pub fn search_titles(titles: &[String], query: &str, limit: usize) -> Vec<String> {
	let needle = query.trim().to_lowercase();
	if needle.is_empty() {
		return titles.iter().take(limit).cloned().collect();
	}

	let mut prefix = Vec::new();
	let mut contains = Vec::new();
	for title in titles {
		let lowered = title.to_lowercase();
		if lowered.starts_with(&needle) {
			prefix.push(title);
		} else if lowered.contains(&needle) {
			contains.push(title);
		}
	}

	prefix
		.into_iter()
		.chain(contains)
		.take(limit)
		.cloned()
		.collect()
}
