// ---------------------------------------------------------------------------
// Lookup index — derived structures rebuilt on every load
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use crate::tables::{PivotTable, RatingRecord};

/// Title normalization used for user input and pivot labels alike.
pub fn normalize_title(title: &str) -> String {
	title.trim().to_lowercase()
}

/// Cover URL cleanup: blank values and the literal "nan" left behind by
/// dataframe exports mean "no image".
pub fn clean_image_url(raw: Option<&str>) -> Option<String> {
	let value = raw?.trim();
	if value.is_empty() || value.eq_ignore_ascii_case("nan") {
		None
	} else {
		Some(value.to_string())
	}
}

/// Deduplicate titles keeping the first occurrence of each.
pub fn dedup_titles(names: &[String]) -> Vec<String> {
	let mut seen = HashSet::with_capacity(names.len());
	names
		.iter()
		.filter(|name| seen.insert(name.as_str()))
		.cloned()
		.collect()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LookupIndex {
	/// Deduplicated book names, first-seen order.
	pub titles: Vec<String>,
	/// Normalized pivot label → pivot label.
	pub normalized_titles: HashMap<String, String>,
	/// Rating title → cleaned cover URL.
	pub images: HashMap<String, Option<String>>,
}

impl LookupIndex {
	pub fn build(book_names: &[String], pivot: &PivotTable, ratings: &[RatingRecord]) -> Self {
		let titles = dedup_titles(book_names);

		// Later labels with the same normalized key win.
		let mut normalized_titles = HashMap::with_capacity(pivot.len());
		for label in pivot.index() {
			normalized_titles.insert(normalize_title(label), label.clone());
		}

		let mut images = HashMap::new();
		for record in ratings {
			if images.contains_key(&record.title) {
				continue;
			}
			images.insert(
				record.title.clone(),
				clean_image_url(record.image_url.as_deref()),
			);
		}

		Self {
			titles,
			normalized_titles,
			images,
		}
	}

	pub fn canonical_title(&self, input: &str) -> Option<&str> {
		self.normalized_titles
			.get(&normalize_title(input))
			.map(String::as_str)
	}

	pub fn image_for(&self, title: &str) -> Option<&str> {
		self.images.get(title).and_then(|url| url.as_deref())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn strings(items: &[&str]) -> Vec<String> {
		items.iter().map(|s| s.to_string()).collect()
	}

	fn pivot(labels: &[&str]) -> PivotTable {
		let rows = labels.iter().map(|_| vec![0.0]).collect();
		PivotTable::new(strings(labels), strings(&["u"]), rows).unwrap()
	}

	#[test]
	fn dedup_keeps_first_occurrence_order() {
		let names = strings(&["B", "A", "B", "C", "A"]);
		assert_eq!(dedup_titles(&names), strings(&["B", "A", "C"]));
	}

	#[test]
	fn clean_image_url_treats_blank_and_nan_as_absent() {
		assert_eq!(clean_image_url(None), None);
		assert_eq!(clean_image_url(Some("")), None);
		assert_eq!(clean_image_url(Some("   ")), None);
		assert_eq!(clean_image_url(Some("nan")), None);
		assert_eq!(clean_image_url(Some(" NaN ")), None);
		assert_eq!(
			clean_image_url(Some("  http://img/x.jpg ")),
			Some("http://img/x.jpg".to_string())
		);
	}

	#[test]
	fn normalized_titles_map_to_pivot_labels() {
		let index = LookupIndex::build(&[], &pivot(&["Harry Potter", " Dune "]), &[]);
		assert_eq!(index.canonical_title("  HARRY potter "), Some("Harry Potter"));
		assert_eq!(index.canonical_title("dune"), Some(" Dune "));
		assert_eq!(index.canonical_title("emma"), None);
	}

	#[test]
	fn later_pivot_labels_overwrite_normalized_key() {
		let index = LookupIndex::build(&[], &pivot(&["dune", "Dune"]), &[]);
		assert_eq!(index.canonical_title("DUNE"), Some("Dune"));
	}

	#[test]
	fn first_rating_row_per_title_wins() {
		let ratings = vec![
			RatingRecord::new("Dune", Some("nan")),
			RatingRecord::new("Dune", Some("http://img/dune.jpg")),
			RatingRecord::new("Emma", Some(" http://img/emma.jpg ")),
			RatingRecord::new("Ulysses", None),
		];
		let index = LookupIndex::build(&[], &pivot(&[]), &ratings);
		assert_eq!(index.image_for("Dune"), None);
		assert_eq!(index.image_for("Emma"), Some("http://img/emma.jpg"));
		assert_eq!(index.image_for("Ulysses"), None);
		assert!(index.images.contains_key("Ulysses"));
		assert_eq!(index.image_for("Unknown"), None);
	}
}
