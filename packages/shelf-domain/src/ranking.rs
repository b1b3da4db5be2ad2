use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankWeights {
	pub alpha: f64,
	pub beta: f64,
	pub gamma: f64,
}
impl Default for RankWeights {
	fn default() -> Self {
		Self { alpha: 0.7, beta: 0.2, gamma: 0.1 }
	}
}

/// A vector-recall hit awaiting symbolic re-scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
	pub item_id: Uuid,
	pub name: String,
	pub description: Option<String>,
	pub category: String,
	pub tags: Vec<String>,
	pub location_path: Option<String>,
	pub vector_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
	pub item_id: Uuid,
	pub name: String,
	pub description: Option<String>,
	pub category: String,
	pub tags: Vec<String>,
	pub location_path: Option<String>,
	pub score: f64,
}
impl SearchResult {
	pub fn from_candidate(candidate: Candidate, score: f64) -> Self {
		Self {
			item_id: candidate.item_id,
			name: candidate.name,
			description: candidate.description,
			category: candidate.category,
			tags: candidate.tags,
			location_path: candidate.location_path,
			score,
		}
	}
}

/// `score = alpha * vector + beta * jaccard(tags, query) + gamma * location_bonus`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchRanker {
	weights: RankWeights,
}
impl SearchRanker {
	pub fn new(weights: RankWeights) -> Self {
		Self { weights }
	}

	pub fn score(&self, vector_score: f64, jaccard: f64, location_bonus: f64) -> f64 {
		let RankWeights { alpha, beta, gamma } = self.weights;

		alpha * vector_score + beta * jaccard + gamma * location_bonus
	}

	/// Scores and orders candidates, highest first.
	///
	/// The sort is stable, so equal scores keep upstream recall order.
	pub fn rank(
		&self,
		candidates: Vec<Candidate>,
		query_tokens: &[String],
		location_filter: Option<&str>,
	) -> Vec<SearchResult> {
		let mut results: Vec<SearchResult> = candidates
			.into_iter()
			.map(|candidate| {
				let overlap = jaccard(&candidate.tags, query_tokens);
				let bonus = location_bonus(candidate.location_path.as_deref(), location_filter);
				let score = self.score(candidate.vector_score, overlap, bonus);

				SearchResult::from_candidate(candidate, score)
			})
			.collect();

		results.sort_by(|a, b| b.score.total_cmp(&a.score));

		results
	}
}

/// `|A ∩ B| / |A ∪ B|` over the distinct members of both sides; zero when both are empty.
pub fn jaccard<A, B>(left: &[A], right: &[B]) -> f64
where
	A: AsRef<str>,
	B: AsRef<str>,
{
	let left: HashSet<&str> = left.iter().map(AsRef::as_ref).collect();
	let right: HashSet<&str> = right.iter().map(AsRef::as_ref).collect();
	let union = left.union(&right).count();

	if union == 0 {
		return 0.0;
	}

	left.intersection(&right).count() as f64 / union as f64
}

pub fn location_bonus(location_path: Option<&str>, location_filter: Option<&str>) -> f64 {
	match (location_path, location_filter) {
		(Some(path), Some(filter)) if path.starts_with(filter) => 1.0,
		_ => 0.0,
	}
}

/// Whitespace-split, lowercased query terms.
pub fn query_tokens(query: &str) -> Vec<String> {
	query.to_lowercase().split_whitespace().map(str::to_string).collect()
}
