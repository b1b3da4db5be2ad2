use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Error, IndexFilter, Providers, Result, VectorIndex, VectorMatch};
use shelf_config::{Config, EmbeddingProviderConfig, SEARCH_LIMIT_CEILING};
use shelf_domain::{
	hierarchy,
	ranking::{self, SearchRanker, SearchResult},
};
use shelf_storage::qdrant::{IMAGE_VECTOR_NAME, TEXT_VECTOR_NAME};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TextSearchRequest {
	pub query: String,
	/// Subtree root, e.g. `/Home/Kitchen`. Blank means unrestricted.
	#[serde(default)]
	pub location_filter: Option<String>,
	#[serde(default)]
	pub category: Option<String>,
	/// Tags that every hit must carry.
	#[serde(default)]
	pub tags: Vec<String>,
	/// Defaults to `search.default_limit`.
	#[serde(default)]
	pub limit: Option<u32>,
}

/// Embeds queries, recalls candidates from the vector index, and ranks them.
///
/// Holds no database handle, so it can run against any [`VectorIndex`].
#[derive(Clone)]
pub struct SearchOrchestrator {
	providers: Providers,
	index: Arc<dyn VectorIndex>,
	ranker: SearchRanker,
	embedding_cfg: EmbeddingProviderConfig,
	default_limit: u32,
	max_limit: u32,
	text_dimensions: usize,
	image_dimensions: usize,
	embedding_timeout: Duration,
	index_timeout: Duration,
}
impl SearchOrchestrator {
	pub fn new(cfg: &Config, providers: Providers, index: Arc<dyn VectorIndex>) -> Self {
		Self {
			providers,
			index,
			ranker: crate::ranker(cfg),
			embedding_cfg: cfg.providers.embedding.clone(),
			default_limit: cfg.search.default_limit,
			max_limit: cfg.search.max_limit.min(SEARCH_LIMIT_CEILING),
			text_dimensions: cfg.storage.qdrant.text_vector_dim as usize,
			image_dimensions: cfg.storage.qdrant.image_vector_dim as usize,
			embedding_timeout: Duration::from_millis(cfg.providers.embedding.timeout_ms),
			index_timeout: Duration::from_millis(cfg.storage.qdrant.timeout_ms),
		}
	}

	pub fn ranker(&self) -> SearchRanker {
		self.ranker
	}

	pub async fn text_search(&self, req: &TextSearchRequest) -> Result<Vec<SearchResult>> {
		let limit = self.resolve_limit(req.limit)?;
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::validation("query must be non-empty."));
		}

		let filter = IndexFilter {
			location: req.location_filter.as_deref().and_then(hierarchy::normalize_filter),
			category: req
				.category
				.as_deref()
				.map(str::trim)
				.filter(|category| !category.is_empty())
				.map(str::to_lowercase),
			tags: req
				.tags
				.iter()
				.map(|tag| tag.trim().to_lowercase())
				.filter(|tag| !tag.is_empty())
				.collect(),
		};
		let texts = [query.to_string()];
		let vectors = crate::bounded(
			self.embedding_timeout,
			"Embedding provider",
			self.providers.embedding.embed(&self.embedding_cfg, &texts),
		)
		.await?;
		let vector = crate::first_vector(vectors, self.text_dimensions)?;
		let matches = self.recall(TEXT_VECTOR_NAME, vector, &filter, limit).await?;
		let candidates = matches.into_iter().map(VectorMatch::into_candidate).collect();
		let query_tokens = ranking::query_tokens(query);
		let mut results = self.ranker.rank(candidates, &query_tokens, filter.location.as_deref());

		results.truncate(limit as usize);

		tracing::debug!(
			limit,
			location_filter = ?filter.location,
			result_count = results.len(),
			"Text search completed."
		);

		Ok(results)
	}

	/// Image search over the `image` named vector, in raw similarity order.
	///
	/// With the no-op vision strategy this returns no results rather than failing.
	pub async fn image_search(
		&self,
		image: &[u8],
		limit: Option<u32>,
	) -> Result<Vec<SearchResult>> {
		let limit = self.resolve_limit(limit)?;

		if self.providers.vision.is_noop() {
			tracing::warn!("Image search requested without a vision model. Returning no results.");

			return Ok(Vec::new());
		}

		let processed = crate::bounded(
			self.embedding_timeout,
			"Vision preprocessing",
			self.providers.vision.preprocess(image),
		)
		.await?;
		let vectors = crate::bounded(
			self.embedding_timeout,
			"Vision embedding",
			self.providers.vision.embed(&processed),
		)
		.await?;
		let Some(vector) = vectors.into_iter().next() else {
			return Ok(Vec::new());
		};

		if vector.len() != self.image_dimensions {
			return Err(Error::unavailable(format!(
				"Image vector dimension mismatch: expected {}, got {}.",
				self.image_dimensions,
				vector.len()
			)));
		}

		let matches = self.recall(IMAGE_VECTOR_NAME, vector, &IndexFilter::default(), limit).await?;
		let mut results: Vec<SearchResult> = matches
			.into_iter()
			.map(|hit| {
				let score = hit.score;

				SearchResult::from_candidate(hit.into_candidate(), score)
			})
			.collect();

		results.sort_by(|a, b| b.score.total_cmp(&a.score));
		results.truncate(limit as usize);

		tracing::debug!(limit, result_count = results.len(), "Image search completed.");

		Ok(results)
	}

	async fn recall(
		&self,
		vector_name: &str,
		vector: Vec<f32>,
		filter: &IndexFilter,
		limit: u32,
	) -> Result<Vec<VectorMatch>> {
		crate::bounded(
			self.index_timeout,
			"Vector index",
			self.index.search(vector_name, vector, filter, u64::from(limit)),
		)
		.await
	}

	fn resolve_limit(&self, limit: Option<u32>) -> Result<u32> {
		let limit = limit.unwrap_or(self.default_limit);

		if limit == 0 || limit > self.max_limit {
			return Err(Error::validation(format!(
				"limit must be in the range 1-{}; got {limit}.",
				self.max_limit
			)));
		}

		Ok(limit)
	}
}
