pub mod admin;
pub mod index;
pub mod locations;
pub mod placements;
pub mod search;
pub mod things;
pub mod time_serde;

mod error;

pub use admin::RebuildReport;
pub use error::{Error, Result};
pub use index::{IndexPayload, QdrantIndex, VectorMatch};
pub use locations::Location;
pub use placements::Placement;
pub use search::{SearchOrchestrator, TextSearchRequest};
pub use things::{RegisteredThing, Thing, UpdateThingRequest};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use uuid::Uuid;

use shelf_config::{Config, EmbeddingProviderConfig};
use shelf_domain::{
	enrich::MetadataEnricher,
	ranking::{RankWeights, SearchRanker},
};
use shelf_providers::embedding;
use shelf_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

/// Nearest-neighbour index holding one entry per item with named vectors and a payload.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	/// Writes one named vector and the full payload of an entry.
	///
	/// Other named vectors of an existing entry are kept.
	fn upsert<'a>(
		&'a self,
		thing_id: Uuid,
		vector_name: &'a str,
		vector: Vec<f32>,
		payload: &'a IndexPayload,
	) -> BoxFuture<'a, color_eyre::Result<()>>;

	/// Rewrites only the location fields of an entry's payload.
	fn set_location<'a>(
		&'a self,
		thing_id: Uuid,
		location_path: Option<&'a str>,
	) -> BoxFuture<'a, color_eyre::Result<()>>;

	/// Matches by raw similarity, best first. A location in `filter` restricts recall to
	/// entries placed at or below that path.
	fn search<'a>(
		&'a self,
		vector_name: &'a str,
		vector: Vec<f32>,
		filter: &'a IndexFilter,
		limit: u64,
	) -> BoxFuture<'a, color_eyre::Result<Vec<VectorMatch>>>;

	fn delete<'a>(&'a self, thing_id: Uuid) -> BoxFuture<'a, color_eyre::Result<()>>;
}

/// Turns raw image bytes into query or index vectors.
pub trait VisionStrategy
where
	Self: Send + Sync,
{
	/// A no-op strategy produces placeholder vectors; callers treat it as "no vision".
	fn is_noop(&self) -> bool {
		false
	}

	fn preprocess<'a>(&'a self, image: &'a [u8]) -> BoxFuture<'a, color_eyre::Result<Vec<u8>>>;

	/// One vector per detected region, the whole image first.
	fn embed<'a>(&'a self, processed: &'a [u8]) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

/// Server-side recall restrictions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexFilter {
	/// Canonical subtree root, matched segment-wise.
	pub location: Option<String>,
	pub category: Option<String>,
	/// Every listed tag must be present.
	pub tags: Vec<String>,
}

/// Zero-vector placeholder used when no vision model is deployed.
pub struct NoopVision {
	dimensions: usize,
}
impl NoopVision {
	pub fn new(dimensions: usize) -> Self {
		Self { dimensions }
	}
}
impl VisionStrategy for NoopVision {
	fn is_noop(&self) -> bool {
		true
	}

	fn preprocess<'a>(&'a self, image: &'a [u8]) -> BoxFuture<'a, color_eyre::Result<Vec<u8>>> {
		Box::pin(async move { Ok(image.to_vec()) })
	}

	fn embed<'a>(
		&'a self,
		_processed: &'a [u8],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		let zero = vec![0.0; self.dimensions];

		Box::pin(async move { Ok(vec![zero]) })
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub vision: Arc<dyn VisionStrategy>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, vision: Arc<dyn VisionStrategy>) -> Self {
		Self { embedding, vision }
	}

	/// Configured embedding backend and the no-op vision strategy.
	pub fn from_config(cfg: &Config) -> Self {
		Self {
			embedding: Arc::new(DefaultEmbedding),
			vision: Arc::new(NoopVision::new(cfg.storage.qdrant.image_vector_dim as usize)),
		}
	}
}

pub struct ShelfService {
	pub cfg: Config,
	pub db: Db,
	pub index: Arc<dyn VectorIndex>,
	pub providers: Providers,
	pub enricher: MetadataEnricher,
	pub search: SearchOrchestrator,
}
impl ShelfService {
	pub fn new(cfg: Config, db: Db, index: Arc<dyn VectorIndex>) -> Self {
		let providers = Providers::from_config(&cfg);

		Self::with_providers(cfg, db, index, providers)
	}

	pub fn with_providers(
		cfg: Config,
		db: Db,
		index: Arc<dyn VectorIndex>,
		providers: Providers,
	) -> Self {
		let search = SearchOrchestrator::new(&cfg, providers.clone(), index.clone());

		Self { cfg, db, index, providers, enricher: MetadataEnricher::default(), search }
	}

	/// Replaces the keyword tables used for enrichment.
	pub fn with_enricher(mut self, enricher: MetadataEnricher) -> Self {
		self.enricher = enricher;

		self
	}

	pub(crate) fn embedding_timeout(&self) -> Duration {
		Duration::from_millis(self.cfg.providers.embedding.timeout_ms)
	}

	pub(crate) fn index_timeout(&self) -> Duration {
		Duration::from_millis(self.cfg.storage.qdrant.timeout_ms)
	}

	/// Embeds a single text with the configured provider, bounded by its timeout.
	pub(crate) async fn embed_one(&self, text: String) -> Result<Vec<f32>> {
		let texts = [text];
		let vectors = bounded(
			self.embedding_timeout(),
			"Embedding provider",
			self.providers.embedding.embed(&self.cfg.providers.embedding, &texts),
		)
		.await?;

		first_vector(vectors, self.cfg.storage.qdrant.text_vector_dim as usize)
	}
}

struct DefaultEmbedding;
impl EmbeddingProvider for DefaultEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

pub(crate) fn rank_weights(cfg: &Config) -> RankWeights {
	RankWeights { alpha: cfg.ranking.alpha, beta: cfg.ranking.beta, gamma: cfg.ranking.gamma }
}

pub(crate) fn ranker(cfg: &Config) -> SearchRanker {
	SearchRanker::new(rank_weights(cfg))
}

/// Runs a collaborator call under `timeout`; failure and expiry both surface as
/// [`Error::ServiceUnavailable`].
pub(crate) async fn bounded<T, F>(timeout: Duration, collaborator: &str, call: F) -> Result<T>
where
	F: Future<Output = color_eyre::Result<T>>,
{
	match tokio::time::timeout(timeout, call).await {
		Ok(Ok(value)) => Ok(value),
		Ok(Err(err)) => Err(Error::unavailable(format!("{collaborator} failed: {err}."))),
		Err(_) => Err(Error::unavailable(format!(
			"{collaborator} timed out after {} ms.",
			timeout.as_millis()
		))),
	}
}

pub(crate) fn first_vector(vectors: Vec<Vec<f32>>, dimensions: usize) -> Result<Vec<f32>> {
	let Some(vector) = vectors.into_iter().next() else {
		return Err(Error::unavailable("Embedding provider returned no vectors."));
	};

	if vector.len() != dimensions {
		return Err(Error::unavailable(format!(
			"Embedding vector dimension mismatch: expected {dimensions}, got {}.",
			vector.len()
		)));
	}

	Ok(vector)
}
