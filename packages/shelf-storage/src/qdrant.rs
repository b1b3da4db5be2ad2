use qdrant_client::{
	Qdrant,
	qdrant::{
		CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType,
		VectorParamsBuilder, VectorsConfigBuilder,
	},
};

use crate::Result;

pub const TEXT_VECTOR_NAME: &str = "text";
pub const IMAGE_VECTOR_NAME: &str = "image";
/// Payload fields filtered on by exact match.
pub const KEYWORD_INDEXES: [&str; 4] = ["thing_id", "category", "tags", "location_ancestors"];

pub struct QdrantStore {
	pub client: Qdrant,
	pub collection: String,
	pub text_vector_dim: u32,
	pub image_vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &shelf_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self {
			client,
			collection: cfg.collection.clone(),
			text_vector_dim: cfg.text_vector_dim,
			image_vector_dim: cfg.image_vector_dim,
		})
	}

	/// Creates the collection and its payload indexes when missing.
	///
	/// Returns `true` when the collection was created by this call.
	pub async fn ensure_collection(&self) -> Result<bool> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(false);
		}

		let mut vectors_config = VectorsConfigBuilder::default();

		vectors_config.add_named_vector_params(
			TEXT_VECTOR_NAME,
			VectorParamsBuilder::new(self.text_vector_dim.into(), Distance::Cosine),
		);
		vectors_config.add_named_vector_params(
			IMAGE_VECTOR_NAME,
			VectorParamsBuilder::new(self.image_vector_dim.into(), Distance::Cosine),
		);

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone()).vectors_config(vectors_config),
			)
			.await?;

		for field in KEYWORD_INDEXES {
			self.client
				.create_field_index(
					CreateFieldIndexCollectionBuilder::new(
						self.collection.clone(),
						field,
						FieldType::Keyword,
					)
					.wait(true),
				)
				.await?;
		}

		Ok(true)
	}
}
