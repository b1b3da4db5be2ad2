pub mod db;
pub mod locations;
pub mod models;
pub mod placements;
pub mod qdrant;
pub mod schema;
pub mod things;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
