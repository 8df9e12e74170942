pub mod catalogue;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod models;
pub mod normalize;
pub mod providers;
pub mod resolver;
pub mod snapshot;
pub mod traits;

pub use catalogue::{
    catalogue_checksum, filter_by_keywords, load_catalogue, load_catalogue_file,
    load_catalogue_slice, LoadReport, SkippedRecord,
};
pub use embeddings::{CharacterNgramEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{EmbeddingError, IndexError, LoadError, RetrievalError};
pub use index::{FlatIndex, Neighbor};
pub use models::{
    AssessmentLength, CatalogueFields, CatalogueItem, KeywordOverride, RankedItem,
    Recommendation, ResolutionPath, ResolverConfig,
};
pub use normalize::normalize;
pub use providers::{HttpEmbedder, HttpEmbedderOptions};
pub use resolver::{HybridResolver, DEFAULT_TOP_K};
pub use snapshot::CatalogueSnapshot;
pub use traits::EmbeddingProvider;
