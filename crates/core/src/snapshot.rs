use crate::catalogue::catalogue_checksum;
use crate::index::FlatIndex;
use crate::models::CatalogueItem;
use crate::normalize::normalize;
use crate::traits::EmbeddingProvider;
use crate::{EmbeddingError, IndexError, RetrievalError};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

/// A catalogue together with the index built from it.
///
/// Index position `i` always refers to `items()[i]`. Neither half can be
/// replaced on its own; a rebuild produces a new snapshot.
#[derive(Debug)]
pub struct CatalogueSnapshot {
    id: Uuid,
    built_at: DateTime<Utc>,
    checksum: String,
    items: Vec<CatalogueItem>,
    index: FlatIndex,
}

impl CatalogueSnapshot {
    pub async fn build(
        items: Vec<CatalogueItem>,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Self, RetrievalError> {
        let documents = items
            .iter()
            .map(|item| normalize(item.canonical_text()))
            .collect::<Vec<_>>();

        let vectors = if documents.is_empty() {
            Vec::new()
        } else {
            provider.embed(&documents).await?
        };

        if vectors.len() != items.len() {
            return Err(IndexError::CountMismatch {
                items: items.len(),
                vectors: vectors.len(),
            }
            .into());
        }

        if let Some(vector) = vectors.iter().find(|vector| vector.len() != provider.dimensions()) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: provider.dimensions(),
                got: vector.len(),
            }
            .into());
        }

        let index = FlatIndex::build(vectors)?;
        let snapshot = Self {
            id: Uuid::new_v4(),
            built_at: Utc::now(),
            checksum: catalogue_checksum(&items),
            items,
            index,
        };

        info!(
            snapshot_id = %snapshot.id,
            item_count = snapshot.items.len(),
            dimensions = snapshot.index.dimensions(),
            checksum = %snapshot.checksum,
            "catalogue snapshot built"
        );

        Ok(snapshot)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn items(&self) -> &[CatalogueItem] {
        &self.items
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, position: usize) -> Option<&CatalogueItem> {
        self.items.get(position)
    }
}
