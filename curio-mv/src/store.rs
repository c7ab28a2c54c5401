//! Collection storage boundary
//!
//! Persistent storage belongs to an external collaborator; this module
//! pins down only the contract the enrichment orchestrator needs from it:
//! snapshot the items and apply field patches. The in-memory
//! implementation backs the running service and the test suites.

use crate::models::{GradeStatus, ItemQuery};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One collectible in the user's inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionItem {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub issue_number: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub grade_status: GradeStatus,
    #[serde(default)]
    pub cert_number: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub writer: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub current_value: Option<f64>,
    #[serde(default)]
    pub value_verified_at: Option<DateTime<Utc>>,
}

impl CollectionItem {
    /// Build a provider query for this item
    pub fn to_query(&self) -> ItemQuery {
        ItemQuery {
            title: self.title.clone(),
            issue_number: self.issue_number.clone(),
            publisher: self.publisher.clone(),
            target_grade: self.grade.clone(),
            grade_status: self.grade_status,
            cert_number: self.cert_number.clone(),
        }
    }

    /// Whether the item still misses any enrichable field
    ///
    /// Missing cover image, missing creator attribution, or missing
    /// current value all qualify an item for the batch run.
    pub fn needs_enrichment(&self) -> bool {
        self.cover_image_url.is_none() || self.writer.is_none() || self.current_value.is_none()
    }
}

/// Fields an enrichment pass may fill in on an item
///
/// Only `Some` fields are applied; an absent field never clears existing
/// data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentPatch {
    pub cover_image_url: Option<String>,
    pub writer: Option<String>,
    pub artist: Option<String>,
    pub current_value: Option<f64>,
    pub value_verified_at: Option<DateTime<Utc>>,
}

impl EnrichmentPatch {
    /// Whether applying this patch would change anything
    pub fn is_empty(&self) -> bool {
        self.cover_image_url.is_none()
            && self.writer.is_none()
            && self.artist.is_none()
            && self.current_value.is_none()
    }
}

/// Contract the storage collaborator must satisfy
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Snapshot of all items in the collection
    async fn items(&self) -> curio_common::Result<Vec<CollectionItem>>;

    /// Apply a patch to one item
    async fn apply_patch(&self, item_id: Uuid, patch: EnrichmentPatch) -> curio_common::Result<()>;
}

/// In-memory store used by the service process and tests
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<BTreeMap<Uuid, CollectionItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, item: CollectionItem) {
        self.items.write().await.insert(item.id, item);
    }

    pub async fn get(&self, item_id: Uuid) -> Option<CollectionItem> {
        self.items.read().await.get(&item_id).cloned()
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn items(&self) -> curio_common::Result<Vec<CollectionItem>> {
        Ok(self.items.read().await.values().cloned().collect())
    }

    async fn apply_patch(&self, item_id: Uuid, patch: EnrichmentPatch) -> curio_common::Result<()> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(&item_id)
            .ok_or_else(|| curio_common::Error::NotFound(format!("item {}", item_id)))?;

        if let Some(url) = patch.cover_image_url {
            item.cover_image_url = Some(url);
        }
        if let Some(writer) = patch.writer {
            item.writer = Some(writer);
        }
        if let Some(artist) = patch.artist {
            item.artist = Some(artist);
        }
        if let Some(value) = patch.current_value {
            item.current_value = Some(value);
            item.value_verified_at = patch.value_verified_at.or_else(|| Some(Utc::now()));
        }

        Ok(())
    }
}
