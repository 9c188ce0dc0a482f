//! `Qdrant`-backed [`VectorStore`] implementation.
//!
//! Corpus ids are strings, while `Qdrant` point ids must be UUIDs or integers.
//! Point ids are therefore derived deterministically (UUIDv5 over the corpus
//! id), which makes upserts idempotent: re-ingesting the same corpus id maps
//! to the same point and overwrites it. The corpus id itself is kept in the
//! payload under the `id` key.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, GetPointsBuilder, PointId, PointStruct,
    SearchBatchPointsBuilder, SearchPoints, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};

use crate::vector_store::{ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub struct QdrantStore {
    client: Qdrant,
}

impl std::fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStore").finish_non_exhaustive()
    }
}

fn point_uuid(id: &str) -> String {
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, id.as_bytes()).to_string()
}

fn to_qdrant_payload(
    id: &str,
    mut payload: HashMap<String, serde_json::Value>,
) -> Result<HashMap<String, qdrant_client::qdrant::Value>, VectorStoreError> {
    payload.insert("id".into(), serde_json::Value::String(id.to_owned()));
    serde_json::from_value(serde_json::Value::Object(payload.into_iter().collect()))
        .map_err(|e| VectorStoreError::Serialization(e.to_string()))
}

fn from_qdrant_payload(
    payload: &HashMap<String, qdrant_client::qdrant::Value>,
) -> Result<(String, HashMap<String, serde_json::Value>), VectorStoreError> {
    let value =
        serde_json::to_value(payload).map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
    let mut map: HashMap<String, serde_json::Value> = serde_json::from_value(value)
        .map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
    let id = map
        .remove("id")
        .and_then(|v| v.as_str().map(ToOwned::to_owned))
        .ok_or_else(|| VectorStoreError::Serialization("point payload missing id".into()))?;
    Ok((id, map))
}

impl QdrantStore {
    /// Connect to a `Qdrant` instance at the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new(url: &str) -> Result<Self, VectorStoreError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| VectorStoreError::Connection(e.to_string()))?;
        Ok(Self { client })
    }
}

impl VectorStore for QdrantStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let exists = self
                .client
                .collection_exists(&collection)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            if exists {
                return Ok(());
            }

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&collection)
                        .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
                )
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.client
                .collection_exists(&collection)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut structs = Vec::with_capacity(points.len());
            for p in points {
                let payload = to_qdrant_payload(&p.id, p.payload)?;
                structs.push(PointStruct::new(point_uuid(&p.id), p.vector, payload));
            }

            self.client
                .upsert_points(UpsertPointsBuilder::new(&collection, structs))
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            Ok(())
        })
    }

    fn search_batch(
        &self,
        collection: &str,
        vectors: Vec<Vec<f32>>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<Vec<ScoredVectorPoint>>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            if vectors.is_empty() {
                return Ok(Vec::new());
            }

            let searches: Vec<SearchPoints> = vectors
                .into_iter()
                .map(|vector| {
                    SearchPointsBuilder::new(&collection, vector, limit)
                        .with_payload(true)
                        .build()
                })
                .collect();

            let response = self
                .client
                .search_batch_points(SearchBatchPointsBuilder::new(&collection, searches))
                .await
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;

            let mut per_vector = Vec::with_capacity(response.result.len());
            for batch in response.result {
                let mut hits = Vec::with_capacity(batch.result.len());
                for sp in batch.result {
                    let (id, payload) = from_qdrant_payload(&sp.payload)?;
                    hits.push(ScoredVectorPoint {
                        id,
                        score: sp.score,
                        payload,
                    });
                }
                per_vector.push(hits);
            }
            Ok(per_vector)
        })
    }

    fn fetch(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> BoxFuture<'_, Result<Vec<Option<VectorPoint>>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(Vec::new());
            }

            let point_ids: Vec<PointId> = ids.iter().map(|id| point_uuid(id).into()).collect();
            let response = self
                .client
                .get_points(
                    GetPointsBuilder::new(&collection, point_ids).with_payload(true),
                )
                .await
                .map_err(|e| VectorStoreError::Fetch(e.to_string()))?;

            let mut by_id: HashMap<String, HashMap<String, serde_json::Value>> = HashMap::new();
            for rp in response.result {
                let (id, payload) = from_qdrant_payload(&rp.payload)?;
                by_id.insert(id, payload);
            }

            Ok(ids
                .into_iter()
                .map(|id| {
                    by_id.remove(&id).map(|payload| VectorPoint {
                        id,
                        vector: Vec::new(),
                        payload,
                    })
                })
                .collect())
        })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let response = self
                .client
                .count(CountPointsBuilder::new(&collection).exact(true))
                .await
                .map_err(|e| VectorStoreError::Count(e.to_string()))?;
            Ok(response.result.map_or(0, |r| r.count))
        })
    }
}
