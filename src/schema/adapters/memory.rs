//! In-memory schema registry.
//!
//! Keeps append-only version lists per subject and assigns registry-wide ids
//! starting at 1. Identical content registered under a second subject reuses
//! the existing id, as the Confluent registry does.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use apache_avro::Schema;
use tracing::debug;

use crate::schema::{
    domain::{AVRO_FORMAT, SchemaFingerprint, SchemaReference, SchemaRegistration, Subject},
    ports::{SchemaRegistryClient, SchemaRegistryError, SchemaRegistryResult},
};

/// Thread-safe in-memory schema registry.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchemaRegistry {
    state: Arc<RwLock<RegistryState>>,
}

#[derive(Debug, Default)]
struct RegistryState {
    subjects: HashMap<Subject, Vec<StoredVersion>>,
    schemas_by_id: HashMap<u32, Schema>,
    ids_by_fingerprint: HashMap<SchemaFingerprint, u32>,
    next_id: u32,
}

#[derive(Debug)]
struct StoredVersion {
    fingerprint: SchemaFingerprint,
    id: u32,
    schema: Schema,
}

impl RegistryState {
    fn allocate_id(&mut self, fingerprint: SchemaFingerprint, schema: &Schema) -> u32 {
        if let Some(id) = self.ids_by_fingerprint.get(&fingerprint) {
            return *id;
        }
        self.next_id = self.next_id.saturating_add(1);
        let id = self.next_id;
        self.ids_by_fingerprint.insert(fingerprint, id);
        self.schemas_by_id.insert(id, schema.clone());
        id
    }
}

impl InMemorySchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the versions registered for `subject`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaRegistryError::State`] when the registry lock is
    /// poisoned.
    pub fn versions(&self, subject: &Subject) -> SchemaRegistryResult<Vec<u32>> {
        let state = self.state.read().map_err(|err| {
            SchemaRegistryError::state(std::io::Error::other(err.to_string()))
        })?;
        let count = state.subjects.get(subject).map_or(0, Vec::len);
        Ok((1..=count)
            .filter_map(|version| u32::try_from(version).ok())
            .collect())
    }
}

#[async_trait]
impl SchemaRegistryClient for InMemorySchemaRegistry {
    async fn register(
        &self,
        subject: &Subject,
        schema: &Schema,
    ) -> SchemaRegistryResult<SchemaRegistration> {
        let fingerprint = SchemaFingerprint::of(schema);
        let mut state = self.state.write().map_err(|err| {
            SchemaRegistryError::state(std::io::Error::other(err.to_string()))
        })?;

        let existing = state.subjects.get(subject).and_then(|versions| {
            versions
                .iter()
                .enumerate()
                .find(|(_, stored)| stored.fingerprint == fingerprint)
                .map(|(index, stored)| (index, stored.id))
        });
        if let Some((index, id)) = existing {
            let version =
                u32::try_from(index.saturating_add(1)).map_err(SchemaRegistryError::state)?;
            let reference = SchemaReference::avro(subject.clone(), version)?;
            return Ok(SchemaRegistration::new(reference, Some(id)));
        }

        let id = state.allocate_id(fingerprint, schema);
        let versions = state.subjects.entry(subject.clone()).or_default();
        versions.push(StoredVersion {
            fingerprint,
            id,
            schema: schema.clone(),
        });
        let version = u32::try_from(versions.len()).map_err(SchemaRegistryError::state)?;
        let reference = SchemaReference::avro(subject.clone(), version)?;
        debug!(subject = %subject, version, id, "registered schema version");
        Ok(SchemaRegistration::new(reference, Some(id)))
    }

    async fn fetch(&self, reference: &SchemaReference) -> SchemaRegistryResult<Schema> {
        let state = self.state.read().map_err(|err| {
            SchemaRegistryError::state(std::io::Error::other(err.to_string()))
        })?;
        if reference.format() != AVRO_FORMAT {
            return Err(SchemaRegistryError::SchemaNotFound(reference.to_string()));
        }
        let index = usize::try_from(reference.version())
            .ok()
            .and_then(|version| version.checked_sub(1));
        state
            .subjects
            .get(reference.subject())
            .zip(index)
            .and_then(|(versions, position)| versions.get(position))
            .map(|stored| stored.schema.clone())
            .ok_or_else(|| SchemaRegistryError::SchemaNotFound(reference.to_string()))
    }

    async fn fetch_by_id(&self, id: u32) -> SchemaRegistryResult<Schema> {
        let state = self.state.read().map_err(|err| {
            SchemaRegistryError::state(std::io::Error::other(err.to_string()))
        })?;
        state
            .schemas_by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| SchemaRegistryError::SchemaNotFound(format!("id {id}")))
    }
}
