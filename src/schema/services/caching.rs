//! Caching decorator for schema registry clients.

use crate::schema::{
    domain::{SchemaFingerprint, SchemaReference, SchemaRegistration, Subject},
    ports::{SchemaRegistryClient, SchemaRegistryError, SchemaRegistryResult},
};
use apache_avro::Schema;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::trace;

/// Wraps a registry client with caches that only grow.
///
/// Registrations are cached per (subject, fingerprint); schemas per reference
/// and per id. Schemas are immutable once registered, so no entry is ever
/// invalidated. Concurrent misses may both reach the inner client, which is
/// safe because registration is idempotent.
#[derive(Debug, Clone)]
pub struct CachingSchemaRegistryClient<R: SchemaRegistryClient> {
    inner: R,
    cache: Arc<RwLock<RegistryCache>>,
}

#[derive(Debug, Default)]
struct RegistryCache {
    registrations: HashMap<(Subject, SchemaFingerprint), SchemaRegistration>,
    by_reference: HashMap<SchemaReference, Schema>,
    by_id: HashMap<u32, Schema>,
}

impl<R: SchemaRegistryClient> CachingSchemaRegistryClient<R> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Arc::new(RwLock::new(RegistryCache::default())),
        }
    }

    /// Returns the wrapped client.
    #[must_use]
    pub const fn inner(&self) -> &R {
        &self.inner
    }

    fn read<T>(&self, lookup: impl FnOnce(&RegistryCache) -> Option<T>) -> SchemaRegistryResult<Option<T>> {
        let cache = self.cache.read().map_err(|err| {
            SchemaRegistryError::state(std::io::Error::other(err.to_string()))
        })?;
        Ok(lookup(&cache))
    }

    fn write(&self, update: impl FnOnce(&mut RegistryCache)) -> SchemaRegistryResult<()> {
        let mut cache = self.cache.write().map_err(|err| {
            SchemaRegistryError::state(std::io::Error::other(err.to_string()))
        })?;
        update(&mut cache);
        Ok(())
    }
}

#[async_trait]
impl<R: SchemaRegistryClient> SchemaRegistryClient for CachingSchemaRegistryClient<R> {
    async fn register(
        &self,
        subject: &Subject,
        schema: &Schema,
    ) -> SchemaRegistryResult<SchemaRegistration> {
        let key = (subject.clone(), SchemaFingerprint::of(schema));
        if let Some(cached) = self.read(|cache| cache.registrations.get(&key).cloned())? {
            trace!(reference = %cached.reference(), "registration cache hit");
            return Ok(cached);
        }

        let registration = self.inner.register(subject, schema).await?;
        self.write(|cache| {
            cache
                .by_reference
                .insert(registration.reference().clone(), schema.clone());
            if let Some(id) = registration.id() {
                cache.by_id.insert(id, schema.clone());
            }
            cache.registrations.insert(key, registration.clone());
        })?;
        Ok(registration)
    }

    async fn fetch(&self, reference: &SchemaReference) -> SchemaRegistryResult<Schema> {
        if let Some(cached) = self.read(|cache| cache.by_reference.get(reference).cloned())? {
            return Ok(cached);
        }
        let schema = self.inner.fetch(reference).await?;
        self.write(|cache| {
            cache.by_reference.insert(reference.clone(), schema.clone());
        })?;
        Ok(schema)
    }

    async fn fetch_by_id(&self, id: u32) -> SchemaRegistryResult<Schema> {
        if let Some(cached) = self.read(|cache| cache.by_id.get(&id).cloned())? {
            return Ok(cached);
        }
        let schema = self.inner.fetch_by_id(id).await?;
        self.write(|cache| {
            cache.by_id.insert(id, schema.clone());
        })?;
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FOO: &str = r#"{"type":"record","name":"Foo","namespace":"demo","fields":[{"name":"foo","type":"string"}]}"#;

    /// Counts calls and serves one fixed schema.
    #[derive(Debug, Default)]
    struct CountingRegistry {
        registrations: AtomicUsize,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl SchemaRegistryClient for CountingRegistry {
        async fn register(
            &self,
            subject: &Subject,
            _schema: &Schema,
        ) -> SchemaRegistryResult<SchemaRegistration> {
            self.registrations.fetch_add(1, Ordering::SeqCst);
            Ok(SchemaRegistration::new(
                SchemaReference::avro(subject.clone(), 1)?,
                Some(1),
            ))
        }

        async fn fetch(&self, _reference: &SchemaReference) -> SchemaRegistryResult<Schema> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Schema::parse_str(FOO).map_err(SchemaRegistryError::invalid_schema)
        }

        async fn fetch_by_id(&self, _id: u32) -> SchemaRegistryResult<Schema> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Err(SchemaRegistryError::SchemaNotFound("id".to_owned()))
        }
    }

    #[tokio::test]
    async fn repeated_calls_hit_the_inner_client_once() {
        let client = CachingSchemaRegistryClient::new(CountingRegistry::default());
        let subject = Subject::new("demo.foo").expect("valid subject");
        let schema = Schema::parse_str(FOO).expect("valid schema");

        let first = client.register(&subject, &schema).await.expect("register");
        let second = client.register(&subject, &schema).await.expect("register");
        let fetched = client.fetch(first.reference()).await.expect("fetch");
        client.fetch_by_id(1).await.expect("fetch by id");

        assert_eq!(first, second);
        assert_eq!(fetched.canonical_form(), schema.canonical_form());
        assert_eq!(client.inner().registrations.load(Ordering::SeqCst), 1);
        assert_eq!(client.inner().fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let client = CachingSchemaRegistryClient::new(CountingRegistry::default());

        assert!(client.fetch_by_id(9).await.is_err());
        assert!(client.fetch_by_id(9).await.is_err());
        assert_eq!(client.inner().fetches.load(Ordering::SeqCst), 2);
    }
}
