//! Binder discovery, default resolution, caching and channel binding.
#![expect(clippy::expect_used, reason = "test assertions")]

use async_trait::async_trait;
use camino::Utf8PathBuf;
use eyre::{WrapErr, eyre};
use mockall::mock;
use rstest::{fixture, rstest};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use stream_binder::binder::{
    domain::{BinderDomainError, BindingState},
    ports::{HandlerError, MessageHandler},
    services::{Binder, BinderError},
};
use stream_binder::message::domain::{Message, Payload};
use stream_binder::registry::{
    adapters::{InMemoryBinderFactory, SearchPathManifestLocator, StaticManifestLocator},
    domain::{BinderConfiguration, RegistryDomainError, StreamConfiguration},
    ports::{BinderFactory, BinderFactoryError, BinderFactoryResult, MANIFEST_RESOURCE},
    services::{BinderRegistry, BinderRegistryError, BinderTypeTable, ChannelBindingService},
};
use tokio::sync::mpsc;
use tokio::time::timeout;

mock! {
    Factory {}

    #[async_trait]
    impl BinderFactory for Factory {
        async fn create(
            &self,
            configuration: &BinderConfiguration,
        ) -> BinderFactoryResult<Arc<dyn Binder>>;
    }
}

struct Recorder(mpsc::UnboundedSender<Message>);

#[async_trait]
impl MessageHandler for Recorder {
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        self.0
            .send(message)
            .map_err(|_| HandlerError::message("test receiver dropped"))
    }
}

#[fixture]
fn factory() -> Arc<InMemoryBinderFactory> {
    Arc::new(InMemoryBinderFactory::default())
}

fn registry(factory: &Arc<InMemoryBinderFactory>, manifest: &str) -> BinderRegistry {
    let types = BinderTypeTable::new().with("memory", Arc::clone(factory) as Arc<dyn BinderFactory>);
    BinderRegistry::discover(
        &StaticManifestLocator::default().with_resource("test", manifest),
        types,
    )
    .expect("manifest loads")
}

fn configuration(value: serde_json::Value) -> StreamConfiguration {
    serde_json::from_value(value).expect("valid configuration")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn default_requests_share_one_cached_binder(factory: Arc<InMemoryBinderFactory>) {
    let registry = registry(&factory, "# local binders\nmemory=memory\n");

    let unnamed = registry.get_binder(None).await.expect("default binder");
    let blank = registry.get_binder(Some("  ")).await.expect("blank name");
    let named = registry.get_binder(Some("memory")).await.expect("named binder");

    assert!(Arc::ptr_eq(&unnamed, &blank));
    assert!(Arc::ptr_eq(&unnamed, &named));
    assert_eq!(factory.created(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_first_requests_create_one_binder(factory: Arc<InMemoryBinderFactory>) {
    let registry = Arc::new(registry(&factory, "memory=memory\n"));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let shared = Arc::clone(&registry);
            tokio::spawn(async move { shared.get_binder(None).await })
        })
        .collect();
    let mut binders = Vec::new();
    for task in tasks {
        binders.push(
            task.await
                .expect("lookup task completes")
                .expect("default binder"),
        );
    }

    let first = binders.first().expect("at least one binder");
    assert!(binders.iter().all(|binder| Arc::ptr_eq(first, binder)));
    assert_eq!(factory.created(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn several_binder_types_make_the_default_ambiguous(factory: Arc<InMemoryBinderFactory>) {
    let registry = registry(&factory, "memory=memory\nbackup: memory\n");

    let result = registry.get_binder(None).await;

    assert!(matches!(
        result,
        Err(BinderRegistryError::AmbiguousDefaultBinder(ref names))
            if names == &vec!["memory".to_owned(), "backup".to_owned()]
    ));
    registry
        .get_binder(Some("backup"))
        .await
        .expect("named lookup still works");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn an_empty_manifest_has_no_binder(factory: Arc<InMemoryBinderFactory>) {
    let registry = registry(&factory, "");

    assert!(matches!(
        registry.get_binder(None).await,
        Err(BinderRegistryError::NoBinderConfigured)
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_names_and_types_are_reported(factory: Arc<InMemoryBinderFactory>) {
    let registry = registry(&factory, "memory=memory\nkafka=kafka-binder\n");

    assert!(matches!(
        registry.get_binder(Some("rabbit")).await,
        Err(BinderRegistryError::UnknownBinder(ref name)) if name == "rabbit"
    ));
    assert!(matches!(
        registry.get_binder(Some("kafka")).await,
        Err(BinderRegistryError::UnknownBinderType { ref binder_type, .. })
            if binder_type == "kafka"
    ));
    assert_eq!(factory.created(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn first_registered_implementation_backs_a_type(factory: Arc<InMemoryBinderFactory>) {
    let registry = registry(&factory, "memory=native-memory, memory\n");

    registry.get_binder(None).await.expect("resolves to memory");

    assert_eq!(factory.created(), 1);
}

#[rstest]
fn duplicate_types_across_resources_are_rejected(factory: Arc<InMemoryBinderFactory>) {
    let locator = StaticManifestLocator::default()
        .with_resource("first", "memory=memory")
        .with_resource("second", "memory=other");

    let result = BinderRegistry::discover(
        &locator,
        BinderTypeTable::new().with("memory", factory as Arc<dyn BinderFactory>),
    );

    assert!(matches!(
        result,
        Err(BinderRegistryError::Domain(
            RegistryDomainError::DuplicateManifestEntry { .. }
        ))
    ));
}

#[rstest]
fn manifests_are_found_on_the_search_path(
    factory: Arc<InMemoryBinderFactory>,
) -> Result<(), eyre::Report> {
    let root = tempfile::tempdir().wrap_err("create temp dir")?;
    let manifest = root.path().join(MANIFEST_RESOURCE);
    let parent = manifest
        .parent()
        .ok_or_else(|| eyre!("manifest path has no parent"))?;
    std::fs::create_dir_all(parent).wrap_err("create manifest directory")?;
    std::fs::write(&manifest, "memory=memory\n").wrap_err("write manifest")?;
    let roots = [
        Utf8PathBuf::try_from(root.path().to_path_buf()).wrap_err("utf-8 temp path")?,
        Utf8PathBuf::from("/definitely/not/here"),
    ];

    let registry = BinderRegistry::discover(
        &SearchPathManifestLocator::new(roots),
        BinderTypeTable::new().with("memory", factory as Arc<dyn BinderFactory>),
    )?;

    assert_eq!(registry.manifest().len(), 1);
    assert_eq!(registry.configurations().len(), 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn configured_binders_pick_the_single_default_candidate(
    factory: Arc<InMemoryBinderFactory>,
) {
    let registry = registry(&factory, "memory=memory\n")
        .configure(&configuration(json!({
            "binders": {
                "east": {"type": "memory"},
                "west": {"type": "memory", "defaultCandidate": false}
            }
        })))
        .expect("configures");

    let default = registry.get_binder(None).await.expect("default");
    let east = registry.get_binder(Some("east")).await.expect("east");
    let west = registry.get_binder(Some("west")).await.expect("west");

    assert!(Arc::ptr_eq(&default, &east));
    assert!(!Arc::ptr_eq(&east, &west));
    assert_eq!(factory.created(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn explicit_default_binder_wins(factory: Arc<InMemoryBinderFactory>) {
    let registry = registry(&factory, "memory=memory\n")
        .configure(&configuration(json!({
            "defaultBinder": "west",
            "binders": {
                "east": {"type": "memory"},
                "west": {"type": "memory"}
            }
        })))
        .expect("configures");

    let default = registry.get_binder(None).await.expect("default");
    let west = registry.get_binder(Some("west")).await.expect("west");

    assert!(Arc::ptr_eq(&default, &west));
    assert_eq!(factory.created(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invalid_binder_properties_fail_creation(factory: Arc<InMemoryBinderFactory>) {
    let registry = registry(&factory, "memory=memory\n")
        .configure(&configuration(json!({
            "binders": {"local": {"type": "memory", "properties": {"nativeHeaders": "maybe"}}}
        })))
        .expect("configures");

    assert!(matches!(
        registry.get_binder(None).await,
        Err(BinderRegistryError::Factory(BinderFactoryError::InvalidProperty { ref key, .. }))
            if key == "nativeHeaders"
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn factory_failures_are_not_cached() {
    let mut failing = MockFactory::new();
    failing.expect_create().times(2).returning(|_| {
        Err(BinderFactoryError::runtime(std::io::Error::other(
            "broker unreachable",
        )))
    });
    let registry = BinderRegistry::discover(
        &StaticManifestLocator::default().with_resource("test", "memory=memory"),
        BinderTypeTable::new().with("memory", Arc::new(failing) as Arc<dyn BinderFactory>),
    )
    .expect("manifest loads");

    for _ in 0..2 {
        assert!(matches!(
            registry.get_binder(None).await,
            Err(BinderRegistryError::Factory(BinderFactoryError::Runtime(_)))
        ));
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closing_the_registry_stops_every_binding(factory: Arc<InMemoryBinderFactory>) {
    let registry = registry(&factory, "memory=memory\n");
    let binder = registry.get_binder(None).await.expect("binder");
    let producer = binder
        .bind_producer("orders", Default::default())
        .await
        .expect("producer binds");

    registry.close().await.expect("close");

    assert_eq!(producer.binding().state().await, BindingState::Stopped);
    assert_eq!(factory.transport().active_producers("orders").expect("state"), 0);
    registry.get_binder(None).await.expect("binder is recreated");
    assert_eq!(factory.created(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn channels_bind_with_their_declared_settings(factory: Arc<InMemoryBinderFactory>) {
    let stream = configuration(json!({
        "binders": {"local": {"type": "memory"}},
        "bindings": {
            "output": {
                "destination": "orders",
                "producer": {"partitionCount": "2", "partitionKeyExpression": "headers.key"}
            },
            "input": {"destination": "orders", "group": "audit"}
        }
    }));
    let registry = Arc::new(
        registry(&factory, "memory=memory\n")
            .configure(&stream)
            .expect("configures"),
    );
    let channels = ChannelBindingService::new(Arc::clone(&registry), stream);
    let (sender, mut received) = mpsc::unbounded_channel();

    let consumer = channels
        .bind_consumer("input", Arc::new(Recorder(sender)))
        .await
        .expect("input binds");
    let producer = channels.bind_producer("output").await.expect("output binds");
    producer
        .send(Message::new("placed").with_header("key", "order-1"))
        .await
        .expect("send");
    let delivered = timeout(Duration::from_secs(5), received.recv())
        .await
        .expect("delivered in time")
        .expect("handler alive");

    assert_eq!(delivered.payload(), &Payload::Text("placed".to_owned()));
    assert_eq!(factory.transport().partitions("orders").expect("state"), Some(2));
    assert_eq!(
        factory.transport().subscriptions("orders").expect("state"),
        vec!["orders.audit".to_owned()]
    );

    channels.unbind("input", &consumer).await.expect("unbind");
    assert_eq!(consumer.state().await, BindingState::Stopped);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn undeclared_channels_bind_a_destination_of_the_same_name(
    factory: Arc<InMemoryBinderFactory>,
) {
    let registry = Arc::new(registry(&factory, "memory=memory\n"));
    let channels = ChannelBindingService::new(registry, StreamConfiguration::default());

    let producer = channels.bind_producer("audit-log").await.expect("binds");

    assert_eq!(producer.binding().destination().as_str(), "audit-log");
    assert_eq!(factory.transport().active_producers("audit-log").expect("state"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invalid_channel_content_types_are_rejected(factory: Arc<InMemoryBinderFactory>) {
    let stream = configuration(json!({
        "bindings": {"output": {"destination": "orders", "contentType": "not-a-type"}}
    }));
    let registry = Arc::new(registry(&factory, "memory=memory\n"));
    let channels = ChannelBindingService::new(registry, stream);

    let result = channels.bind_producer("output").await;

    assert!(matches!(
        result,
        Err(BinderRegistryError::Binder(BinderError::Domain(
            BinderDomainError::InvalidProperty { ref key, .. }
        ))) if key == "contentType"
    ));
    assert_eq!(factory.created(), 0);
}
