//! Cross-process invalidation over the in-memory transport.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::{
    defaults, pubsub_config, wait_until, CountingStore, FailingAuditLog, FailingTransport, GatedStore, CHANNEL,
};
use realtime_config::audit::{AuditLog, MemoryAuditLog};
use realtime_config::changes::{ChangeHook, ConfigWriter};
use realtime_config::store::ConfigStore;
use realtime_config::pubsub::{ChangePublisher, MemoryTransport, SubscriberState, Transport};
use realtime_config::{ConfigCache, Shutdown};

const WAIT: Duration = Duration::from_secs(2);

async fn wait_listening(cache: &ConfigCache, transport: &MemoryTransport, subscribers: usize) {
    let ready = wait_until(WAIT, || async move {
        cache.listener_state() == SubscriberState::Listening
            && transport.subscriber_count(CHANNEL) >= subscribers
    })
    .await;
    assert!(ready, "listener never reached Listening");
}

async fn wait_evicted(cache: &ConfigCache, key: &str) {
    let evicted = wait_until(WAIT, || async move { cache.local().lookup(key).is_none() }).await;
    assert!(evicted, "{} was never invalidated", key);
}

fn writer(store: Arc<dyn ConfigStore>, transport: Arc<dyn Transport>, audit: Arc<dyn AuditLog>) -> ConfigWriter {
    let publisher = ChangePublisher::new(transport, Some(CHANNEL.to_string()));
    ConfigWriter::new(store, ChangeHook::new(audit, publisher))
}

#[tokio::test]
async fn test_write_invalidates_other_process() {
    let store = CountingStore::new();
    store.inner.insert("SITE_NAME", json!("Before"));
    let transport = Arc::new(MemoryTransport::new());
    let shutdown = Shutdown::new();

    let reader = ConfigCache::new(store.clone(), defaults(), Duration::from_secs(5));
    reader.start_listener(transport.clone(), pubsub_config(10), shutdown.subscribe());
    wait_listening(&reader, &transport, 1).await;

    assert_eq!(reader.get("SITE_NAME", None).await, Some(json!("Before")));
    assert_eq!(store.gets(), 1);

    let audit = Arc::new(MemoryAuditLog::new());
    let outcome = writer(store.clone(), transport.clone(), audit.clone())
        .set("SITE_NAME", json!("After"))
        .await
        .unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.old_value, Some(json!("Before")));
    assert_eq!(audit.len(), 1);

    wait_evicted(&reader, "SITE_NAME").await;
    let gets = store.gets();
    assert_eq!(reader.get("SITE_NAME", None).await, Some(json!("After")));
    assert_eq!(store.gets(), gets + 1);

    shutdown.trigger();
    reader.join_listener(WAIT).await;
}

#[tokio::test]
async fn test_malformed_message_is_ignored() {
    let store = CountingStore::new();
    store.inner.insert("SITE_NAME", json!("Cached"));
    store.inner.insert("ITEMS_PER_PAGE", json!(5));
    let transport = Arc::new(MemoryTransport::new());
    let shutdown = Shutdown::new();

    let cache = ConfigCache::new(store.clone(), defaults(), Duration::from_secs(5));
    cache.start_listener(transport.clone(), pubsub_config(10), shutdown.subscribe());
    wait_listening(&cache, &transport, 1).await;

    cache.get("SITE_NAME", None).await;
    cache.get("ITEMS_PER_PAGE", None).await;

    transport.publish_raw(CHANNEL, vec![0xff, 0xfe, 0xfd]);
    transport.publish_raw(CHANNEL, b"   ".to_vec());
    transport.publish_raw(CHANNEL, b"ITEMS_PER_PAGE".to_vec());

    wait_evicted(&cache, "ITEMS_PER_PAGE").await;
    assert_eq!(cache.local().lookup("SITE_NAME"), Some(json!("Cached")));
    assert!(cache.listener_running());
    assert_eq!(cache.listener_state(), SubscriberState::Listening);

    shutdown.trigger();
    cache.join_listener(WAIT).await;
}

#[tokio::test]
async fn test_listener_reconnects_after_broker_drop() {
    let store = CountingStore::new();
    store.inner.insert("SITE_NAME", json!("Cached"));
    let transport = Arc::new(MemoryTransport::new());
    let shutdown = Shutdown::new();

    let cache = ConfigCache::new(store.clone(), defaults(), Duration::from_secs(5));
    cache.start_listener(transport.clone(), pubsub_config(10), shutdown.subscribe());
    wait_listening(&cache, &transport, 1).await;

    transport.set_online(false);
    transport.disconnect_all();
    let cache_ref = &cache;
    assert!(wait_until(WAIT, || async move { cache_ref.listener_state() != SubscriberState::Listening }).await);

    transport.set_online(true);
    wait_listening(&cache, &transport, 1).await;

    cache.get("SITE_NAME", None).await;
    transport.publish(CHANNEL, "SITE_NAME").await.unwrap();
    wait_evicted(&cache, "SITE_NAME").await;

    shutdown.trigger();
    cache.join_listener(WAIT).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_start_runs_one_listener() {
    let transport = Arc::new(MemoryTransport::new());
    let shutdown = Arc::new(Shutdown::new());
    let cache = Arc::new(ConfigCache::new(CountingStore::new(), defaults(), Duration::from_secs(5)));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        let transport = transport.clone();
        let shutdown = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            cache.start_listener(transport, pubsub_config(10), shutdown.subscribe())
        }));
    }

    let mut started = 0;
    for task in tasks {
        if task.await.unwrap() {
            started += 1;
        }
    }
    assert_eq!(started, 1);

    wait_listening(&cache, &transport, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.subscriber_count(CHANNEL), 1);

    shutdown.trigger();
    cache.join_listener(WAIT).await;
}

#[tokio::test]
async fn test_shutdown_stops_listener() {
    let transport = Arc::new(MemoryTransport::new());
    let shutdown = Shutdown::new();
    let cache = ConfigCache::new(CountingStore::new(), defaults(), Duration::from_secs(5));

    assert!(cache.start_listener(transport.clone(), pubsub_config(10), shutdown.subscribe()));
    wait_listening(&cache, &transport, 1).await;

    shutdown.trigger();
    cache.join_listener(WAIT).await;
    assert!(!cache.listener_running());
    assert_eq!(cache.listener_state(), SubscriberState::Disconnected);

    // A stopped listener can be started again.
    let restart = Shutdown::new();
    assert!(cache.start_listener(transport.clone(), pubsub_config(10), restart.subscribe()));
    wait_listening(&cache, &transport, 1).await;
    restart.trigger();
    cache.join_listener(WAIT).await;
}

#[tokio::test]
async fn test_listener_keeps_retrying_while_broker_down() {
    let transport = Arc::new(FailingTransport);
    let shutdown = Shutdown::new();
    let cache = ConfigCache::new(CountingStore::new(), defaults(), Duration::from_secs(5));

    cache.start_listener(transport, pubsub_config(10), shutdown.subscribe());
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(cache.listener_running());
    assert_ne!(cache.listener_state(), SubscriberState::Listening);

    shutdown.trigger();
    cache.join_listener(WAIT).await;
    assert!(!cache.listener_running());
}

#[tokio::test]
async fn test_write_succeeds_when_publish_and_audit_fail() {
    let store = CountingStore::new();
    let writer = writer(store.clone(), Arc::new(FailingTransport), Arc::new(FailingAuditLog));

    let outcome = writer.set("SITE_NAME", json!("Written")).await.unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.old_value, None);

    let cache = ConfigCache::new(store, defaults(), Duration::from_secs(5));
    assert_eq!(cache.get("SITE_NAME", None).await, Some(json!("Written")));
}

#[tokio::test]
async fn test_unchanged_write_publishes_nothing() {
    let store = CountingStore::new();
    store.inner.insert("SITE_NAME", json!("Same"));
    let transport = Arc::new(MemoryTransport::new());
    let shutdown = Shutdown::new();

    let cache = ConfigCache::new(store.clone(), defaults(), Duration::from_secs(5));
    cache.start_listener(transport.clone(), pubsub_config(10), shutdown.subscribe());
    wait_listening(&cache, &transport, 1).await;
    cache.get("SITE_NAME", None).await;

    let audit = Arc::new(MemoryAuditLog::new());
    let outcome = writer(store.clone(), transport.clone(), audit.clone())
        .set("SITE_NAME", json!("Same"))
        .await
        .unwrap();
    assert!(!outcome.changed);
    assert!(audit.is_empty());

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(cache.local().lookup("SITE_NAME"), Some(json!("Same")));

    shutdown.trigger();
    cache.join_listener(WAIT).await;
}

#[tokio::test]
async fn test_fetch_racing_invalidation_is_not_cached() {
    let store = GatedStore::new();
    store.inner.insert("SITE_NAME", json!("V1"));
    let transport = Arc::new(MemoryTransport::new());
    let shutdown = Shutdown::new();

    let cache = Arc::new(ConfigCache::new(store.clone(), defaults(), Duration::from_secs(5)));
    cache.start_listener(transport.clone(), pubsub_config(10), shutdown.subscribe());
    wait_listening(&cache, &transport, 1).await;

    let generation = cache.local().generation();
    let reader = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("SITE_NAME", None).await })
    };
    // The read has loaded V1 and is parked.
    store.entered.notified().await;

    writer(store.clone(), transport.clone(), Arc::new(MemoryAuditLog::new()))
        .set("SITE_NAME", json!("V2"))
        .await
        .unwrap();
    let local = cache.local();
    assert!(wait_until(WAIT, || async move { local.generation() != generation }).await);

    store.release.notify_one();
    assert_eq!(reader.await.unwrap(), Some(json!("V1")));

    assert!(cache.local().lookup("SITE_NAME").is_none());
    assert_eq!(cache.get("SITE_NAME", None).await, Some(json!("V2")));

    shutdown.trigger();
    cache.join_listener(WAIT).await;
}

#[tokio::test]
async fn test_resubscribe_drops_values_changed_while_disconnected() {
    let store = CountingStore::new();
    store.inner.insert("SITE_NAME", json!("V1"));
    let transport = Arc::new(MemoryTransport::new());
    let shutdown = Shutdown::new();

    let cache = ConfigCache::new(store.clone(), defaults(), Duration::from_secs(5));
    cache.start_listener(transport.clone(), pubsub_config(10), shutdown.subscribe());
    wait_listening(&cache, &transport, 1).await;
    assert_eq!(cache.get("SITE_NAME", None).await, Some(json!("V1")));

    transport.set_online(false);
    transport.disconnect_all();
    let cache_ref = &cache;
    assert!(wait_until(WAIT, || async move { cache_ref.listener_state() != SubscriberState::Listening }).await);

    // Change lands while nobody is subscribed; the message is lost.
    store.inner.insert("SITE_NAME", json!("V2"));
    assert_eq!(transport.publish_raw(CHANNEL, b"SITE_NAME".to_vec()), 0);
    assert_eq!(cache.get("SITE_NAME", None).await, Some(json!("V1")));

    transport.set_online(true);
    wait_listening(&cache, &transport, 1).await;

    let gets = store.gets();
    assert_eq!(cache.get("SITE_NAME", None).await, Some(json!("V2")));
    assert_eq!(store.gets(), gets + 1);

    shutdown.trigger();
    cache.join_listener(WAIT).await;
}
