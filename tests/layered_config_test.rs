use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use layerconf::bootstrap::bootstrap;
use layerconf::cache::CacheOptions;
use layerconf::cache::SourceRegistration;
use layerconf::constants::DEFAULT_FILE_LAYER_NAME;
use layerconf::constants::DEFAULT_LAYER_NAME;
use layerconf::constants::DEFAULT_REMOTE_LAYER_NAME;
use layerconf::source::KvStore;
use layerconf::source::MemoryKvStore;
use layerconf::source::RemoteStoreSource;
use layerconf::Accessors;
use layerconf::ConfigContext;
use layerconf::Layer;
use layerconf::Settings;
use serde_json::json;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tokio::time::timeout;

const CHANNEL: &str = "conf-changed";

fn conf_file(
    suffix: &str,
    content: &str,
) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_file_and_remote_bootstrap_precedence() {
    let file = conf_file(
        ".json",
        r#"{ "db": { "host": "file-host", "port": 5432 }, "name": "from-file" }"#,
    );
    let store = Arc::new(MemoryKvStore::new());
    store
        .set("app/conf", br#"{ "db": { "host": "remote-host" } }"#)
        .unwrap();

    let mut settings = Settings::default();
    settings.file.path = Some(file.path().to_string_lossy().to_string());
    settings.file.alive = true;
    settings.remote.default_key = Some("app/conf".to_string());
    settings.remote.channel = Some(CHANNEL.to_string());

    let ctx = bootstrap(&settings, Some(store.clone())).unwrap();
    assert_eq!(
        *ctx.default_layer_names(),
        vec![
            DEFAULT_REMOTE_LAYER_NAME,
            DEFAULT_FILE_LAYER_NAME,
            DEFAULT_LAYER_NAME
        ]
    );

    assert_eq!(ctx.string("db.host"), "remote-host");
    assert_eq!(ctx.int("db.port"), 5432);
    assert_eq!(ctx.string("name"), "from-file");
    assert_eq!(ctx.string_or("missing", "fallback"), "fallback");

    ctx.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remote_layer_refreshes_on_publish() {
    let store = Arc::new(MemoryKvStore::new());
    store.set("tenant", br#"{ "limit": 10 }"#).unwrap();

    let mut settings = Settings::default();
    settings.remote.channel = Some(CHANNEL.to_string());
    let ctx = bootstrap(&settings, Some(store.clone())).unwrap();

    let view = ctx.load("tenant", None).unwrap();
    assert_eq!(view.int("limit"), 10);

    let (notifier, mut changes) = mpsc::channel(1);
    view.watch(notifier);

    store.set("tenant", br#"{ "limit": 20 }"#).unwrap();
    assert!(store.publish(CHANNEL, "tenant") >= 1);

    timeout(Duration::from_secs(2), changes.recv())
        .await
        .expect("change should be signalled")
        .unwrap();
    assert_eq!(view.int("limit"), 20);

    drop(view);
    ctx.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_views_resolve_in_their_own_order() {
    let store = Arc::new(MemoryKvStore::new());
    let source = RemoteStoreSource::new(store.clone(), Some(CHANNEL));
    store
        .set("billing", br#"{ "currency": "EUR", "retries": 5 }"#)
        .unwrap();

    let ctx = ConfigContext::new();
    ctx.register_source(
        "kv",
        SourceRegistration::new(Arc::new(source), CacheOptions::default()),
    );
    ctx.merge(json!({ "currency": "USD", "timeout": 30 })).unwrap();
    ctx.load("billing", Some("kv")).unwrap();

    let billing_first = ctx.layer(&["billing", DEFAULT_LAYER_NAME]);
    assert_eq!(billing_first.string("currency"), "EUR");
    assert_eq!(billing_first.int("timeout"), 30);

    let default_first = ctx.layer(&[DEFAULT_LAYER_NAME, "billing"]);
    assert_eq!(default_first.string("currency"), "USD");
    assert_eq!(default_first.int("retries"), 5);

    // Writes land in the first bound layer and reach the store
    billing_first.set("retries", json!(7)).unwrap();
    assert_eq!(billing_first.int("retries"), 7);
    let stored: serde_json::Value =
        serde_json::from_slice(&store.get("billing").unwrap().unwrap()).unwrap();
    assert_eq!(stored["retries"], json!(7));

    // The default view never sees layers outside the default order
    assert_eq!(ctx.default_view().int_or("retries", -1), -1);

    ctx.shutdown();
}
