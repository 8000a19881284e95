//! The async facade

use backend_proxy::recording::RecordingDriver;
use backend_proxy::{args, AsyncProxy, Dispatch, Error, ProxyConfig, Selector, Value};
use serde_json::json;

#[tokio::test]
async fn test_async_buffered_flow() {
    let driver = RecordingDriver::new();
    let log = driver.log();
    let config = ProxyConfig { buffer: true, ..ProxyConfig::default() };
    let proxy = AsyncProxy::spawn(move || Ok(driver), config).await.unwrap();

    let d = proxy
        .register(Selector::when_get(args!["/a"]).respond(args![200]))
        .await
        .unwrap();
    assert_eq!(d, Dispatch::Queued);
    proxy.sync_context(Some(json!({"k": 1}).into())).await.unwrap();
    assert_eq!(proxy.pending().await.unwrap().len(), 2);
    assert_eq!(log.execution_count(), 0);

    assert!(proxy.flush().await.unwrap().is_executed());
    assert_eq!(proxy.flush().await.unwrap(), Dispatch::Empty);
    assert_eq!(log.execution_count(), 1);
    assert_eq!(proxy.context().await.unwrap(), Some(Value::from(json!({"k": 1}))));

    proxy.close().await.unwrap();
}

#[tokio::test]
async fn test_async_on_load_and_navigation() {
    let driver = RecordingDriver::new();
    let log = driver.log();
    let proxy = AsyncProxy::spawn(move || Ok(driver), ProxyConfig::default()).await.unwrap();

    let d = proxy
        .register_on_load(Selector::expect_get(args!["/boot"]).pass_through())
        .await
        .unwrap();
    assert_eq!(d, Dispatch::Queued);
    proxy.navigate("http://app/").await.unwrap();
    assert_eq!(log.bootstrap_scripts().len(), 1);

    proxy.reset_on_load().await.unwrap();
    assert!(log.bootstrap_scripts().is_empty());
    proxy.close().await.unwrap();
}

#[tokio::test]
async fn test_async_remote_errors_pass_through() {
    let driver = RecordingDriver::new();
    driver.fail_next("Unsatisfied requests: GET /remote");
    let proxy = AsyncProxy::spawn(move || Ok(driver), ProxyConfig::default()).await.unwrap();

    match proxy.verify_no_outstanding_expectation().await {
        Err(Error::Remote(msg)) => assert_eq!(msg, "Unsatisfied requests: GET /remote"),
        other => panic!("expected remote error, got {:?}", other),
    }
    proxy.verify_no_outstanding_request().await.unwrap();
    proxy.close().await.unwrap();
}

#[tokio::test]
async fn test_async_init_failure_is_reported() {
    let result = AsyncProxy::spawn(
        || -> backend_proxy::Result<RecordingDriver> { Err(Error::Other("no browser".into())) },
        ProxyConfig::default(),
    )
    .await;
    assert!(matches!(result, Err(Error::Other(ref m)) if m == "no browser"));

    let bad = ProxyConfig { context_field: String::new(), ..ProxyConfig::default() };
    let result = AsyncProxy::spawn(|| Ok(RecordingDriver::new()), bad).await;
    assert!(matches!(result, Err(Error::ConfigError(_))));
}

#[cfg(feature = "sandbox")]
#[tokio::test]
async fn test_async_against_the_sandbox() {
    use backend_proxy::sandbox::{SandboxConfig, SandboxDriver};

    let proxy = AsyncProxy::spawn(|| SandboxDriver::new(SandboxConfig::default()), ProxyConfig::default())
        .await
        .unwrap();
    proxy.navigate("http://app.local/").await.unwrap();
    proxy
        .register(Selector::expect_get(args!["/remote"]).respond(args![200, json!({"msg": "hi"})]))
        .await
        .unwrap();

    let err = proxy.verify_no_outstanding_expectation().await.unwrap_err();
    assert_eq!(err.to_string(), "Unsatisfied requests: GET /remote");
    let err = proxy.flush_pending().await.unwrap_err();
    assert_eq!(err.to_string(), "No pending request to flush !");
    proxy.close().await.unwrap();
}
