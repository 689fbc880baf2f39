//! Request metrics cover every response the router produces.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics_exporter_prometheus::PrometheusBuilder;
use secrets_http_proxy::{MemoryClient, Revision};

mod common;

use common::{http_client, proxy_config, spawn_proxy, SlowClient};

fn count(rendered: &str, method: &str, status: u16) -> u64 {
    let series = format!("proxy_requests_total{{method=\"{method}\",status=\"{status}\"}} ");
    rendered
        .lines()
        .find_map(|line| line.strip_prefix(series.as_str()))
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_requests_total_counts_fallback_and_timeouts() {
    // The only test in this binary, so the global recorder is ours.
    let handle = PrometheusBuilder::new().install_recorder().unwrap();
    let http = http_client();

    let proxy = spawn_proxy(proxy_config(Revision::Current), Arc::new(MemoryClient::new())).await;
    let res = http
        .get(proxy.url(Revision::Current, "acme/app/token"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);
    let res = http
        .get(format!("http://{}/not/mounted", proxy.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    proxy.shutdown().await.unwrap();

    let mut config = proxy_config(Revision::Current);
    config.timeouts.request_secs = 1;
    let slow = SlowClient {
        delay: Duration::from_secs(5),
        payload: Bytes::from_static(b"late"),
    };
    let proxy = spawn_proxy(config, Arc::new(slow)).await;
    let res = http
        .get(proxy.url(Revision::Current, "acme/app/token"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 408);
    proxy.shutdown().await.unwrap();

    let rendered = handle.render();
    assert_eq!(count(&rendered, "GET", 204), 1, "{rendered}");
    assert_eq!(count(&rendered, "GET", 404), 1, "{rendered}");
    assert_eq!(count(&rendered, "GET", 408), 1, "{rendered}");
}
