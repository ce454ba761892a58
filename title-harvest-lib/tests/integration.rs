// title-harvest-lib/tests/integration.rs

//! Integration tests for the full fan-out/fan-in pipeline

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use title_harvest_lib::{
    build_tasks, HarvestConfig, HarvestError, Harvester, HttpFetcher, Fetcher, Strategy,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// In-memory fetcher: known URLs return their body after a per-URL delay,
/// everything else fails.
struct MapFetcher {
    pages: HashMap<String, (String, Duration)>,
}

impl MapFetcher {
    fn new(pages: &[(&str, &str, u64)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, body, delay_ms)| {
                    (
                        url.to_string(),
                        (body.to_string(), Duration::from_millis(*delay_ms)),
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Fetcher for MapFetcher {
    async fn retrieve(&self, url: &str) -> Result<String, HarvestError> {
        match self.pages.get(url) {
            Some((body, delay)) => {
                tokio::time::sleep(*delay).await;
                Ok(body.clone())
            }
            None => Err(HarvestError::fetch(url, "host unreachable")),
        }
    }
}

fn sample_fetcher() -> Arc<MapFetcher> {
    Arc::new(MapFetcher::new(&[
        ("https://github.com", "<html><title>GitHub</title></html>", 15),
        ("https://go.dev", "<title>The Go Programming Language</title>", 5),
        ("https://gobyexample.com", "<head><title>Go by Example</title></head>", 0),
        ("https://blank.test", "<html><body>no title</body></html>", 1),
    ]))
}

fn harvester(strategy: Strategy, fetcher: Arc<MapFetcher>) -> Harvester {
    Harvester::with_fetcher(HarvestConfig::default().with_strategy(strategy), fetcher)
}

#[tokio::test]
async fn test_only_reachable_urls_appear() {
    for strategy in [Strategy::Locked, Strategy::Channel] {
        let report = harvester(strategy, sample_fetcher())
            .harvest([
                "https://github.com",
                "https://unreachable.invalid",
                "https://go.dev",
                "https://also-down.invalid",
            ])
            .await;

        assert_eq!(report.results.len(), 2, "strategy {strategy}");
        assert_eq!(report.results.get("https://github.com"), Some("GitHub"));
        assert_eq!(
            report.results.get("https://go.dev"),
            Some("The Go Programming Language")
        );
        assert!(!report.results.contains("https://unreachable.invalid"));
        assert_eq!(report.stats.fetch_failures, 2);
    }
}

#[tokio::test]
async fn test_untitled_pages_follow_config() {
    let fetcher = sample_fetcher();

    let recorded = harvester(Strategy::Locked, fetcher.clone())
        .harvest(["https://blank.test"])
        .await;
    assert_eq!(recorded.results.get("https://blank.test"), Some(""));

    let skipped = Harvester::with_fetcher(
        HarvestConfig::default()
            .with_strategy(Strategy::Channel)
            .with_record_untitled(false),
        fetcher,
    )
    .harvest(["https://blank.test", "https://go.dev"])
    .await;
    assert!(!skipped.results.contains("https://blank.test"));
    assert_eq!(skipped.results.len(), 1);
    assert_eq!(skipped.stats.untitled, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_duplicate_heavy_run_collapses_to_distinct_urls() {
    let urls: Vec<String> = ["https://github.com", "https://go.dev", "https://gobyexample.com"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let tasks = build_tasks(&urls, 1000);

    for strategy in [Strategy::Locked, Strategy::Channel] {
        let report = harvester(strategy, sample_fetcher()).harvest(tasks.clone()).await;
        assert_eq!(report.stats.dispatched, 3000);
        assert_eq!(report.stats.fetched, 3000);
        assert_eq!(report.results.len(), 3);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_many_distinct_urls_no_lost_updates() {
    const N: usize = 1500;
    let pages: Vec<(String, String)> = (0..N)
        .map(|i| (format!("https://host-{i}.test"), format!("<title>Host {i}</title>")))
        .collect();
    let fetcher = Arc::new(MapFetcher {
        pages: pages
            .iter()
            .map(|(url, body)| (url.clone(), (body.clone(), Duration::ZERO)))
            .collect(),
    });
    let urls: Vec<String> = pages.into_iter().map(|(url, _)| url).collect();

    for strategy in [Strategy::Locked, Strategy::Channel] {
        let report = harvester(strategy, fetcher.clone())
            .harvest(urls.clone())
            .await;
        assert_eq!(report.results.len(), N, "strategy {strategy}");
        assert_eq!(report.results.get("https://host-42.test"), Some("Host 42"));
    }
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let tasks = ["https://github.com", "https://go.dev", "https://gobyexample.com"];

    let first = harvester(Strategy::Channel, sample_fetcher()).harvest(tasks).await;
    for _ in 0..5 {
        for strategy in [Strategy::Locked, Strategy::Channel] {
            let again = harvester(strategy, sample_fetcher()).harvest(tasks).await;
            assert_eq!(again.results, first.results);
        }
    }
}

#[tokio::test]
async fn test_empty_run_completes() {
    for strategy in [Strategy::Locked, Strategy::Channel] {
        let report = tokio::time::timeout(
            Duration::from_secs(1),
            harvester(strategy, sample_fetcher()).harvest(Vec::<String>::new()),
        )
        .await
        .expect("empty run must not hang");
        assert!(report.results.is_empty());
    }
}

/// Serve `body` with `status` to every connection, one response each.
async fn serve(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_http_fetcher_end_to_end() {
    let ok = serve("200 OK", "<html><title>Local Page</title></html>").await;
    let missing = serve("404 Not Found", "<html><title>Not Found</title></html>").await;
    let refused = "http://127.0.0.1:1/".to_string();

    for strategy in [Strategy::Locked, Strategy::Channel] {
        let config = HarvestConfig::default()
            .with_strategy(strategy)
            .with_timeout(Duration::from_secs(5));
        let fetcher = HttpFetcher::with_config(&config).unwrap();
        let harvester = Harvester::with_fetcher(config, Arc::new(fetcher));

        let report = harvester
            .harvest([ok.clone(), missing.clone(), refused.clone()])
            .await;

        assert_eq!(report.results.len(), 1, "strategy {strategy}");
        assert_eq!(report.results.get(&ok), Some("Local Page"));
        assert!(!report.results.contains(&missing));
        assert_eq!(report.stats.fetch_failures, 2);
    }
}

/// Accept connections and never answer them.
async fn serve_silent() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_http_fetcher_reports_configured_timeout() {
    let silent = serve_silent().await;
    let timeout = Duration::from_millis(200);
    let config = HarvestConfig::default().with_timeout(timeout);
    let fetcher = HttpFetcher::with_config(&config).unwrap();

    let err = tokio::time::timeout(Duration::from_secs(5), fetcher.retrieve(&silent))
        .await
        .expect("client timeout must fire first")
        .unwrap_err();

    match err {
        HarvestError::Timeout { url, duration } => {
            assert_eq!(url, silent);
            assert_eq!(duration, timeout);
        }
        other => panic!("expected a timeout, got {other:?}"),
    }

    // The run still completes and the hung page contributes nothing.
    let report = Harvester::with_fetcher(config, Arc::new(fetcher))
        .harvest([silent])
        .await;
    assert!(report.results.is_empty());
    assert_eq!(report.stats.fetch_failures, 1);
}

/// Hits the real network, so it is ignored in CI unless explicitly run.
#[tokio::test]
#[ignore]
async fn test_live_titles() {
    let harvester = Harvester::new().unwrap();
    let report = harvester.harvest(["https://go.dev", "https://github.com"]).await;
    assert_eq!(report.results.len(), 2);
    assert!(report
        .results
        .get("https://go.dev")
        .is_some_and(|title| title.contains("Go")));
}
