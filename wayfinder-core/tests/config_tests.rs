// Tests for the loader and store built from a crawl configuration

use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wayfinder_core::config::CrawlConfig;
use wayfinder_core::store::ReportSink;
use wayfinder_scanner::{PageLoader, ScanError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn slow_server(delay: Duration) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body>late</body></html>")
                .set_delay(delay),
        )
        .mount(&mock_server)
        .await;
    mock_server
}

#[tokio::test]
async fn test_page_loader_honors_request_timeout() {
    let mock_server = slow_server(Duration::from_secs(3)).await;
    let config = CrawlConfig::new(&mock_server.uri(), 1)
        .unwrap()
        .with_request_timeout(Duration::from_secs(1));

    let loader = config.page_loader().unwrap();
    let url = Url::parse(&format!("{}/slow", mock_server.uri())).unwrap();
    let result = loader.navigate(&url).await;

    assert!(matches!(result, Err(ScanError::HttpError(ref e)) if e.is_timeout()));
}

#[tokio::test]
async fn test_page_loader_within_timeout() {
    let mock_server = slow_server(Duration::from_millis(50)).await;
    let config = CrawlConfig::new(&mock_server.uri(), 1)
        .unwrap()
        .with_request_timeout(Duration::from_secs(5));

    let loader = config.page_loader().unwrap();
    let url = Url::parse(&format!("{}/slow", mock_server.uri())).unwrap();
    let page = loader.navigate(&url).await.unwrap();

    assert!(page.body.contains("late"));
}

#[tokio::test]
async fn test_page_loader_stops_at_excluded_redirect() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/signout"))
        .mount(&mock_server)
        .await;

    let config = CrawlConfig::new(&mock_server.uri(), 1)
        .unwrap()
        .with_exclusions(vec!["/signout".to_string()]);

    let loader = config.page_loader().unwrap();
    let url = Url::parse(&format!("{}/account", mock_server.uri())).unwrap();
    let result = loader.navigate(&url).await;

    assert!(matches!(result, Err(ScanError::Redirect(_))));
}

#[test]
fn test_report_store_writes_into_report_dir() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let config = CrawlConfig::new("https://example.com", 1)?
        .with_report_dir(dir.path().join("reports"));

    let store = config.report_store();
    store.write("a11y-home.md", "No accessibility violations found.")?;

    let written = fs::read_to_string(dir.path().join("reports").join("a11y-home.md"))?;
    assert_eq!(written, "No accessibility violations found.");
    Ok(())
}
