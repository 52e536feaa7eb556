use crate::error::{Result, ScanError};
use crate::result::LoadedPage;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

const MAX_REDIRECTS: usize = 5;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Loads pages and exposes their outbound anchors.
///
/// `Page` is the opaque handle handed to the audit engine. A browser harness
/// would return its tab handle here; [`HttpPageLoader`] returns the fetched document.
#[async_trait]
pub trait PageLoader: Send + Sync {
    type Page: Send + Sync;

    async fn navigate(&self, url: &Url) -> Result<Self::Page>;

    /// Raw `href` values of the page's anchors, in document order.
    fn extract_links(&self, page: &Self::Page) -> Vec<String>;
}

/// Fetches pages over plain HTTP. Page JavaScript is not executed.
pub struct HttpPageLoader {
    client: Client,
}

impl HttpPageLoader {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        Self::with_exclusions(Duration::from_secs(timeout_secs), Vec::new())
    }

    /// Loader whose redirects never leave the requested origin or land on an
    /// excluded path. Such redirects surface as [`ScanError::Redirect`].
    pub fn with_exclusions(timeout: Duration, excluded: Vec<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                "Wayfinder/",
                env!("CARGO_PKG_VERSION"),
                " (accessibility crawler)"
            ))
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(redirect_policy(Arc::new(excluded)))
            .build()?;

        Ok(Self { client })
    }
}

fn redirect_policy(excluded: Arc<Vec<String>>) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }

        let target = attempt.url();
        let same_origin = attempt
            .previous()
            .first()
            .is_some_and(|first| first.origin() == target.origin());
        let path = match target.query() {
            Some(query) => format!("{}?{}", target.path(), query),
            None => target.path().to_string(),
        };

        if !same_origin || excluded.iter().any(|p| path.contains(p.as_str())) {
            debug!("Not following redirect to {}", target);
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

#[async_trait]
impl PageLoader for HttpPageLoader {
    type Page = LoadedPage;

    async fn navigate(&self, url: &Url) -> Result<LoadedPage> {
        debug!("Fetching {}", url);

        let start = Instant::now();
        let response = self.client.get(url.as_str()).send().await?;
        let response_time = start.elapsed();

        let status_code = response.status().as_u16();
        if response.status().is_redirection() {
            let location = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("(missing location)")
                .to_string();
            return Err(ScanError::Redirect(location));
        }
        if !response.status().is_success() {
            return Err(ScanError::Status(status_code));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.text().await?;

        Ok(LoadedPage {
            url: final_url,
            status_code,
            content_type,
            body,
            response_time,
        })
    }

    fn extract_links(&self, page: &LoadedPage) -> Vec<String> {
        if !page.is_html() {
            return Vec::new();
        }
        extract_hrefs(&page.body)
    }
}

/// Collect the trimmed `href` of every anchor in document order.
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    async fn mount_html(server: &MockServer, route: &str, html: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_bytes(html.as_bytes()),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_extract_hrefs_document_order() {
        let html = r##"<html><body>
            <a href="/b">B</a>
            <a href=" /a ">A</a>
            <a name="anchor">no href</a>
            <a href="#top">Top</a>
            <a href="mailto:team@example.com">Mail</a>
        </body></html>"##;

        let hrefs = extract_hrefs(html);
        assert_eq!(hrefs, vec!["/b", "/a", "#top", "mailto:team@example.com"]);
    }

    #[tokio::test]
    async fn test_navigate_and_extract_links() {
        let mock_server = MockServer::start().await;
        mount_html(
            &mock_server,
            "/",
            r#"<html><body><a href="/page1">1</a><a href="/page2">2</a></body></html>"#,
        )
        .await;

        let loader = HttpPageLoader::new(5).unwrap();
        let url = Url::parse(&mock_server.uri()).unwrap();
        let page = loader.navigate(&url).await.unwrap();

        assert_eq!(page.status_code, 200);
        assert!(page.is_html());
        assert_eq!(loader.extract_links(&page), vec!["/page1", "/page2"]);
    }

    #[tokio::test]
    async fn test_navigate_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let loader = HttpPageLoader::new(5).unwrap();
        let url = Url::parse(&format!("{}/missing", mock_server.uri())).unwrap();
        let err = loader.navigate(&url).await.unwrap_err();

        assert!(matches!(err, ScanError::Status(404)));
    }

    #[tokio::test]
    async fn test_non_html_has_no_links() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_bytes(br#"{"href": "<a href='/x'>x</a>"}"#),
            )
            .mount(&mock_server)
            .await;

        let loader = HttpPageLoader::new(5).unwrap();
        let url = Url::parse(&format!("{}/data.json", mock_server.uri())).unwrap();
        let page = loader.navigate(&url).await.unwrap();

        assert!(loader.extract_links(&page).is_empty());
    }

    async fn mount_redirect(server: &MockServer, route: &str, location: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(302).insert_header("location", location))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_same_origin_redirect_is_followed() {
        let mock_server = MockServer::start().await;
        mount_redirect(&mock_server, "/old", "/new").await;
        mount_html(&mock_server, "/new", "<html><body>moved</body></html>").await;

        let loader = HttpPageLoader::new(5).unwrap();
        let url = Url::parse(&format!("{}/old", mock_server.uri())).unwrap();
        let page = loader.navigate(&url).await.unwrap();

        assert_eq!(page.url.path(), "/new");
    }

    #[tokio::test]
    async fn test_off_site_redirect_is_not_followed() {
        let mock_server = MockServer::start().await;
        mount_redirect(&mock_server, "/go", "https://elsewhere.invalid/landing").await;

        let loader = HttpPageLoader::new(5).unwrap();
        let url = Url::parse(&format!("{}/go", mock_server.uri())).unwrap();
        let err = loader.navigate(&url).await.unwrap_err();

        assert!(matches!(err, ScanError::Redirect(ref to) if to.contains("elsewhere.invalid")));
    }

    #[tokio::test]
    async fn test_redirect_to_excluded_path_is_not_followed() {
        let mock_server = MockServer::start().await;
        mount_redirect(&mock_server, "/account", "/logout?next=/").await;
        mount_html(&mock_server, "/logout", "<html><body>bye</body></html>").await;

        let loader =
            HttpPageLoader::with_exclusions(Duration::from_secs(5), vec!["/logout".to_string()])
                .unwrap();
        let url = Url::parse(&format!("{}/account", mock_server.uri())).unwrap();
        let err = loader.navigate(&url).await.unwrap_err();

        assert!(matches!(err, ScanError::Redirect(ref to) if to.starts_with("/logout")));
    }
}
