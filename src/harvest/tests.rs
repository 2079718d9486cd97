use super::*;
use std::collections::HashMap;
use std::sync::Mutex;

/// Renderer serving canned HTML per URL and recording the order of requests
#[derive(Default)]
struct CannedRenderer {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl CannedRenderer {
    fn with_pages(pages: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages
                .iter()
                .map(|(url, html)| ((*url).to_string(), (*html).to_string()))
                .collect(),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl PageRenderer for CannedRenderer {
    fn name(&self) -> &'static str {
        "canned"
    }

    async fn render(&self, url: &str) -> Result<RenderedPage> {
        self.requests.lock().expect("lock").push(url.to_string());
        self.pages
            .get(url)
            .map(|html| RenderedPage::new(url, html.clone()))
            .ok_or_else(|| anyhow!("HTTP error 404"))
    }
}

fn harvester(renderers: Vec<Arc<dyn PageRenderer>>) -> Harvester {
    Harvester::new(renderers, StrategySet::default())
}

#[tokio::test]
async fn pages_are_harvested_in_order() {
    let renderer = CannedRenderer::with_pages(&[
        ("https://b.example/", "<h1>B</h1><p>Second page.</p>"),
        ("https://a.example/", "<h1>A</h1><p>First page.</p>"),
    ]);
    let urls = vec!["https://a.example/".to_string(), "https://b.example/".to_string()];

    let report = harvester(vec![Arc::clone(&renderer) as Arc<dyn PageRenderer>])
        .harvest(&urls)
        .await;

    assert_eq!(report.urls(), vec!["https://a.example/", "https://b.example/"]);
    assert_eq!(report.pages[0].content, "A\n\nFirst page.");
    assert!(report.failures.is_empty());
    assert_eq!(renderer.requests(), urls);
}

#[tokio::test]
async fn failures_are_recorded_and_skipped() {
    let renderer = CannedRenderer::with_pages(&[
        ("https://ok.example/", "<h1>Fine</h1><p>Content.</p>"),
        ("https://noheading.example/", "<p>Nothing to anchor on.</p>"),
    ]);
    let urls = vec![
        "https://missing.example/".to_string(),
        "https://noheading.example/".to_string(),
        "not a url".to_string(),
        "https://ok.example/".to_string(),
    ];

    let report = harvester(vec![renderer as Arc<dyn PageRenderer>]).harvest(&urls).await;

    assert_eq!(report.urls(), vec!["https://ok.example/"]);
    assert_eq!(report.failures.len(), 3);
    assert_eq!(report.failures[0].url, "https://missing.example/");
    assert!(report.failures[0].reason.contains("404"));
    assert_eq!(report.failures[1].reason, "No content extracted");
    assert!(report.failures[2].reason.contains("Invalid URL"));
}

#[tokio::test]
async fn all_pages_failing_is_not_an_error() {
    let renderer = CannedRenderer::with_pages(&[]);
    let urls = vec!["https://a.example/".to_string()];

    let report = harvester(vec![renderer as Arc<dyn PageRenderer>]).harvest(&urls).await;

    assert!(report.is_empty());
    assert_eq!(report.failures.len(), 1);
}

#[tokio::test]
async fn later_renderer_is_tried_after_failure() {
    let primary = CannedRenderer::with_pages(&[]);
    let fallback = CannedRenderer::with_pages(&[(
        "https://a.example/",
        "<h1>Fallback</h1><p>Rendered by the second renderer.</p>",
    )]);

    let report = harvester(vec![
        Arc::clone(&primary) as Arc<dyn PageRenderer>,
        Arc::clone(&fallback) as Arc<dyn PageRenderer>,
    ])
    .harvest(&["https://a.example/".to_string()])
    .await;

    assert_eq!(report.pages.len(), 1);
    assert_eq!(primary.requests().len(), 1);
    assert_eq!(fallback.requests().len(), 1);
}

#[tokio::test]
async fn encyclopedia_pages_use_paragraph_extraction() {
    let renderer = CannedRenderer::with_pages(&[(
        "https://en.wikipedia.org/wiki/Paris",
        "<div>Jump to navigation</div><p>Paris is the capital of France.</p><ul><li>Nav</li></ul>",
    )]);

    let report = harvester(vec![renderer as Arc<dyn PageRenderer>])
        .harvest(&["https://en.wikipedia.org/wiki/Paris".to_string()])
        .await;

    assert_eq!(report.pages[0].content, "Paris is the capital of France.");
}

#[tokio::test]
async fn no_renderers_fails_each_page() {
    let report = harvester(Vec::new())
        .harvest(&["https://a.example/".to_string()])
        .await;

    assert_eq!(report.failures[0].reason, "No page renderer configured");
}

#[test]
fn url_validation() {
    assert!(validate_url("https://example.com/path").is_ok());
    assert!(validate_url("ftp://example.com/").is_err());
    assert!(validate_url("mailto:someone@example.com").is_err());
    assert!(validate_url("relative/path").is_err());
}

#[test]
fn rendered_page_prefers_supplied_markdown() {
    let mut page = RenderedPage::new("https://a.example/", "<h1>From html</h1>");
    assert_eq!(page.markdown(), "# From html");

    page.markdown = Some("# Supplied".to_string());
    assert_eq!(page.markdown(), "# Supplied");
}
