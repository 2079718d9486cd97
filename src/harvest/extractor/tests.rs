use super::*;

fn page(url: &str, markdown: &str) -> RenderedPage {
    RenderedPage {
        url: url.to_string(),
        html: String::new(),
        markdown: Some(markdown.to_string()),
    }
}

#[test]
fn encyclopedia_keeps_paragraph_blocks_in_order() {
    let html = r#"<html><body>
        <div class="navbox">Main page Contents</div>
        <p>Paris is the capital of France.</p>
        <table class="infobox"><tr><td>Population 2M</td></tr></table>
        <p>   </p>
        <dl><dd>An indented note.</dd></dl>
        <p>Second <b>bold</b> paragraph.</p>
    </body></html>"#;

    assert_eq!(
        extract_paragraph_blocks(html),
        "Paris is the capital of France.\n\nAn indented note.\n\nSecond bold paragraph."
    );
}

#[test]
fn encyclopedia_strategy_ignores_markdown() {
    let page = RenderedPage {
        url: "https://en.wikipedia.org/wiki/Paris".to_string(),
        html: "<p>From markup.</p>".to_string(),
        markdown: Some("# From markdown".to_string()),
    };

    let text = EncyclopediaStrategy
        .extract(&page)
        .expect("extraction should succeed");
    assert_eq!(text, "From markup.");
}

#[test]
fn heading_cut_drops_preamble() {
    let markdown = "Skip to content\nMenu\n# Title\nBody\n## Section";
    assert_eq!(clean_before_heading(markdown), "# Title\nBody\n## Section");
}

#[test]
fn heading_cut_without_heading_is_empty() {
    assert_eq!(clean_before_heading("Just text\nmore text"), "");
    assert_eq!(clean_before_heading(""), "");
}

#[test]
fn clean_text_strips_formatting_and_whitespace() {
    let text = clean_text("# Title\n\nSome   **bold** text.\n\n\n\nMore _words_ here")
        .expect("cleaning should succeed");
    assert_eq!(text, "Title\n\nSome bold text.\n\nMore words here");
}

#[test]
fn clean_text_removes_consent_and_scripts() {
    let text = clean_text(
        "# Title\n\nHello {\"cl-consent-settings\": {\"a\": 1} world\n\n<script>var a = 1;</script>\n\nText",
    )
    .expect("cleaning should succeed");

    assert!(!text.contains("cl-consent-settings"));
    assert!(!text.contains("var a"));
    assert!(text.starts_with("Title\n\nHello"));
    assert!(text.ends_with("Text"));
}

#[test]
fn generic_strategy_uses_renderer_markdown() {
    let text = GenericStrategy
        .extract(&page(
            "https://example.com/a",
            "Cookie banner\n# Heading\n\nUseful *content*.",
        ))
        .expect("extraction should succeed");
    assert_eq!(text, "Heading\n\nUseful content.");
}

#[test]
fn generic_strategy_converts_html_when_needed() {
    let page = RenderedPage::new(
        "https://example.com/b",
        "<body><nav>Menu</nav><h1>Title</h1><p>Body text.</p></body>",
    );

    let text = GenericStrategy
        .extract(&page)
        .expect("extraction should succeed");
    assert_eq!(text, "Title\n\nBody text.");
}

#[test]
fn generic_strategy_without_heading_is_empty() {
    let page = RenderedPage::new("https://example.com/c", "<p>No headings anywhere.</p>");
    let text = GenericStrategy
        .extract(&page)
        .expect("extraction should succeed");
    assert!(text.is_empty());
}

#[test]
fn first_matching_strategy_wins() {
    struct DocsStrategy;

    impl ExtractionStrategy for DocsStrategy {
        fn name(&self) -> &'static str {
            "docs"
        }

        fn matches(&self, url: &str) -> bool {
            url.contains("docs.example")
        }

        fn extract(&self, _page: &RenderedPage) -> Result<String> {
            Ok("docs".to_string())
        }
    }

    let strategies = StrategySet::default().with_strategy(Arc::new(DocsStrategy));

    assert_eq!(
        strategies.select("https://fr.wikipedia.org/wiki/Parigi").name(),
        "encyclopedia"
    );
    assert_eq!(strategies.select("https://docs.example/page").name(), "docs");
    assert_eq!(strategies.select("https://other.example/").name(), "generic");
}
