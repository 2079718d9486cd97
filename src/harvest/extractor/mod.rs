#[cfg(test)]
mod tests;

use anyhow::{Result, anyhow};
use fancy_regex::Regex;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};
use tracing::debug;

use super::RenderedPage;

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));
static REPEATED_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("valid regex"));
static CONSENT_SETTINGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)\{.*?"cl-consent-settings.*?\}"#).expect("valid regex"));
static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(style|script)[^>]*>.*?</\1>").expect("valid regex")
});
static ENCYCLOPEDIA_BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p, dd").expect("valid selector"));

/// A way of turning a rendered page into plain text
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether this strategy handles `url`
    fn matches(&self, url: &str) -> bool;

    /// Extract cleaned text. An empty string means the page had nothing usable.
    fn extract(&self, page: &RenderedPage) -> Result<String>;
}

/// Paragraph-only extraction for encyclopedia articles.
///
/// Article prose lives in `<p>` and `<dd>` blocks; everything else on those
/// pages is navigation, infoboxes and references.
#[derive(Debug, Clone, Default)]
pub struct EncyclopediaStrategy;

impl ExtractionStrategy for EncyclopediaStrategy {
    #[inline]
    fn name(&self) -> &'static str {
        "encyclopedia"
    }

    #[inline]
    fn matches(&self, url: &str) -> bool {
        url.contains("wikipedia.org")
    }

    #[inline]
    fn extract(&self, page: &RenderedPage) -> Result<String> {
        Ok(extract_paragraph_blocks(&page.html))
    }
}

/// Extract `<p>` and `<dd>` text in document order, separated by blank lines
#[inline]
pub fn extract_paragraph_blocks(html: &str) -> String {
    let document = Html::parse_document(html);

    let paragraphs: Vec<String> = document
        .select(&ENCYCLOPEDIA_BLOCKS)
        .map(|block| block.text().collect::<String>())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();

    debug!("Extracted {} paragraph blocks", paragraphs.len());
    paragraphs.join("\n\n")
}

/// Markdown-based extraction for arbitrary pages
#[derive(Debug, Clone, Default)]
pub struct GenericStrategy;

impl ExtractionStrategy for GenericStrategy {
    #[inline]
    fn name(&self) -> &'static str {
        "generic"
    }

    #[inline]
    fn matches(&self, _url: &str) -> bool {
        true
    }

    #[inline]
    fn extract(&self, page: &RenderedPage) -> Result<String> {
        let markdown = page.markdown();
        let from_heading = clean_before_heading(&markdown);
        if from_heading.is_empty() {
            return Ok(String::new());
        }
        clean_text(&from_heading)
    }
}

/// Drop every line before the first heading-like line.
///
/// Pages without any heading yield an empty string.
#[inline]
pub fn clean_before_heading(markdown: &str) -> String {
    let lines: Vec<&str> = markdown.lines().collect();

    lines
        .iter()
        .position(|line| line.trim().starts_with('#'))
        .map(|start| lines[start..].join("\n"))
        .unwrap_or_default()
}

/// Strip markdown formatting and consent-banner or script/style leftovers,
/// then collapse whitespace
#[inline]
pub fn clean_text(markdown: &str) -> Result<String> {
    let text = strip_markdown(markdown);
    let text = CONSENT_SETTINGS
        .try_replacen(&text, 0, "")
        .map_err(|e| anyhow!("Failed to strip consent settings: {}", e))?;
    let text = SCRIPT_OR_STYLE
        .try_replacen(&text, 0, "")
        .map_err(|e| anyhow!("Failed to strip script blocks: {}", e))?;
    let text = BLANK_LINES
        .try_replacen(&text, 0, "\n\n")
        .map_err(|e| anyhow!("Failed to collapse blank lines: {}", e))?;
    let text = REPEATED_SPACES
        .try_replacen(&text, 0, " ")
        .map_err(|e| anyhow!("Failed to collapse spaces: {}", e))?;

    Ok(text.trim().to_string())
}

/// Render markdown as plain text, keeping block structure as line breaks
#[inline]
pub fn strip_markdown(markdown: &str) -> String {
    let mut text = String::with_capacity(markdown.len());

    for event in Parser::new(markdown) {
        match event {
            Event::Text(content) | Event::Code(content) => text.push_str(&content),
            Event::Html(html) | Event::InlineHtml(html) => text.push_str(&html),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::Start(Tag::Item) => {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::CodeBlock
                | TagEnd::BlockQuote(_)
                | TagEnd::List(_)
                | TagEnd::Table,
            ) => text.push_str("\n\n"),
            Event::End(TagEnd::Item | TagEnd::TableRow | TagEnd::TableHead) => text.push('\n'),
            Event::End(TagEnd::TableCell) => text.push(' '),
            Event::Rule => text.push_str("\n\n"),
            _ => {}
        }
    }

    text
}

/// Ordered strategies; the first one matching a URL wins
#[derive(Clone)]
pub struct StrategySet {
    strategies: Vec<Arc<dyn ExtractionStrategy>>,
    fallback: Arc<dyn ExtractionStrategy>,
}

impl Default for StrategySet {
    #[inline]
    fn default() -> Self {
        Self::new(vec![Arc::new(EncyclopediaStrategy)])
    }
}

impl StrategySet {
    /// Build a set from site-specific strategies, with the generic strategy as
    /// the final fallback
    #[inline]
    pub fn new(strategies: Vec<Arc<dyn ExtractionStrategy>>) -> Self {
        Self {
            strategies,
            fallback: Arc::new(GenericStrategy),
        }
    }

    /// Register another site-specific strategy, checked after existing ones
    #[inline]
    pub fn with_strategy(mut self, strategy: Arc<dyn ExtractionStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    #[inline]
    pub fn select(&self, url: &str) -> &dyn ExtractionStrategy {
        self.strategies
            .iter()
            .find(|strategy| strategy.matches(url))
            .unwrap_or(&self.fallback)
            .as_ref()
    }
}
