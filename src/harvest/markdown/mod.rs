//! HTML to markdown conversion for pages fetched without a markdown-producing
//! renderer.
//!
//! The output only needs to survive a later markdown-to-text pass, so the
//! conversion keeps block structure (headings, paragraphs, lists, quotes and
//! code fences) plus inline emphasis and links, and drops everything that
//! never carries readable text.


use fancy_regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

const ESCAPED_CHARS: &str = "\\`*_[]#<>";
const HR_MARKER: &str = "* * *";
const FENCE: &str = "```";

/// Convert an HTML document to markdown
#[inline]
pub fn html_to_markdown(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut output = String::new();
    render_children(document.root_element(), &mut output);
    normalize(&output)
}

fn render_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_text(out, text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    render_element(child, out);
                }
            }
            _ => {}
        }
    }
}

fn render_to_string(element: ElementRef<'_>) -> String {
    let mut inner = String::new();
    render_children(element, &mut inner);
    inner.trim().to_string()
}

fn render_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();

    match name {
        "script" | "style" | "noscript" | "head" | "template" | "svg" | "canvas" | "iframe"
        | "img" | "button" | "input" | "select" | "textarea" => {}
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<usize>().unwrap_or(1);
            let text = single_line(&render_to_string(element));
            if !text.is_empty() {
                push_block(out, &format!("{} {}", "#".repeat(level), text));
            }
        }
        "br" => out.push('\n'),
        "hr" => push_block(out, HR_MARKER),
        "pre" => {
            let code: String = element.text().collect();
            let code = code.trim_matches('\n');
            if !code.trim().is_empty() {
                push_block(out, &format!("{FENCE}\n{code}\n{FENCE}"));
            }
        }
        "code" => {
            let code = single_line(&element.text().collect::<String>());
            if !code.is_empty() {
                out.push('`');
                out.push_str(&code.replace('`', ""));
                out.push('`');
            }
        }
        "a" => {
            let text = single_line(&render_to_string(element));
            match element.value().attr("href") {
                Some(href) if !text.is_empty() && is_followable(href) => {
                    out.push('[');
                    out.push_str(&text);
                    out.push_str("](");
                    out.push_str(href.trim());
                    out.push(')');
                }
                _ => out.push_str(&text),
            }
        }
        "strong" | "b" => wrap_inline(out, &render_to_string(element), "**"),
        "em" | "i" => wrap_inline(out, &render_to_string(element), "_"),
        "ul" | "ol" => push_block(out, &render_list(element, name == "ol")),
        "blockquote" => {
            let quoted = render_to_string(element)
                .lines()
                .map(|line| format!("> {}", line).trim_end().to_string())
                .collect::<Vec<_>>()
                .join("\n");
            push_block(out, &quoted);
        }
        "tr" => {
            let row = single_line(&render_to_string(element));
            if !row.is_empty() {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&row);
                out.push('\n');
            }
        }
        "td" | "th" => {
            out.push(' ');
            render_children(element, out);
            out.push(' ');
        }
        "p" | "div" | "section" | "article" | "main" | "header" | "footer" | "aside" | "nav"
        | "table" | "thead" | "tbody" | "tfoot" | "form" | "figure" | "figcaption" | "dl"
        | "dt" | "dd" | "address" | "details" | "summary" | "fieldset" | "li" | "body" => {
            push_block(out, &render_to_string(element));
        }
        _ => render_children(element, out),
    }
}

fn render_list(list: ElementRef<'_>, ordered: bool) -> String {
    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "li")
        .map(render_to_string)
        .filter(|item| !item.is_empty())
        .enumerate()
        .map(|(index, item)| {
            let marker = if ordered {
                format!("{}.", index + 1)
            } else {
                "-".to_string()
            };
            let indent = " ".repeat(marker.len() + 1);
            let body = item
                .lines()
                .enumerate()
                .map(|(line_no, line)| {
                    if line_no == 0 || line.is_empty() {
                        line.to_string()
                    } else {
                        format!("{}{}", indent, line)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("{} {}", marker, body)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_text(out: &mut String, text: &str) {
    let collapsed = WHITESPACE.replace_all(text, " ").into_owned();
    if collapsed == " " && (out.is_empty() || out.ends_with(char::is_whitespace)) {
        return;
    }

    for c in collapsed.chars() {
        if ESCAPED_CHARS.contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
}

fn push_block(out: &mut String, content: &str) {
    if content.is_empty() {
        return;
    }
    out.push_str("\n\n");
    out.push_str(content);
    out.push_str("\n\n");
}

fn wrap_inline(out: &mut String, content: &str, delimiter: &str) {
    let content = single_line(content);
    if !content.is_empty() {
        out.push_str(delimiter);
        out.push_str(&content);
        out.push_str(delimiter);
    }
}

fn single_line(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn is_followable(href: &str) -> bool {
    let href = href.trim();
    !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript:")
}

fn normalize(markdown: &str) -> String {
    let trimmed_lines = markdown
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    EXCESS_NEWLINES
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}
