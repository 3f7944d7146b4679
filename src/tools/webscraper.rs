//! Generic page-to-markdown scraping tool.
//!
//! Fetches a URL over plain HTTP and reduces the HTML to readable markdown:
//! headings, lists, links and paragraphs survive, scripts and styling do
//! not. The output is meant for a model to read, not to round-trip.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::toolgen::{
    DeclaredType, FunctionDecl, FunctionModule, ParamDecl, RegisteredFunction, ToolError, ToolFn,
};

/// Fetches a URL and converts the response body to markdown.
pub async fn url_to_markdown(url: &str) -> Result<String, ToolError> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| ToolError::invocation("url_to_markdown", e))?;
    if !response.status().is_success() {
        return Err(ToolError::invocation(
            "url_to_markdown",
            format!("GET {} returned {}", url, response.status()),
        ));
    }
    let html = response
        .text()
        .await
        .map_err(|e| ToolError::invocation("url_to_markdown", e))?;
    Ok(html_to_markdown(&html))
}

/// True when the byte at `idx` ends a tag name, so `<head` is the `head`
/// element and not a prefix of `<header>`.
fn at_name_boundary(text: &str, idx: usize) -> bool {
    match text.as_bytes().get(idx) {
        None => true,
        Some(b) => b.is_ascii_whitespace() || *b == b'>' || *b == b'/',
    }
}

/// Finds `needle` (a `<tag` or `</tag` prefix) at a tag-name boundary.
fn find_tag(lower: &str, needle: &str, from: usize) -> Option<usize> {
    let mut search = from;
    while let Some(offset) = lower[search..].find(needle) {
        let start = search + offset;
        if at_name_boundary(lower, start + needle.len()) {
            return Some(start);
        }
        search = start + needle.len();
    }
    None
}

/// Strips an element and its content wherever the tag pair appears.
fn strip_tag_blocks(html: &str, tag: &str) -> String {
    let open = format!("<{}", tag);
    let close = format!("</{}", tag);
    // ASCII lowering keeps byte offsets aligned with the original text.
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some(start) = find_tag(&lower, &open, pos) {
        out.push_str(&html[pos..start]);
        match find_tag(&lower, &close, start) {
            Some(close_start) => {
                let after = &lower[close_start..];
                pos = after
                    .find('>')
                    .map(|i| close_start + i + 1)
                    .unwrap_or(lower.len());
            }
            None => {
                pos = html.len();
                break;
            }
        }
    }
    out.push_str(&html[pos..]);
    out
}

fn strip_comments(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some(start) = html[pos..].find("<!--") {
        let start = pos + start;
        out.push_str(&html[pos..start]);
        match html[start..].find("-->") {
            Some(end) => pos = start + end + 3,
            None => {
                pos = html.len();
                break;
            }
        }
    }
    out.push_str(&html[pos..]);
    out
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Pulls the value of an attribute out of a raw tag body.
fn attribute_value(tag_body: &str, name: &str) -> Option<String> {
    let lower = tag_body.to_ascii_lowercase();
    let marker = format!("{}=", name);
    let at = lower.find(&marker)? + marker.len();
    let rest = &tag_body[at..];
    let mut chars = rest.chars();
    match chars.next()? {
        quote @ ('"' | '\'') => {
            let rest = &rest[1..];
            let end = rest.find(quote)?;
            Some(rest[..end].to_string())
        }
        _ => {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '>')
                .unwrap_or(rest.len());
            Some(rest[..end].to_string())
        }
    }
}

/// Best-effort HTML to markdown conversion, tuned for article-like pages.
pub fn html_to_markdown(html: &str) -> String {
    let cleaned = strip_comments(html);
    let cleaned = strip_tag_blocks(&cleaned, "script");
    let cleaned = strip_tag_blocks(&cleaned, "style");
    let cleaned = strip_tag_blocks(&cleaned, "head");
    let cleaned = strip_tag_blocks(&cleaned, "noscript");

    let mut out = String::with_capacity(cleaned.len() / 2);
    let mut link_href: Option<String> = None;
    let mut rest = cleaned.as_str();

    while let Some(lt) = rest.find('<') {
        out.push_str(&decode_entities(&rest[..lt]));
        let after = &rest[lt + 1..];
        let Some(gt) = after.find('>') else {
            rest = "";
            break;
        };
        let tag_body = &after[..gt];
        rest = &after[gt + 1..];

        let closing = tag_body.starts_with('/');
        let name: String = tag_body
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        match (name.as_str(), closing) {
            ("h1", false) => out.push_str("\n\n# "),
            ("h2", false) => out.push_str("\n\n## "),
            ("h3", false) => out.push_str("\n\n### "),
            ("h4", false) => out.push_str("\n\n#### "),
            ("h5", false) => out.push_str("\n\n##### "),
            ("h6", false) => out.push_str("\n\n###### "),
            ("h1" | "h2" | "h3" | "h4" | "h5" | "h6", true) => out.push_str("\n\n"),
            ("li", false) => out.push_str("\n- "),
            ("br" | "tr", _) => out.push('\n'),
            ("p" | "div" | "section" | "article" | "ul" | "ol" | "table" | "blockquote", _) => {
                out.push_str("\n\n");
            }
            ("a", false) => {
                link_href = attribute_value(tag_body, "href");
                out.push('[');
            }
            ("a", true) => match link_href.take() {
                Some(href) => {
                    out.push_str("](");
                    out.push_str(&href);
                    out.push(')');
                }
                None => out.push(']'),
            },
            _ => {}
        }
    }
    out.push_str(&decode_entities(rest));

    normalize_whitespace(&out)
}

/// Collapses runs of blank lines and trims each line.
fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_run = 0;
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

fn scrape_callable() -> ToolFn {
    Arc::new(move |args: Value| {
        Box::pin(async move {
            let map = match args {
                Value::Object(map) => map,
                Value::Null => Map::new(),
                other => {
                    return Err(ToolError::ArgumentDecode {
                        name: "url_to_markdown".to_string(),
                        reason: format!("expected a JSON object, got {}", other),
                    });
                }
            };
            let url = map
                .get("url")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::missing_argument("url_to_markdown", "url"))?
                .to_string();
            let markdown = url_to_markdown(&url).await?;
            Ok(Value::String(markdown))
        })
    })
}

/// The web scraping function module.
pub fn module() -> FunctionModule {
    FunctionModule::new("webscraper").register(RegisteredFunction::declared(
        FunctionDecl::new(
            "url_to_markdown",
            "Fetch a web page and convert its content to markdown.\n\n\
             Args:\n    \
             url (str): the full URL of the page to fetch\n\n\
             Returns:\n    \
             str: the page content as markdown text",
            vec![ParamDecl::required("url", DeclaredType::Str)],
        )
        .returning(DeclaredType::Str),
        scrape_callable(),
    ))
}
