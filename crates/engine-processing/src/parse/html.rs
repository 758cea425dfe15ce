use scraper::{ElementRef, Html, Node};
use std::collections::HashSet;
use url::Url;

/// Elements whose text is not part of the visible content.
const HIDDEN: &[&str] = &["head", "script", "style", "noscript", "template", "title"];

#[derive(Debug, Default, PartialEq)]
pub struct HtmlExtract {
    pub title: Option<String>,
    /// Visible text, whitespace collapsed
    pub text: String,
    /// Absolute http(s) link targets, deduplicated, in document order
    pub outlinks: Vec<String>,
    /// `<meta>` name (or property / http-equiv), lowercased, with its content
    pub meta: Vec<(String, String)>,
}

pub fn extract(html: &str, base: Option<&Url>) -> HtmlExtract {
    let document = Html::parse_document(html);
    let mut out = HtmlExtract::default();
    let mut words: Vec<&str> = Vec::new();
    let mut seen_links = HashSet::new();

    for node in document.root_element().descendants() {
        match node.value() {
            Node::Element(element) => match element.name() {
                "title" if out.title.is_none() => {
                    out.title = ElementRef::wrap(node)
                        .map(|title| collapse(title.text()))
                        .filter(|title| !title.is_empty());
                }
                "a" | "area" => {
                    if let Some(link) = element.attr("href").and_then(|href| resolve(base, href))
                        && seen_links.insert(link.clone())
                    {
                        out.outlinks.push(link);
                    }
                }
                "meta" => {
                    let name = element
                        .attr("name")
                        .or_else(|| element.attr("property"))
                        .or_else(|| element.attr("http-equiv"));
                    if let (Some(name), Some(content)) = (name, element.attr("content")) {
                        let name = name.trim().to_ascii_lowercase();
                        if !name.is_empty() {
                            out.meta.push((name, content.trim().to_string()));
                        }
                    }
                }
                _ => {}
            },
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| HIDDEN.contains(&el.name()))
                });
                if !hidden {
                    words.extend(text.split_whitespace());
                }
            }
            _ => {}
        }
    }

    out.text = words.join(" ");
    out
}

fn collapse<'a>(pieces: impl Iterator<Item = &'a str>) -> String {
    pieces
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
