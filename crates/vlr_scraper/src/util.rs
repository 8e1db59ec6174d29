//! Small DOM and text helpers shared by the extractors.

use scraper::{ElementRef, Node, Selector};

/// Collapse whitespace runs into single spaces and trim.
pub(crate) fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the first selector match inside `scope`; `None` when absent or empty.
pub(crate) fn select_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

/// Attribute of the first selector match inside `scope`.
pub(crate) fn select_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// First run of ASCII digits anywhere in `text`, parsed.
pub(crate) fn first_digit_run(text: &str) -> Option<u32> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|b| b.is_ascii_digit())?;
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    text[start..end].parse().ok()
}

/// Resolve a href against the site base. Protocol-relative URLs get https.
pub(crate) fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("{}{href}", base_url.trim_end_matches('/'))
    } else {
        format!("{}/{href}", base_url.trim_end_matches('/'))
    }
}

/// The element's text with matching child elements left out. vlr.gg
/// decorates labels with child nodes ("Today" spans, series names) that
/// must not leak into the value.
pub(crate) fn text_excluding(
    el: ElementRef<'_>,
    skip: impl Fn(ElementRef<'_>) -> bool,
) -> String {
    let mut out = String::new();
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !skip(child_el) {
                        out.push_str(&child_el.text().collect::<String>());
                    }
                }
            }
            _ => {}
        }
    }
    clean_text(&out)
}

pub(crate) fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

/// First element sibling after `el`.
pub(crate) fn next_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_run_finds_first_number() {
        assert_eq!(first_digit_run("page 42 of 50"), Some(42));
        assert_eq!(first_digit_run("1370"), Some(1370));
        assert_eq!(first_digit_run("no digits"), None);
        assert_eq!(first_digit_run(""), None);
    }

    #[test]
    fn absolutize_handles_all_href_shapes() {
        let base = "https://www.vlr.gg";
        assert_eq!(absolutize(base, "/510602/a-vs-b"), "https://www.vlr.gg/510602/a-vs-b");
        assert_eq!(absolutize(base, "//owcdn.net/img/logo.png"), "https://owcdn.net/img/logo.png");
        assert_eq!(absolutize(base, "https://other.site/x"), "https://other.site/x");
        assert_eq!(absolutize("https://www.vlr.gg/", "matches"), "https://www.vlr.gg/matches");
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Thu,\n   August 21  "), "Thu, August 21");
    }
}
