//! Visible-text extraction from HTML.
//!
//! Pipeline pages bury their data in tables and content containers; the
//! cleaner strips chrome, prefers the main content region and linearizes
//! table rows so the extractor can recognize tabular pipeline data.

use scraper::{ElementRef, Html, Selector};

/// Cap on cleaned text handed downstream, bounding LLM input cost.
pub const MAX_TEXT_CHARS: usize = 50_000;

const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript",
];

/// Cleaned page content: visible text plus raw outbound link targets.
#[derive(Debug, Clone, Default)]
pub struct CleanedHtml {
    pub text: String,
    pub links: Vec<String>,
}

/// Extract visible text and anchor targets from an HTML document.
///
/// Table rows are rendered pipe-delimited inside a `[TABLE DATA]` block
/// ahead of the running text. Output is truncated to [`MAX_TEXT_CHARS`].
pub fn clean_html(html: &str) -> CleanedHtml {
    let doc = Html::parse_document(html);
    let links = extract_links(&doc);

    let root = content_root(&doc);
    let table_text = linearize_tables(root);
    let mut body = String::new();
    collect_text(root, &mut body);

    let mut text = if table_text.is_empty() {
        body
    } else {
        format!("[TABLE DATA]\n{table_text}[END TABLE]\n\n{body}")
    };
    truncate_chars(&mut text, MAX_TEXT_CHARS);

    CleanedHtml { text, links }
}

/// Collect anchor targets, excluding fragments and non-content schemes.
fn extract_links(doc: &Html) -> Vec<String> {
    let anchor = Selector::parse("a[href]").expect("static selector");
    doc.select(&anchor)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| {
            !href.is_empty()
                && !href.starts_with('#')
                && !href.starts_with("javascript:")
                && !href.starts_with("mailto:")
                && !href.starts_with("tel:")
        })
        .map(str::to_owned)
        .collect()
}

/// Prefer `<main>`, `<article>`, then a content-class container.
fn content_root(doc: &Html) -> ElementRef<'_> {
    for selector in ["main", "article", r#"[class*="content"]"#] {
        let parsed = Selector::parse(selector).expect("static selector");
        if let Some(element) = doc.select(&parsed).next() {
            return element;
        }
    }
    doc.root_element()
}

/// Render each table row as a pipe-delimited line.
fn linearize_tables(root: ElementRef<'_>) -> String {
    let table = Selector::parse("table").expect("static selector");
    let row = Selector::parse("tr").expect("static selector");
    let cell = Selector::parse("td, th").expect("static selector");

    let mut out = String::new();
    for table_el in root.select(&table) {
        for row_el in table_el.select(&row) {
            let cells: Vec<String> = row_el
                .select(&cell)
                .map(|c| {
                    c.text()
                        .collect::<String>()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
            if !cells.is_empty() {
                out.push_str(&cells.join(" | "));
                out.push('\n');
            }
        }
    }
    out
}

/// Walk the DOM collecting text nodes, skipping non-content subtrees.
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if !SKIP_TAGS.contains(&child_el.value().name()) {
                collect_text(child_el, out);
            }
        } else if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(trimmed);
            }
        }
    }
}

/// Truncate to a char boundary at or below `max` bytes.
fn truncate_chars(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_and_chrome() {
        let html = r#"
            <html><body>
            <script>var tracking = true;</script>
            <style>.x { color: red }</style>
            <nav>Home | About</nav>
            <p>ABL001 is a bispecific antibody.</p>
            <footer>Copyright</footer>
            </body></html>
        "#;

        let cleaned = clean_html(html);
        assert!(cleaned.text.contains("ABL001 is a bispecific antibody."));
        assert!(!cleaned.text.contains("tracking"));
        assert!(!cleaned.text.contains("color: red"));
        assert!(!cleaned.text.contains("Copyright"));
    }

    #[test]
    fn prefers_main_container() {
        let html = r#"
            <html><body>
            <div>Sidebar noise everywhere</div>
            <main><p>Pipeline overview text</p></main>
            </body></html>
        "#;

        let cleaned = clean_html(html);
        assert!(cleaned.text.contains("Pipeline overview text"));
        assert!(!cleaned.text.contains("Sidebar noise"));
    }

    #[test]
    fn linearizes_tables_with_marker() {
        let html = r#"
            <html><body><main>
            <table>
              <tr><th>Asset</th><th>Phase</th></tr>
              <tr><td>ABL001</td><td>Phase 1</td></tr>
            </table>
            </main></body></html>
        "#;

        let cleaned = clean_html(html);
        assert!(cleaned.text.starts_with("[TABLE DATA]"));
        assert!(cleaned.text.contains("Asset | Phase"));
        assert!(cleaned.text.contains("ABL001 | Phase 1"));
        assert!(cleaned.text.contains("[END TABLE]"));
    }

    #[test]
    fn extracts_links_excluding_non_content_targets() {
        let html = r##"
            <html><body>
            <a href="/abl001">ABL001</a>
            <a href="https://example.com/pipeline">Pipeline</a>
            <a href="#section">Anchor</a>
            <a href="javascript:void(0)">JS</a>
            <a href="mailto:info@example.com">Mail</a>
            <a href="tel:+15551234">Call</a>
            </body></html>
        "##;

        let cleaned = clean_html(html);
        assert_eq!(
            cleaned.links,
            vec!["/abl001".to_string(), "https://example.com/pipeline".to_string()]
        );
    }

    #[test]
    fn links_survive_container_narrowing() {
        // Links are collected from the whole document, even when the text
        // root narrows to <main>.
        let html = r#"
            <html><body>
            <nav><a href="/pipeline">Pipeline</a></nav>
            <main><p>Body</p></main>
            </body></html>
        "#;

        let cleaned = clean_html(html);
        assert_eq!(cleaned.links, vec!["/pipeline".to_string()]);
    }

    #[test]
    fn caps_output_length() {
        let big = format!("<html><body><p>{}</p></body></html>", "x".repeat(80_000));
        let cleaned = clean_html(&big);
        assert!(cleaned.text.len() <= MAX_TEXT_CHARS);
    }
}
