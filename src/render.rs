//! Markdown and HTML page rendering.
//!
//! Each article becomes one standalone document. The client scripts are
//! embedded at compile time and inlined into every page:
//!
//! - `static/lazy-video.js`: swaps `data-src` into `src` for `video.lazy`
//! - `static/copy-code.js`: adds a copy button before each `<pre>`
//!
//! Uses [maud](https://maud.lambda.xyz/) for the document shell and
//! pulldown-cmark for the article body.

use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Options, Parser, html as md_html};

pub const LAZY_VIDEO_JS: &str = include_str!("../static/lazy-video.js");
pub const COPY_CODE_JS: &str = include_str!("../static/copy-code.js");

/// Convert markdown to HTML. Raw HTML (expanded shortcodes) passes through.
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options);
    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    md_html::push_html(&mut body, parser);
    body
}

/// Renders the base HTML document structure
fn base_document(title: &str, open_graph_image: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                meta property="og:title" content=(title);
                @if let Some(url) = open_graph_image {
                    meta property="og:image" content=(url);
                }
            }
            body {
                (content)
                script { (PreEscaped(LAZY_VIDEO_JS)) }
                script { (PreEscaped(COPY_CODE_JS)) }
            }
        }
    }
}

/// Renders an article page from already-converted body HTML.
pub fn render_page(title: &str, body_html: &str, open_graph_image: Option<&str>) -> Markup {
    let content = html! {
        main {
            article {
                (PreEscaped(body_html))
            }
        }
    };
    base_document(title, open_graph_image, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_document_includes_doctype() {
        let doc = render_page("Test", "<p>x</p>", None).into_string();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>Test</title>"));
    }

    #[test]
    fn open_graph_meta_only_with_candidate() {
        let without = render_page("T", "", None).into_string();
        assert!(!without.contains("og:image"));

        let with = render_page("T", "", Some("/img/abc-1200.webp")).into_string();
        assert!(with.contains(r#"<meta property="og:image" content="/img/abc-1200.webp">"#));
    }

    #[test]
    fn client_scripts_inlined() {
        let doc = render_page("T", "", None).into_string();
        assert!(doc.contains("IntersectionObserver"));
        assert!(doc.contains("navigator.clipboard"));
    }

    #[test]
    fn body_html_not_escaped() {
        let doc = render_page("T", r#"<div class="image"><img alt="x"></div>"#, None).into_string();
        assert!(doc.contains(r#"<div class="image"><img alt="x"></div>"#));
    }

    #[test]
    fn title_escaped() {
        let doc = render_page("<script>", "", None).into_string();
        assert!(doc.contains("<title>&lt;script&gt;</title>"));
    }

    // =========================================================================
    // markdown_to_html
    // =========================================================================

    #[test]
    fn markdown_renders_code_blocks_as_pre() {
        let html = markdown_to_html("```\nconsole.log(1)\n```\n");
        assert!(html.contains("<pre><code>console.log(1)\n</code></pre>"));
    }

    #[test]
    fn markdown_passes_shortcode_html_through() {
        let html = markdown_to_html("intro\n\n<div class=\"image\"><img alt=\"a\" src=\"/img/a.jpg\"></div>\n\nafter\n");
        assert!(html.contains(r#"<div class="image"><img alt="a" src="/img/a.jpg"></div>"#));
        assert!(html.contains("<p>after</p>"));
    }

    #[test]
    fn markdown_tables_enabled() {
        let html = markdown_to_html("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
    }

    #[test]
    fn markdown_strikethrough_enabled() {
        assert!(markdown_to_html("~~gone~~").contains("<del>gone</del>"));
    }
}
