//! Per-page state and path conventions.
//!
//! A [`PageContext`] is what shortcodes see of the page they are expanding
//! in: where the markdown file lives (media references resolve against its
//! directory) and the Open Graph image chosen so far.
//!
//! ## Output layout
//!
//! ```text
//! content/index.md              →  _site/index.html
//! content/about.md              →  _site/about/index.html
//! content/posts/index.md        →  _site/posts/index.html
//! content/posts/hello-world.md  →  _site/posts/hello-world/index.html
//! ```

use crate::shortcode::ShortcodeOutput;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// The markdown file being expanded.
    pub input_path: PathBuf,
    /// Content root; references starting with `/` resolve against it.
    pub content_root: PathBuf,
    /// URL of the page's social preview image, if any shortcode produced one.
    pub open_graph_image: Option<String>,
}

impl PageContext {
    pub fn new(input_path: &Path, content_root: &Path) -> Self {
        Self {
            input_path: input_path.to_path_buf(),
            content_root: content_root.to_path_buf(),
            open_graph_image: None,
        }
    }

    /// Directory that relative media references resolve against.
    pub fn directory(&self) -> &Path {
        self.input_path.parent().unwrap_or(Path::new(""))
    }

    /// Resolve a media reference as written in content.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        match reference.strip_prefix('/') {
            Some(rooted) => self.content_root.join(rooted),
            None => self.directory().join(reference),
        }
    }

    /// Record what a shortcode reported. Only a present candidate replaces
    /// the current one.
    pub fn apply(&mut self, output: &ShortcodeOutput) {
        if let Some(url) = &output.open_graph_image {
            self.open_graph_image = Some(url.clone());
        }
    }
}

/// Drop a leading `---` fenced front-matter block.
///
/// The block is not interpreted. A document without a closing fence is
/// returned unchanged.
pub fn strip_front_matter(source: &str) -> &str {
    let Some(rest) = source
        .strip_prefix("---\n")
        .or_else(|| source.strip_prefix("---\r\n"))
    else {
        return source;
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        if line.trim_end() == "---" {
            return &rest[offset..];
        }
    }
    source
}

/// Title from the first level-one heading, falling back to the file stem.
///
/// Headings are found in the parsed event stream, so a `# ` line inside a
/// fenced code block is not a title.
pub fn extract_title(markdown: &str, path: &Path) -> String {
    first_h1(markdown)
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
}

fn first_h1(markdown: &str) -> Option<String> {
    let mut parser = Parser::new(markdown);
    parser.find(|event| {
        matches!(
            event,
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            })
        )
    })?;

    let mut title = String::new();
    for event in parser {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(text) | Event::Code(text) => title.push_str(&text),
            _ => {}
        }
    }
    Some(title)
}

/// Where a page's HTML is written, relative to the site output.
pub fn output_path(relative: &Path) -> PathBuf {
    let parent = relative.parent().unwrap_or(Path::new(""));
    match relative.file_stem().and_then(|s| s.to_str()) {
        Some("index") | None => parent.join("index.html"),
        Some(stem) => parent.join(stem).join("index.html"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageContext {
        PageContext::new(Path::new("/blog/content/posts/hello.md"), Path::new("/blog/content"))
    }

    // =========================================================================
    // PageContext
    // =========================================================================

    #[test]
    fn relative_reference_resolves_against_page_directory() {
        assert_eq!(
            page().resolve("cat.jpg"),
            Path::new("/blog/content/posts/cat.jpg")
        );
        assert_eq!(
            page().resolve("media/cat.jpg"),
            Path::new("/blog/content/posts/media/cat.jpg")
        );
    }

    #[test]
    fn rooted_reference_resolves_against_content_root() {
        assert_eq!(
            page().resolve("/shared/logo.png"),
            Path::new("/blog/content/shared/logo.png")
        );
    }

    #[test]
    fn apply_records_candidate() {
        let mut page = page();
        page.apply(&ShortcodeOutput {
            open_graph_image: Some("/img/a-1200.webp".into()),
            ..ShortcodeOutput::default()
        });
        assert_eq!(page.open_graph_image.as_deref(), Some("/img/a-1200.webp"));
    }

    #[test]
    fn apply_without_candidate_keeps_previous() {
        let mut page = page();
        page.open_graph_image = Some("/img/first.webp".into());
        page.apply(&ShortcodeOutput::default());
        assert_eq!(page.open_graph_image.as_deref(), Some("/img/first.webp"));
    }

    // =========================================================================
    // strip_front_matter
    // =========================================================================

    #[test]
    fn front_matter_removed() {
        let source = "---\ntitle: Hello\ntags: [a]\n---\n# Body\n";
        assert_eq!(strip_front_matter(source), "# Body\n");
    }

    #[test]
    fn no_front_matter_unchanged() {
        assert_eq!(strip_front_matter("# Body\n"), "# Body\n");
    }

    #[test]
    fn unclosed_front_matter_unchanged() {
        let source = "---\ntitle: Hello\n# Body\n";
        assert_eq!(strip_front_matter(source), source);
    }

    #[test]
    fn horizontal_rule_later_in_document_is_not_front_matter() {
        let source = "# Body\n\n---\n\nmore\n";
        assert_eq!(strip_front_matter(source), source);
    }

    // =========================================================================
    // extract_title
    // =========================================================================

    #[test]
    fn title_from_first_heading() {
        let md = "intro\n\n# First\n\n# Second\n";
        assert_eq!(extract_title(md, Path::new("x.md")), "First");
    }

    #[test]
    fn subheadings_are_not_titles() {
        let md = "## Section\n";
        assert_eq!(extract_title(md, Path::new("notes.md")), "notes");
    }

    #[test]
    fn title_falls_back_to_stem() {
        assert_eq!(extract_title("no heading", Path::new("posts/hello-world.md")), "hello-world");
    }

    #[test]
    fn hash_lines_in_code_blocks_are_not_titles() {
        let md = "```sh\n# install deps\nmake\n```\n\n# Setup notes\n";
        assert_eq!(extract_title(md, Path::new("setup.md")), "Setup notes");
    }

    #[test]
    fn code_only_page_falls_back_to_stem() {
        let md = "```\n# just a comment\n```\n";
        assert_eq!(extract_title(md, Path::new("snippet.md")), "snippet");
    }

    #[test]
    fn inline_code_kept_in_title() {
        assert_eq!(extract_title("# Using `rayon`\n", Path::new("x.md")), "Using rayon");
    }

    // =========================================================================
    // output_path
    // =========================================================================

    #[test]
    fn index_maps_to_directory_index() {
        assert_eq!(output_path(Path::new("index.md")), Path::new("index.html"));
        assert_eq!(
            output_path(Path::new("posts/index.md")),
            Path::new("posts/index.html")
        );
    }

    #[test]
    fn named_page_gets_own_directory() {
        assert_eq!(
            output_path(Path::new("posts/hello-world.md")),
            Path::new("posts/hello-world/index.html")
        );
        assert_eq!(output_path(Path::new("about.md")), Path::new("about/index.html"));
    }
}
