//! Minimal markdown → HTML rendering
//!
//! Covers what generated documentation actually uses: ATX headings, fenced
//! code blocks, bullet and numbered lists, inline code, bold, and paragraphs.
//! Everything else is escaped and passed through as paragraph text.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::compile_regex;

static ORDERED_ITEM: LazyLock<Option<Regex>> = LazyLock::new(|| compile_regex(r"^\d+[.)]\s+(.*)$"));

static INLINE_CODE: LazyLock<Option<Regex>> = LazyLock::new(|| compile_regex(r"`([^`]+)`"));

static BOLD: LazyLock<Option<Regex>> = LazyLock::new(|| compile_regex(r"\*\*([^*]+)\*\*"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(&self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

#[derive(Default)]
struct Renderer {
    out: String,
    paragraph: Vec<String>,
    list: Option<ListKind>,
    code: Option<Vec<String>>,
}

impl Renderer {
    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = self.paragraph.join(" ");
        self.out.push_str(&format!("<p>{}</p>\n", inline(&text)));
        self.paragraph.clear();
    }

    fn close_list(&mut self) {
        if let Some(kind) = self.list.take() {
            self.out.push_str(&format!("</{}>\n", kind.tag()));
        }
    }

    fn flush_blocks(&mut self) {
        self.flush_paragraph();
        self.close_list();
    }

    fn list_item(&mut self, kind: ListKind, text: &str) {
        self.flush_paragraph();
        if self.list != Some(kind) {
            self.close_list();
            self.out.push_str(&format!("<{}>\n", kind.tag()));
            self.list = Some(kind);
        }
        self.out.push_str(&format!("<li>{}</li>\n", inline(text)));
    }

    fn line(&mut self, line: &str) {
        if let Some(code) = self.code.as_mut() {
            if line.trim_start().starts_with("```") {
                let body = escape(&code.join("\n"));
                self.out.push_str(&format!("<pre><code>{}</code></pre>\n", body));
                self.code = None;
            } else {
                code.push(line.to_string());
            }
            return;
        }

        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            self.flush_blocks();
            self.code = Some(Vec::new());
        } else if trimmed.is_empty() {
            self.flush_blocks();
        } else if let Some((level, text)) = heading(trimmed) {
            self.flush_blocks();
            self.out
                .push_str(&format!("<h{level}>{}</h{level}>\n", inline(text)));
        } else if let Some(text) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            self.list_item(ListKind::Unordered, text);
        } else if let Some(caps) = ORDERED_ITEM.as_ref().and_then(|re| re.captures(trimmed)) {
            self.list_item(ListKind::Ordered, &caps[1]);
        } else {
            self.close_list();
            self.paragraph.push(trimmed.to_string());
        }
    }

    fn finish(mut self) -> String {
        if let Some(code) = self.code.take() {
            let body = escape(&code.join("\n"));
            self.out.push_str(&format!("<pre><code>{}</code></pre>\n", body));
        }
        self.flush_blocks();
        self.out
    }
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    line[level..]
        .strip_prefix(' ')
        .map(|text| (level, text.trim()))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn inline(text: &str) -> String {
    let mut rendered = escape(text);
    if let Some(re) = INLINE_CODE.as_ref() {
        rendered = re.replace_all(&rendered, "<code>$1</code>").into_owned();
    }
    if let Some(re) = BOLD.as_ref() {
        rendered = re.replace_all(&rendered, "<strong>$1</strong>").into_owned();
    }
    rendered
}

/// Body HTML for a markdown document
pub fn markdown_to_html(markdown: &str) -> String {
    let mut renderer = Renderer::default();
    for line in markdown.lines() {
        renderer.line(line);
    }
    renderer.finish()
}

/// Complete HTML5 page around the rendered body
pub fn render_page(title: &str, markdown: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>\n\
         body {{ font-family: system-ui, sans-serif; max-width: 52rem; margin: 2rem auto; line-height: 1.55; padding: 0 1rem; }}\n\
         pre {{ background: #f5f5f5; padding: 0.75rem; overflow-x: auto; }}\n\
         code {{ font-family: ui-monospace, monospace; }}\n\
         </style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape(title),
        markdown_to_html(markdown)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_patterns_compile() {
        assert!(ORDERED_ITEM.is_some());
        assert!(INLINE_CODE.is_some());
        assert!(BOLD.is_some());
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let html = markdown_to_html("# Title\n\nFirst line\ncontinued.\n\n## Next");
        assert_eq!(
            html,
            "<h1>Title</h1>\n<p>First line continued.</p>\n<h2>Next</h2>\n"
        );
    }

    #[test]
    fn test_lists_switch_kind() {
        let html = markdown_to_html("- a\n- b\n1. one\n2. two");
        assert_eq!(
            html,
            "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n<ol>\n<li>one</li>\n<li>two</li>\n</ol>\n"
        );
    }

    #[test]
    fn test_code_block_is_escaped_verbatim() {
        let html = markdown_to_html("```rust\nlet x = a < b && c;\n```");
        assert_eq!(
            html,
            "<pre><code>let x = a &lt; b &amp;&amp; c;</code></pre>\n"
        );
    }

    #[test]
    fn test_inline_markup() {
        let html = markdown_to_html("Call `add(a, b)` for **sums** <now>");
        assert_eq!(
            html,
            "<p>Call <code>add(a, b)</code> for <strong>sums</strong> &lt;now&gt;</p>\n"
        );
    }

    #[test]
    fn test_unterminated_code_block() {
        let html = markdown_to_html("```\nfn main() {}");
        assert!(html.starts_with("<pre><code>fn main() {}"));
    }

    #[test]
    fn test_hash_without_space_is_text() {
        assert_eq!(markdown_to_html("#hashtag"), "<p>#hashtag</p>\n");
    }

    #[test]
    fn test_render_page_wraps_body() {
        let page = render_page("Docs & more", "# Hi");
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Docs &amp; more</title>"));
        assert!(page.contains("<h1>Hi</h1>"));
    }
}
