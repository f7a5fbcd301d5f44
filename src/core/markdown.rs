//! Minimal markdown-to-HTML for listing descriptions.

use regex::Regex;
use std::sync::LazyLock;

static CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\[\d+(?:,\s*\d+)*\]").expect("citation pattern"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\s][^*]*?)\*").expect("italic pattern"));

const BULLETS: [&str; 4] = ["• ", "- ", "* ", "+ "];

/// Drops `[1]` / `[2, 3]` citation markers left by search-backed models.
pub fn strip_citations(text: &str) -> String {
    CITATION.replace_all(text, "").into_owned()
}

/// Unwraps a reply fenced as a code block (language tag optional).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn inline(text: &str) -> String {
    let escaped = escape_html(text);
    let bold = BOLD.replace_all(&escaped, "<strong>$1</strong>");
    ITALIC.replace_all(&bold, "<em>$1</em>").into_owned()
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = line[hashes..].strip_prefix(' ')?;
    Some(((hashes + 1).min(6), rest.trim()))
}

fn bullet(line: &str) -> Option<&str> {
    if line == "•" {
        return Some("");
    }
    BULLETS
        .iter()
        .find_map(|prefix| line.strip_prefix(prefix))
        .or_else(|| line.strip_prefix('•'))
        .map(str::trim)
}

struct HtmlBuilder {
    blocks: Vec<String>,
    paragraph: Vec<String>,
    items: Vec<String>,
}

impl HtmlBuilder {
    fn flush_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            self.blocks.push(format!("<p>{}</p>", self.paragraph.join(" ")));
            self.paragraph.clear();
        }
    }

    fn flush_list(&mut self) {
        if !self.items.is_empty() {
            let items: Vec<String> = self
                .items
                .drain(..)
                .map(|item| format!("<li>{}</li>", item))
                .collect();
            self.blocks.push(format!("<ul>\n{}\n</ul>", items.join("\n")));
        }
    }
}

pub fn to_html(markdown: &str) -> String {
    let text = strip_citations(markdown);
    let mut html = HtmlBuilder {
        blocks: Vec::new(),
        paragraph: Vec::new(),
        items: Vec::new(),
    };

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            html.flush_paragraph();
            html.flush_list();
        } else if let Some((level, title)) = heading(line) {
            html.flush_paragraph();
            html.flush_list();
            html.blocks
                .push(format!("<h{level}>{}</h{level}>", inline(title)));
        } else if let Some(item) = bullet(line) {
            html.flush_paragraph();
            if !item.is_empty() {
                html.items.push(inline(item));
            }
        } else {
            html.flush_list();
            html.paragraph.push(inline(line));
        }
    }
    html.flush_paragraph();
    html.flush_list();

    html.blocks.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullets_become_one_list_per_run() {
        let html = to_html("• **Leather** upper\n- Rubber sole\n\nMade in Italy.\n* Dust bag");
        assert_eq!(
            html,
            "<ul>\n<li><strong>Leather</strong> upper</li>\n<li>Rubber sole</li>\n</ul>\n\
             <p>Made in Italy.</p>\n\
             <ul>\n<li>Dust bag</li>\n</ul>"
        );
    }

    #[test]
    fn test_paragraph_lines_join_and_escape() {
        let html = to_html("Size 42 <EU>\nfits true & narrow\n\n## Care");
        assert_eq!(html, "<p>Size 42 &lt;EU&gt; fits true &amp; narrow</p>\n<h3>Care</h3>");
    }

    #[test]
    fn test_citations_are_removed() {
        assert_eq!(strip_citations("Calfskin leather [1]. Italy[2, 3]"), "Calfskin leather. Italy");
        assert_eq!(to_html("Calfskin [4]"), "<p>Calfskin</p>");
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```html\n<h2>Ace</h2>\n```\n"), "<h2>Ace</h2>");
        assert_eq!(strip_code_fence("<p>plain</p>"), "<p>plain</p>");
        assert_eq!(strip_code_fence("```\n<p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn test_italics_and_hash_without_space() {
        assert_eq!(to_html("*limited* run"), "<p><em>limited</em> run</p>");
        assert_eq!(to_html("#1 bestseller"), "<p>#1 bestseller</p>");
    }
}
