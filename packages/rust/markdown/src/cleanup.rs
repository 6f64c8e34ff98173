//! Post-conversion cleanup pipeline.
//!
//! Each pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Run the full cleanup pipeline on converted Markdown.
pub(crate) fn run_pipeline(md: &str, base_url: Option<&Url>) -> String {
    let mut result = md.replace("\r\n", "\n");

    result = normalize_headings(&result);
    result = strip_leftover_html(&result);
    result = resolve_links(&result, base_url);
    result = clean_content(&result);
    result = ensure_trailing_newline(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Normalize heading levels
// ---------------------------------------------------------------------------

/// Keep the first H1, demote later ones to H2.
fn normalize_headings(md: &str) -> String {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^#\s+(.+)$").expect("valid regex"));

    let mut seen_h1 = false;
    md.lines()
        .map(|line| match H1_RE.captures(line) {
            Some(caps) if seen_h1 => format!("## {}", &caps[1]),
            Some(_) => {
                seen_h1 = true;
                line.to_string()
            }
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Strip leftover HTML tags
// ---------------------------------------------------------------------------

/// Remove container tags that survived conversion, keeping their text.
fn strip_leftover_html(md: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|details|summary|br)(?:\s[^>]*)?/?>",
        )
        .expect("valid regex")
    });
    HTML_TAG_RE.replace_all(md, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 3: Resolve relative links
// ---------------------------------------------------------------------------

/// Resolve relative URLs in Markdown links against the page URL.
fn resolve_links(md: &str, base_url: Option<&Url>) -> String {
    let Some(base) = base_url else {
        return md.to_string();
    };

    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex"));

    LINK_RE
        .replace_all(md, |caps: &regex::Captures| {
            let text = &caps[1];
            let href = &caps[2];
            if href.starts_with("http://")
                || href.starts_with("https://")
                || href.starts_with('#')
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
            {
                return caps[0].to_string();
            }
            match base.join(href) {
                Ok(resolved) => format!("[{text}]({resolved})"),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Pass 4: Content cleanup
// ---------------------------------------------------------------------------

static SLASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*/[ \t]+|[ \t]+/[ \t]*").expect("valid regex"));
static PIPE_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+\|[ \t]+").expect("valid regex"));
static SPACE_BEFORE_DOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+\.").expect("valid regex"));
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)*").expect("valid regex"));

/// Normalize extracted text: tighten slashes and full stops, drop `|`
/// separators outside tables, collapse spaces and blank-line runs, and
/// compose decomposed umlauts.
pub fn clean_content(text: &str) -> String {
    let text = text
        .replace("a\u{308}", "ä")
        .replace("o\u{308}", "ö")
        .replace("u\u{308}", "ü")
        .replace("A\u{308}", "Ä")
        .replace("O\u{308}", "Ö")
        .replace("U\u{308}", "Ü");

    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            if line.trim_start().starts_with('|') {
                return line.trim_end().to_string();
            }
            let line = SLASH_RE.replace_all(line, "/");
            let line = PIPE_SEPARATOR_RE.replace_all(&line, " ");
            let line = SPACE_BEFORE_DOT_RE.replace_all(&line, ".");
            SPACES_RE.replace_all(&line, " ").trim_end().to_string()
        })
        .collect();

    let joined = lines.join("\n");
    BLANK_LINES_RE
        .replace_all(joined.trim_start_matches('\n'), "\n\n")
        .into_owned()
}

// ---------------------------------------------------------------------------
// Pass 5: Ensure trailing newline
// ---------------------------------------------------------------------------

fn ensure_trailing_newline(md: &str) -> String {
    format!("{}\n", md.trim_end())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_h1_is_demoted() {
        let input = "# Title\n\nSome text\n\n# Another Title\n\nMore text";
        assert_eq!(
            normalize_headings(input),
            "# Title\n\nSome text\n\n## Another Title\n\nMore text"
        );
        let single = "# Only One\n\n## Sub";
        assert_eq!(normalize_headings(single), single);
    }

    #[test]
    fn leftover_tags_are_removed() {
        let result = strip_leftover_html("<div class=\"note\">Apply by 30 June</div><br/>");
        assert_eq!(result, "Apply by 30 June");
    }

    #[test]
    fn relative_links_resolve() {
        let base = Url::parse("https://emba.unisg.ch/programm/emba").unwrap();
        assert_eq!(
            resolve_links("[Fees](/kosten)", Some(&base)),
            "[Fees](https://emba.unisg.ch/kosten)"
        );
        assert_eq!(
            resolve_links("[Mail](mailto:emba@unisg.ch)", Some(&base)),
            "[Mail](mailto:emba@unisg.ch)"
        );
        assert_eq!(resolve_links("[Fees](/kosten)", None), "[Fees](/kosten)");
    }

    #[test]
    fn content_cleanup() {
        let input = "Start  date :  August / September .\n\n\n\nModule | Block | Week";
        assert_eq!(
            clean_content(input),
            "Start date : August/September.\n\nModule Block Week"
        );
    }

    #[test]
    fn tables_survive_cleanup() {
        let input = "| Program | Fee |\n| --- | --- |\n| EMBA | CHF 80'000 |";
        assert_eq!(clean_content(input), input);
    }

    #[test]
    fn decomposed_umlauts_are_composed() {
        assert_eq!(clean_content("Fu\u{308}hrung"), "Führung");
    }

    #[test]
    fn pipeline_ends_with_single_newline() {
        let result = run_pipeline("# EMBA\r\n\r\n<span>Text</span>\n\n\n", None);
        assert_eq!(result, "# EMBA\n\nText\n");
    }
}
