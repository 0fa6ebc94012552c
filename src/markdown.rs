//! Markdown-lite: the small subset of markdown supported in assistant replies.
//!
//! `to_html` is a pure text-to-text function. Its passes run in a fixed order:
//! escaping first so synthesized tags survive, bold before italic so `**` is
//! never consumed as two single stars, and line breaks last so the list passes
//! still see line boundaries.

use regex::Regex;
use std::sync::OnceLock;

struct Rules {
    bold: Regex,
    italic: Regex,
    bullet: Regex,
    numbered: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| Rules {
        bold: Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern"),
        italic: Regex::new(r"\*(.*?)\*").expect("italic pattern"),
        bullet: Regex::new(r"(?m)^\s*[-*]\s+(.*)$").expect("bullet pattern"),
        numbered: Regex::new(r"(?m)^\s*(\d+\.)\s+(.*)$").expect("numbered pattern"),
    })
}

/// Escape the three characters that would otherwise open markup.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Convert assistant text to HTML.
pub fn to_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let rules = rules();
    let html = escape_html(text);
    let html = rules.bold.replace_all(&html, "<b>${1}</b>");
    let html = rules.italic.replace_all(&html, "<i>${1}</i>");
    let html = rules.bullet.replace_all(&html, "• ${1}<br>");
    let html = rules.numbered.replace_all(&html, "${1} ${2}<br>");
    html.replace('\n', "<br>")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Plain,
    Bold,
    Italic,
}

/// Split one line of assistant text into styled runs for hosts that draw
/// text rather than HTML.
///
/// Uses the same patterns and pass order as [`to_html`], so both hosts agree
/// on what is bold, italic or a list item. Italic markers only pair up inside
/// the text between bold spans; the terminal has no nested styles.
pub fn line_runs(line: &str) -> Vec<(Emphasis, String)> {
    let rules = rules();
    let mut runs = Vec::new();
    for (emphasis, text) in split_runs(&rules.bold, line, Emphasis::Bold) {
        if emphasis == Emphasis::Plain {
            runs.extend(split_runs(&rules.italic, &text, Emphasis::Italic));
        } else {
            runs.push((emphasis, text));
        }
    }

    // List markers only count at the start of the line, after emphasis has
    // taken its stars.
    if let Some((Emphasis::Plain, first)) = runs.first_mut() {
        if let Some(caps) = rules.bullet.captures(first) {
            *first = format!("• {}", &caps[1]);
        } else if let Some(caps) = rules.numbered.captures(first) {
            *first = format!("{} {}", &caps[1], &caps[2]);
        }
    }
    runs
}

fn split_runs(pattern: &Regex, text: &str, emphasis: Emphasis) -> Vec<(Emphasis, String)> {
    let mut runs = Vec::new();
    let mut last = 0;
    for caps in pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            runs.push((Emphasis::Plain, text[last..whole.start()].to_string()));
        }
        let inner = caps.get(1).map_or("", |m| m.as_str());
        runs.push((emphasis, inner.to_string()));
        last = whole.end();
    }
    if last < text.len() {
        runs.push((Emphasis::Plain, text[last..].to_string()));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_renders_without_asterisks() {
        assert_eq!(to_html("**Hola**"), "<b>Hola</b>");
    }

    #[test]
    fn test_bold_runs_before_italic() {
        assert_eq!(
            to_html("**negrita** y *cursiva*"),
            "<b>negrita</b> y <i>cursiva</i>"
        );
    }

    #[test]
    fn test_escaping_precedes_markup() {
        assert_eq!(
            to_html("<script>alert('x')</script> & **ok**"),
            "&lt;script&gt;alert('x')&lt;/script&gt; &amp; <b>ok</b>"
        );
    }

    #[test]
    fn test_bullets_and_numbered_lines() {
        let html = to_html("Cartelera:\n- Dune\n  * Alien\n1. Primera\n2. Segunda");
        assert_eq!(
            html,
            "Cartelera:<br>• Dune<br><br>• Alien<br><br>1. Primera<br><br>2. Segunda<br>"
        );
    }

    #[test]
    fn test_plain_text_passes_through() {
        let plain = "Hola, quedan entradas para hoy";
        assert_eq!(to_html(plain), plain);
        assert_eq!(to_html(&to_html(plain)), to_html(plain));
    }

    #[test]
    fn test_raw_angle_brackets_never_survive() {
        for raw in ["<b>", "a < b > c", "&&<<>>", "**<i>**", "- <li>"] {
            let html = to_html(raw);
            let stripped = html
                .replace("<b>", "")
                .replace("</b>", "")
                .replace("<i>", "")
                .replace("</i>", "")
                .replace("<br>", "");
            assert!(!stripped.contains('<'), "{raw:?} -> {html:?}");
            assert!(!stripped.contains('>'), "{raw:?} -> {html:?}");
            assert!(
                !stripped.replace("&amp;", "").replace("&lt;", "").replace("&gt;", "").contains('&'),
                "{raw:?} -> {html:?}"
            );
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(to_html(""), "");
    }

    #[test]
    fn test_unclosed_bold_pairs_as_empty_italic() {
        // A lone `**` pairs up as an empty italic span, the same as the embed script.
        assert_eq!(to_html("**abierto"), "<i></i>abierto");
    }

    #[test]
    fn test_line_runs_follow_html_passes() {
        use Emphasis::*;
        assert_eq!(
            line_runs("**Hola** y *adiós*"),
            vec![
                (Bold, "Hola".to_string()),
                (Plain, " y ".to_string()),
                (Italic, "adiós".to_string()),
            ]
        );
        // Same pairing as `to_html("**abierto")`
        assert_eq!(
            line_runs("**abierto"),
            vec![(Italic, String::new()), (Plain, "abierto".to_string())]
        );
        assert_eq!(line_runs("5 * 3"), vec![(Plain, "5 * 3".to_string())]);
        assert!(line_runs("").is_empty());
    }

    #[test]
    fn test_line_runs_list_items() {
        use Emphasis::*;
        assert_eq!(line_runs("\t- Dune"), vec![(Plain, "• Dune".to_string())]);
        assert_eq!(to_html("\t- Dune"), "• Dune<br>");
        assert_eq!(
            line_runs("  * **Alien** hoy"),
            vec![
                (Plain, "• ".to_string()),
                (Bold, "Alien".to_string()),
                (Plain, " hoy".to_string()),
            ]
        );
        assert_eq!(line_runs(" 2.   Segunda"), vec![(Plain, "2. Segunda".to_string())]);
    }
}
