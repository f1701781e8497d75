//! `{{ field }}` placeholder substitution.

use std::collections::BTreeMap;

/// Escape `& < > " '` for safe inclusion in HTML.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replace `{{ name }}` / `{{name}}` with the HTML-escaped value of `name`.
///
/// Placeholders without a value are left as written.
pub fn render(content: &str, data: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        let key = after_open[..close].trim();
        match data.get(key) {
            Some(value) => out.push_str(&escape_html(value)),
            None => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after_open[close + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_with_and_without_spaces() {
        let d = data(&[("name", "Ana"), ("day", "2025-08-01")]);
        assert_eq!(
            render("Dear {{ name }}, see you {{day}}.", &d),
            "Dear Ana, see you 2025-08-01."
        );
    }

    #[test]
    fn values_are_escaped() {
        let d = data(&[("name", "<b>Tom & \"Jerry\"</b>")]);
        assert_eq!(
            render("{{ name }}", &d),
            "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn unknown_and_unterminated_placeholders_are_kept() {
        let d = data(&[("a", "1")]);
        assert_eq!(render("{{ b }} {{a}} {{ c", &d), "{{ b }} 1 {{ c");
    }
}
