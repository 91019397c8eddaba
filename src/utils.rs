// src/utils.rs

/// Truncate to at most `max` characters without splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Capitalize the first letter of every word, lowercase the rest
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Host-style slug for a company name: lowercase, spaces removed
pub fn company_slug(company: &str) -> String {
    company.to_lowercase().replace(' ', "")
}

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Lowercase every entry and drop the empty ones
pub fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Apply \n\t now  "), "Apply now");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("acme studios"), "Acme Studios");
        assert_eq!(title_case("BIG corp"), "Big Corp");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_company_slug() {
        assert_eq!(company_slug("Riot Games"), "riotgames");
        assert_eq!(company_slug("Netflix"), "netflix");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"R&D" Lead's</b>"#),
            "&lt;b&gt;&quot;R&amp;D&quot; Lead&#39;s&lt;/b&gt;"
        );
    }

    #[test]
    fn test_normalize_keywords() {
        let keywords = vec!["  Design ".to_string(), "".to_string(), "FILM".to_string()];
        assert_eq!(normalize_keywords(&keywords), vec!["design", "film"]);
    }
}
