//! Response parsing for LLM outputs.
//!
//! Extracts SQL from LLM responses that may contain markdown code blocks.

/// Cleans a SQL-generation response down to the bare statement.
///
/// If the response contains a fenced code block, its body is kept (a ```` ```sql ````
/// block wins over an untagged one, the first block wins over later ones).
/// Any stray fence markers are removed and the result is trimmed.
///
/// ```
/// use sqlflow::llm::clean_sql;
///
/// assert_eq!(clean_sql("```sql\nSELECT 1;\n```"), "SELECT 1;");
/// assert_eq!(clean_sql("  SHOW TABLES;  "), "SHOW TABLES;");
/// ```
pub fn clean_sql(response: &str) -> String {
    let body = extract_code_block(response, "sql")
        .or_else(|| extract_code_block(response, ""))
        .unwrap_or(response);

    strip_fences(body).trim().to_string()
}

/// Removes every ```` ```sql ```` and ```` ``` ```` marker, ignoring case.
fn strip_fences(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find("```") {
        result.push_str(&rest[..idx]);
        rest = &rest[idx + 3..];
        if rest
            .get(..3)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("sql"))
        {
            rest = &rest[3..];
        }
    }
    result.push_str(rest);
    result
}

/// Extracts content from a markdown code block with the specified language.
///
/// Pass an empty string for `lang` to match blocks without a language specifier.
/// The language tag is matched case-insensitively.
fn extract_code_block<'a>(text: &'a str, lang: &str) -> Option<&'a str> {
    let lower = text.to_ascii_lowercase();
    let start_pattern = format!("```{}", lang.to_ascii_lowercase());

    let mut search_from = 0;
    while let Some(offset) = lower[search_from..].find(&start_pattern) {
        let start_idx = search_from + offset;
        let after_pattern = start_idx + start_pattern.len();

        // Find the newline after the opening fence
        let newline = lower[after_pattern..].find('\n')? + after_pattern;
        let content_start = newline + 1;

        // Find the closing fence
        let end_idx = lower[content_start..].find("```")? + content_start;

        // Anything else on the fence line is a language specifier
        let specifier = lower[after_pattern..newline].trim();
        if !specifier.is_empty() {
            search_from = end_idx + 3;
            continue;
        }

        return Some(&text[content_start..end_idx]);
    }

    None
}
