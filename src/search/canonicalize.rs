//! Text canonicalization for consistent embedding input.
//!
//! Queries and corpus documents pass through the same pipeline before they are
//! embedded, so that visually identical text always maps to the same vector:
//!
//! 1. **Unicode NFC normalization** - "café" (decomposed) → "café" (composed)
//! 2. **Markdown stripping** - emphasis, inline code, headers, link targets
//! 3. **Whitespace normalization** - collapse runs, trim
//! 4. **Truncation** - limit to [`MAX_EMBED_CHARS`]
//!
//! ```ignore
//! use hybrid_retrieval::search::canonicalize::canonicalize_for_embedding;
//!
//! let canonical = canonicalize_for_embedding("## **Hybrid**  search\n[docs](http://x)");
//! assert_eq!(canonical, "Hybrid search docs");
//! ```

use unicode_normalization::UnicodeNormalization;

/// Maximum characters to keep after canonicalization.
pub const MAX_EMBED_CHARS: usize = 2000;

/// Canonicalize text for embedding. Deterministic for a given input.
pub fn canonicalize_for_embedding(text: &str) -> String {
    let normalized: String = text.nfc().collect();

    let stripped: Vec<String> = normalized
        .lines()
        .map(strip_markdown_line)
        .filter(|line| !line.is_empty())
        .collect();

    let collapsed = normalize_whitespace(&stripped.join(" "));
    truncate_to_chars(&collapsed, MAX_EMBED_CHARS)
}

fn strip_markdown_line(line: &str) -> String {
    let mut result = line
        .replace("**", "")
        .replace("__", "")
        .replace('`', "");

    result = strip_markdown_links(&result);

    let trimmed = result.trim_start();
    let trimmed = trimmed.trim_start_matches('#').trim_start();
    let trimmed = trimmed.trim_start_matches('>').trim_start();
    let trimmed = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .or_else(|| trimmed.strip_prefix("+ "))
        .unwrap_or(trimmed);

    trimmed.trim_end().to_string()
}

/// `[text](url)` → `text`
fn strip_markdown_links(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '[' {
            result.push(c);
            continue;
        }

        let mut link_text = String::new();
        let mut found_close = false;
        for inner in chars.by_ref() {
            if inner == ']' {
                found_close = true;
                break;
            }
            link_text.push(inner);
        }

        if found_close && chars.peek() == Some(&'(') {
            chars.next();
            let mut depth = 1;
            for inner in chars.by_ref() {
                match inner {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            result.push_str(&link_text);
        } else {
            result.push('[');
            result.push_str(&link_text);
            if found_close {
                result.push(']');
            }
        }
    }

    result
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_to_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
