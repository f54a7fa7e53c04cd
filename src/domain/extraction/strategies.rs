use super::TextOrigin;
use regex::Regex;

/// One attempt in the ordered extraction fallback chain. Returning `None`
/// is the normal "this parser cannot read the document" outcome; it carries
/// no error because the next strategy gets its turn.
pub trait ExtractionStrategy: Send + Sync {
    fn origin(&self) -> TextOrigin;

    fn try_extract(&self, bytes: &[u8]) -> Option<String>;
}

/// Reads the document's embedded text layer in one pass. Fastest and
/// highest fidelity when a text layer exists.
pub struct EmbeddedTextStrategy;

impl ExtractionStrategy for EmbeddedTextStrategy {
    fn origin(&self) -> TextOrigin {
        TextOrigin::EmbeddedText
    }

    fn try_extract(&self, bytes: &[u8]) -> Option<String> {
        let text = pdf_extract::extract_text_from_mem(bytes).ok()?;
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

/// Second structured parser: iterates pages and concatenates per-page text
/// runs with newline separators. Catches documents the single-pass parser
/// reports as empty despite having pages.
pub struct PageTextStrategy;

impl ExtractionStrategy for PageTextStrategy {
    fn origin(&self) -> TextOrigin {
        TextOrigin::PageText
    }

    fn try_extract(&self, bytes: &[u8]) -> Option<String> {
        let document = lopdf::Document::load_mem(bytes).ok()?;
        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        if pages.is_empty() {
            return None;
        }

        let mut out = String::new();
        for page in pages {
            if let Ok(page_text) = document.extract_text(&[page]) {
                let page_text = page_text.trim();
                if !page_text.is_empty() {
                    out.push_str(page_text);
                    out.push('\n');
                }
            }
        }

        let out = out.trim();
        if out.is_empty() {
            None
        } else {
            Some(out.to_string())
        }
    }
}

/// Last-resort structural fallback for malformed containers: scans the raw
/// bytes for `(text) Tj`/`TJ` show-text operators without parsing the
/// document at all.
pub struct OperatorScanStrategy {
    pattern: Regex,
}

impl OperatorScanStrategy {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"\(([^)]*)\)\s*T[Jj]").expect("valid show-text pattern"),
        }
    }
}

impl Default for OperatorScanStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionStrategy for OperatorScanStrategy {
    fn origin(&self) -> TextOrigin {
        TextOrigin::OperatorScan
    }

    fn try_extract(&self, bytes: &[u8]) -> Option<String> {
        // Latin-1 decode: every byte maps to a char, so the scan never
        // trips over binary sections.
        let haystack: String = bytes.iter().map(|&b| b as char).collect();

        let tokens: Vec<String> = self
            .pattern
            .captures_iter(&haystack)
            .map(|cap| {
                cap[1]
                    .replace(r"\)", ")")
                    .replace(r"\(", "(")
                    .replace(r"\n", " ")
            })
            .filter(|token| !token.trim().is_empty())
            .collect();

        if tokens.is_empty() {
            return None;
        }
        Some(tokens.join(" ").trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn operator_scan_reads_show_text_operators() {
        let bytes = b"garbage (Call me) Tj more garbage (Ishmael.) TJ end";
        let text = OperatorScanStrategy::new().try_extract(bytes).unwrap();
        assert_eq!(text, "Call me Ishmael.");
    }

    #[test]
    fn operator_scan_unescapes_parentheses() {
        let bytes = br"(a \(quoted\) word) Tj";
        let text = OperatorScanStrategy::new().try_extract(bytes).unwrap();
        assert_eq!(text, "a (quoted) word");
    }

    #[test]
    fn operator_scan_returns_none_without_operators() {
        assert!(OperatorScanStrategy::new()
            .try_extract(b"no text operators here")
            .is_none());
    }

    #[test]
    fn embedded_text_rejects_non_documents() {
        assert!(EmbeddedTextStrategy.try_extract(b"not a pdf").is_none());
    }

    #[test]
    fn page_text_rejects_non_documents() {
        assert!(PageTextStrategy.try_extract(b"not a pdf").is_none());
    }
}
