pub mod ocr;
pub mod strategies;

pub use ocr::{OcrEngine, PdfiumTesseractOcr};
pub use strategies::{
    EmbeddedTextStrategy, ExtractionStrategy, OperatorScanStrategy, PageTextStrategy,
};

use std::fmt;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("extracted text has {words} words, minimum is {required}")]
    InsufficientText { words: usize, required: usize },

    #[error("optical recognition failed: {0}")]
    Recognition(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Which step of the extraction chain produced the accepted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOrigin {
    EmbeddedText,
    PageText,
    OperatorScan,
    Recognition,
}

impl fmt::Display for TextOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EmbeddedText => "embedded_text",
            Self::PageText => "page_text",
            Self::OperatorScan => "operator_scan",
            Self::Recognition => "recognition",
        };
        f.write_str(name)
    }
}

/// UTF-8 text accepted for downstream processing. Free of NUL bytes; word
/// count is whitespace-delimited.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub words: usize,
    pub origin: TextOrigin,
}

impl ExtractedText {
    fn new(raw: &str, origin: TextOrigin) -> Self {
        let text = raw.replace('\u{0}', "").trim().to_string();
        let words = word_count(&text);
        Self {
            text,
            words,
            origin,
        }
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[derive(Debug, Clone)]
pub struct ExtractionPolicy {
    /// Texts below this word count are extraction failures, not trivially
    /// valid content.
    pub min_words: usize,
    /// Recognition kicks in when the best parser candidate stays below this.
    pub ocr_word_threshold: usize,
    /// Upper bound on pages rendered for recognition.
    pub ocr_max_pages: usize,
    pub force_ocr: bool,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            min_words: 50,
            ocr_word_threshold: 500,
            ocr_max_pages: 40,
            force_ocr: false,
        }
    }
}

/// Ordered fallback chain over [`ExtractionStrategy`] implementations, with
/// an optional optical-recognition pass for image-only documents.
pub struct Extractor {
    strategies: Arc<Vec<Box<dyn ExtractionStrategy>>>,
    ocr: Option<Arc<dyn OcrEngine>>,
}

impl Extractor {
    pub fn new(ocr: Option<Arc<dyn OcrEngine>>) -> Self {
        Self::with_strategies(
            vec![
                Box::new(EmbeddedTextStrategy),
                Box::new(PageTextStrategy),
                Box::new(OperatorScanStrategy::new()),
            ],
            ocr,
        )
    }

    pub fn with_strategies(
        strategies: Vec<Box<dyn ExtractionStrategy>>,
        ocr: Option<Arc<dyn OcrEngine>>,
    ) -> Self {
        Self {
            strategies: Arc::new(strategies),
            ocr,
        }
    }

    /// Run the chain over raw document bytes. The first strategy whose
    /// output reaches `policy.min_words` wins; otherwise the longest
    /// candidate is kept and recognition may improve on it.
    pub async fn extract(
        &self,
        bytes: Vec<u8>,
        policy: &ExtractionPolicy,
    ) -> Result<ExtractedText, ExtractionError> {
        let bytes = Arc::new(bytes);
        let base = self.run_strategies(bytes.clone(), policy.min_words).await?;

        let base_words = base.as_ref().map(|t| t.words).unwrap_or(0);
        let chosen = if policy.force_ocr || base_words < policy.ocr_word_threshold {
            self.try_recognition(&bytes, policy, base).await
        } else {
            base
        };

        match chosen {
            Some(text) if text.words >= policy.min_words => {
                tracing::info!(
                    origin = %text.origin,
                    words = text.words,
                    "text extraction succeeded"
                );
                Ok(text)
            }
            Some(text) => Err(ExtractionError::InsufficientText {
                words: text.words,
                required: policy.min_words,
            }),
            None => Err(ExtractionError::InsufficientText {
                words: 0,
                required: policy.min_words,
            }),
        }
    }

    async fn run_strategies(
        &self,
        bytes: Arc<Vec<u8>>,
        min_words: usize,
    ) -> Result<Option<ExtractedText>, ExtractionError> {
        let strategies = self.strategies.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut best: Option<ExtractedText> = None;
            for strategy in strategies.iter() {
                let Some(raw) = strategy.try_extract(&bytes) else {
                    tracing::debug!(origin = %strategy.origin(), "strategy produced nothing");
                    continue;
                };
                let candidate = ExtractedText::new(&raw, strategy.origin());
                tracing::debug!(
                    origin = %candidate.origin,
                    words = candidate.words,
                    "strategy produced candidate"
                );
                if candidate.words >= min_words {
                    return Some(candidate);
                }
                if best.as_ref().map(|b| b.words).unwrap_or(0) < candidate.words {
                    best = Some(candidate);
                }
            }
            best
        })
        .await
        .map_err(|e| anyhow::anyhow!("extraction task failed: {e}"))?;

        Ok(result)
    }

    /// Optical recognition over rendered pages. The recognized text replaces
    /// the parser candidate when it is materially (>10%) longer; otherwise
    /// the longer of the two is kept. A recognition failure keeps the parser
    /// candidate.
    async fn try_recognition(
        &self,
        bytes: &Arc<Vec<u8>>,
        policy: &ExtractionPolicy,
        base: Option<ExtractedText>,
    ) -> Option<ExtractedText> {
        let Some(engine) = &self.ocr else {
            return base;
        };

        let pages = match engine.recognize(bytes, policy.ocr_max_pages).await {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!(error = %e, "optical recognition failed, keeping parser output");
                return base;
            }
        };

        // "Materially longer (>10%) wins, otherwise keep the longer of the
        // two" collapses to a plain length comparison; length is a proxy for
        // quality here, not a guarantee.
        let recognized = ExtractedText::new(&pages.join("\n"), TextOrigin::Recognition);
        match base {
            None => Some(recognized),
            Some(base) if recognized.words > base.words => Some(recognized),
            Some(base) => Some(base),
        }
    }
}
