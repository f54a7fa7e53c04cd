use async_trait::async_trait;

/// Failure classification for one synthesis call. Transient failures are
/// worth retrying against the same provider; fatal ones are not (bad voice,
/// rejected input, auth).
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("transient synthesis failure: {0}")]
    Transient(String),

    #[error("synthesis failure: {0}")]
    Fatal(String),
}

/// A text-to-speech provider. One call turns a chunk of plain text into a
/// complete MP3 buffer under the provider's configured voice.
#[async_trait]
pub trait SpeechRepository: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn synthesize(&self, text: &str, voice_short_name: &str)
        -> Result<Vec<u8>, SpeechError>;
}

/// Split `text` into runs that each fit a provider's per-request character
/// limit, breaking on word boundaries. A single word longer than the limit
/// becomes its own run rather than being dropped.
pub fn split_for_limit(text: &str, max_chars: usize) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.len()
        } else {
            current.len() + 1 + word.len()
        };
        if needed > max_chars && !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_text_is_one_run() {
        assert_eq!(split_for_limit("hello world", 100), vec!["hello world"]);
    }

    #[test]
    fn runs_break_on_word_boundaries() {
        let runs = split_for_limit("aaaa bbbb cccc dddd", 9);
        assert_eq!(runs, vec!["aaaa bbbb", "cccc dddd"]);
    }

    #[test]
    fn oversized_word_becomes_its_own_run() {
        let runs = split_for_limit("short enormousword end", 7);
        assert_eq!(runs, vec!["short", "enormousword", "end"]);
    }

    #[test]
    fn empty_text_yields_no_runs() {
        assert!(split_for_limit("   ", 10).is_empty());
    }
}
