//! Pure chunk planning: partitions a word sequence into contiguous chunks
//! sized for narration, before any synthesis happens.

/// Tuning knobs for the planner. Word targets derive from the speaking rate
/// and the wanted duration per chunk; the byte cap guards against provider
/// and storage limits on a single object.
#[derive(Debug, Clone)]
pub struct PlannerParams {
    /// Narration speaking rate used for duration estimates.
    pub words_per_second: f64,
    /// Wanted audio duration of one chunk.
    pub target_seconds: f64,
    /// Hard cap on the estimated encoded size of one chunk.
    pub max_bytes_per_chunk: usize,
    /// Encoded audio rate, 48 kbps MP3.
    pub estimated_bytes_per_second: f64,
}

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            words_per_second: 2.7,
            target_seconds: 60.0,
            max_bytes_per_chunk: 40 * 1024 * 1024,
            estimated_bytes_per_second: 6000.0,
        }
    }
}

impl PlannerParams {
    pub fn target_words(&self) -> usize {
        ((self.words_per_second * self.target_seconds).round() as usize).max(40)
    }

    pub fn min_words(&self) -> usize {
        ((self.words_per_second * self.target_seconds * 0.5).round() as usize).max(20)
    }

    pub fn max_words(&self) -> usize {
        ((self.words_per_second * self.target_seconds * 1.5).round() as usize)
            .max(self.min_words() + 20)
    }

    fn estimated_bytes(&self, word_count: usize) -> f64 {
        word_count as f64 / self.words_per_second * self.estimated_bytes_per_second
    }
}

/// One planned chunk. Word indices are inclusive positions into the input
/// word sequence; `text` is the words rejoined with single spaces.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedChunk {
    /// 1-based.
    pub index: usize,
    pub start_word: usize,
    /// Inclusive.
    pub end_word: usize,
    pub text: String,
    pub estimated_seconds: f64,
}

const SNAP_PUNCTUATION: [char; 6] = ['.', '!', '?', ';', ':', ','];

fn ends_at_clause(word: &str) -> bool {
    word.ends_with(SNAP_PUNCTUATION)
}

/// Partition `words` into contiguous chunks. Every word lands in exactly one
/// chunk, chunk boundaries prefer clause-ending punctuation in the window
/// between the target and `max_words`, and estimated encoded size stays
/// under the byte cap except when honoring it would drop a chunk below the
/// minimum word count.
pub fn plan(words: &[&str], params: &PlannerParams) -> Vec<PlannedChunk> {
    let target = params.target_words();
    let min = params.min_words();
    let max = params.max_words();

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < words.len() {
        // `end` is exclusive while planning, inclusive in the output.
        let mut end = (start + target).min(words.len());

        if end < words.len() {
            end = snap_to_punctuation(words, start, end, max);
            if end < start + min {
                end = (start + min).min(words.len());
            }
        }

        // Halve toward the start while the size estimate exceeds the cap.
        // The minimum word count wins over the cap at the floor.
        while params.estimated_bytes(end - start) > params.max_bytes_per_chunk as f64
            && end > start + min
        {
            end = (start + end) / 2;
        }

        let text = words[start..end].join(" ");
        chunks.push(PlannedChunk {
            index: chunks.len() + 1,
            start_word: start,
            end_word: end - 1,
            text,
            estimated_seconds: (end - start) as f64 / params.words_per_second,
        });
        start = end;
    }

    chunks
}

/// Prefer a boundary right after clause-ending punctuation: scan forward
/// from the target up to the window's end. Without punctuation in the
/// window the target stands.
fn snap_to_punctuation(words: &[&str], start: usize, end: usize, max_words: usize) -> usize {
    let window_end = (start + max_words).min(words.len());
    for candidate in end..window_end {
        if ends_at_clause(words[candidate]) {
            return candidate + 1;
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn word_vec(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("w{i}")).collect()
    }

    fn as_refs(words: &[String]) -> Vec<&str> {
        words.iter().map(String::as_str).collect()
    }

    #[test]
    fn derived_word_targets_match_speaking_rate() {
        let params = PlannerParams::default();
        assert_eq!(params.target_words(), 162);
        assert_eq!(params.min_words(), 81);
        assert_eq!(params.max_words(), 243);
    }

    #[test]
    fn word_targets_never_fall_below_floors() {
        let params = PlannerParams {
            words_per_second: 0.1,
            target_seconds: 10.0,
            ..PlannerParams::default()
        };
        assert_eq!(params.target_words(), 40);
        assert_eq!(params.min_words(), 20);
        assert_eq!(params.max_words(), 40);
    }

    #[test]
    fn chunks_partition_the_words_exactly() {
        let words = word_vec(1000);
        let chunks = plan(&as_refs(&words), &PlannerParams::default());

        assert_eq!(chunks[0].start_word, 0);
        assert_eq!(chunks.last().unwrap().end_word, 999);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start_word, pair[0].end_word + 1);
            assert_eq!(pair[1].index, pair[0].index + 1);
        }
        let total: usize = chunks
            .iter()
            .map(|c| c.end_word - c.start_word + 1)
            .sum();
        assert_eq!(total, 1000);
    }

    #[test]
    fn short_input_becomes_a_single_chunk() {
        let words = word_vec(130);
        let chunks = plan(&as_refs(&words), &PlannerParams::default());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 1);
        assert_eq!(chunks[0].start_word, 0);
        assert_eq!(chunks[0].end_word, 129);
        assert!((chunks[0].estimated_seconds - 130.0 / 2.7).abs() < 1e-9);
    }

    #[test]
    fn empty_input_plans_nothing() {
        assert!(plan(&[], &PlannerParams::default()).is_empty());
    }

    #[test]
    fn boundary_snaps_forward_to_punctuation() {
        // Sentence end a few words past the 162-word target.
        let mut words = word_vec(400);
        words[170] = "sentence.".to_string();
        let chunks = plan(&as_refs(&words), &PlannerParams::default());

        assert_eq!(chunks[0].end_word, 170);
        assert!(chunks[0].text.ends_with("sentence."));
        assert_eq!(chunks[1].start_word, 171);
    }

    #[test]
    fn boundary_stays_at_target_when_window_has_no_punctuation() {
        let mut words = word_vec(400);
        // Punctuation before the target does not attract the boundary;
        // only the forward window is scanned.
        words[150] = "clause,".to_string();
        let chunks = plan(&as_refs(&words), &PlannerParams::default());

        assert_eq!(chunks[0].end_word, 161);
    }

    #[test]
    fn byte_cap_halves_oversized_chunks() {
        // Cap allows roughly 45 words per chunk, far below the target.
        let params = PlannerParams {
            max_bytes_per_chunk: 100_000,
            ..PlannerParams::default()
        };
        let words = word_vec(1000);
        let chunks = plan(&as_refs(&words), &params);

        for chunk in &chunks {
            let chunk_words = chunk.end_word - chunk.start_word + 1;
            let est = chunk_words as f64 / params.words_per_second
                * params.estimated_bytes_per_second;
            // Either under the cap or pinned at the minimum word floor.
            assert!(
                est <= params.max_bytes_per_chunk as f64
                    || chunk_words <= params.min_words() + 1,
                "chunk {} has {} words (~{} bytes)",
                chunk.index,
                chunk_words,
                est as usize
            );
        }
        assert_eq!(chunks.last().unwrap().end_word, 999);
    }
}
