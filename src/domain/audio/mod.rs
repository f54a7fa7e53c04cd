pub mod error;
pub mod planner;
pub mod service;
pub mod synthesis;

pub use error::AudioServiceError;
pub use planner::{plan, PlannedChunk, PlannerParams};
pub use service::{
    AudioService, AudioServiceApi, GenerationOutcome, GenerationSettings, StoredText,
};
pub use synthesis::{RetryPolicy, SynthesisConfig, SynthesisOrchestrator};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// Durable description of the chunk set generated for one
/// `(document, voice)` pairing. Written atomically after every chunk of a
/// run has been synthesized and uploaded; also the resume index.
///
/// Unknown fields added under newer schema versions are ignored on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema_version: u32,
    pub document_id: i64,
    pub voice_id: i64,
    pub voice_short_name: String,
    pub created_at: DateTime<Utc>,
    pub total_chunks: usize,
    pub total_words: usize,
    pub synthesis_parameters: SynthesisParameters,
    pub estimated_total_duration_seconds: f64,
    /// Sorted by `index`, contiguous from 1.
    pub chunks: Vec<ManifestChunk>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisParameters {
    pub words_per_second: f64,
    pub target_seconds: f64,
    pub format_kbps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestChunk {
    /// 1-based, contiguous.
    pub index: usize,
    pub file_name: String,
    pub url: String,
    pub start_word: usize,
    /// Inclusive.
    pub end_word: usize,
    pub file_size_bytes: usize,
    pub estimated_duration_seconds: f64,
}

impl Manifest {
    /// Resume mapper: position (into the index-sorted `chunks` array) of
    /// the chunk whose word range contains `word_offset`. Out-of-range
    /// offsets map to 0, the start of the work. Pure; usable client-side
    /// once the manifest has been fetched.
    pub fn locate(&self, word_offset: i64) -> usize {
        if word_offset < 0 {
            return 0;
        }
        let offset = word_offset as usize;
        self.chunks
            .iter()
            .position(|chunk| offset >= chunk.start_word && offset <= chunk.end_word)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn manifest_with_ranges(ranges: &[(usize, usize)]) -> Manifest {
        let chunks: Vec<ManifestChunk> = ranges
            .iter()
            .enumerate()
            .map(|(i, &(start_word, end_word))| ManifestChunk {
                index: i + 1,
                file_name: format!("chunk-{:03}.mp3", i + 1),
                url: format!("memory://book-audio/7/3/chunk-{:03}.mp3", i + 1),
                start_word,
                end_word,
                file_size_bytes: 4096,
                estimated_duration_seconds: 60.0,
            })
            .collect();
        let total_words = ranges.last().map(|&(_, end)| end + 1).unwrap_or(0);
        Manifest {
            schema_version: MANIFEST_SCHEMA_VERSION,
            document_id: 7,
            voice_id: 3,
            voice_short_name: "es-CO-GonzaloNeural".into(),
            created_at: Utc::now(),
            total_chunks: chunks.len(),
            total_words,
            synthesis_parameters: SynthesisParameters {
                words_per_second: 2.7,
                target_seconds: 60.0,
                format_kbps: 48,
            },
            estimated_total_duration_seconds: 60.0 * chunks.len() as f64,
            chunks,
        }
    }

    #[test]
    fn locate_finds_containing_chunk() {
        let manifest = manifest_with_ranges(&[(0, 161), (162, 330), (331, 499)]);
        assert_eq!(manifest.locate(200), 1);
    }

    #[test]
    fn locate_includes_both_edge_words() {
        let manifest = manifest_with_ranges(&[(0, 161), (162, 330), (331, 499)]);
        assert_eq!(manifest.locate(162), 1);
        assert_eq!(manifest.locate(330), 1);
        assert_eq!(manifest.locate(331), 2);
        assert_eq!(manifest.locate(0), 0);
        assert_eq!(manifest.locate(499), 2);
    }

    #[test]
    fn locate_defaults_to_start_for_out_of_range_offsets() {
        let manifest = manifest_with_ranges(&[(0, 161), (162, 330)]);
        assert_eq!(manifest.locate(-5), 0);
        assert_eq!(manifest.locate(331), 0);
        assert_eq!(manifest.locate(i64::MAX), 0);
    }

    #[test]
    fn manifest_json_ignores_unknown_fields() {
        let manifest = manifest_with_ranges(&[(0, 161)]);
        let mut value = serde_json::to_value(&manifest).unwrap();
        value["addedInSchemaVersion2"] = serde_json::json!({ "whatever": true });
        value["chunks"][0]["alsoNew"] = serde_json::json!(42);

        let reread: Manifest = serde_json::from_value(value).unwrap();
        assert_eq!(reread, manifest);
    }

    #[test]
    fn manifest_json_is_camel_case() {
        let manifest = manifest_with_ranges(&[(0, 161)]);
        let value = serde_json::to_value(&manifest).unwrap();
        assert!(value.get("schemaVersion").is_some());
        assert!(value.get("voiceShortName").is_some());
        assert!(value.get("synthesisParameters").is_some());
        assert!(value["chunks"][0].get("fileName").is_some());
        assert!(value["chunks"][0].get("fileSizeBytes").is_some());
    }
}
