pub mod catalog_repository;
pub mod manifest_repository;
pub mod openai_speech_repository;
pub mod polly_speech_repository;
pub mod speech_repository;

pub use catalog_repository::{CatalogRepository, PostgresCatalogRepository};
pub use manifest_repository::ManifestRepository;
pub use openai_speech_repository::OpenAiSpeechRepository;
pub use polly_speech_repository::PollySpeechRepository;
pub use speech_repository::{split_for_limit, SpeechError, SpeechRepository};
