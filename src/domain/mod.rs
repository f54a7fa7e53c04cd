pub mod audio;
pub mod catalog;
pub mod extraction;
