pub mod content_guard;
pub mod inference;
pub mod markdown;
pub mod pdf;
pub mod sentence_cache;
