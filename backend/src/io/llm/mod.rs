//! Clients for hosted language models.

pub mod gemini_client;

pub use gemini_client::GeminiClient;
