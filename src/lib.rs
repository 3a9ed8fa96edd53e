//! # Newsbrief
//!
//! A CLI application for news article summarisation using LLMs.
//!
//! ## Pipeline
//!
//! - **Fetch**: extract the article body from a URL, preferring semantic
//!   containers and discarding navigation noise
//! - **Clean**: normalise the text for display or into a lemmatised,
//!   stopword-free stream for the backend
//! - **Summarise**: style/length-conditioned prompt against Gemini, with a
//!   rate-limited fallback ladder across prompts, models and delivery modes

pub mod backend;
pub mod cleaner;
pub mod config;
pub mod fetcher;
pub mod summarizer;

pub use config::Config;
pub use summarizer::{SummaryLength, SummaryRequest, SummaryStyle};
