//! This module aggregates various utility submodules used by the relay and the bot.

/// Utilities for interacting with the Bing Web Search API.
pub mod bing;
/// Splitting long replies to fit a host's message limit.
pub mod chunk;
/// Generative-model backends (Gemini, Ollama).
pub mod summarizer;
/// UTC to local timestamp conversion.
pub mod time;
