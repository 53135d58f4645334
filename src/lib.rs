//! SearchPlus: a chat plugin that answers trigger-prefixed messages by running a
//! Bing web search and handing the results to a generative model for a summary.
//!
//! The plugin is host-agnostic. A host feeds it an [`plugin::EventContext`] and
//! reads the reply back; the bundled binary does this for Discord.

/// Loading of the JSON plugin configuration.
pub mod config;
/// The event contract shared between the plugin and its host.
pub mod plugin;
/// The search-and-summarize pipeline.
pub mod relay;
/// Clients and helpers used by the relay.
pub mod utils;

pub use config::SearchPlusConfig;
pub use plugin::{EventAction, EventContext, Plugin, PluginInfo, Reply, ReplyKind};
pub use relay::{RelayError, RelayOutcome, SearchRelay};
