//! The contract between a host and its plugins.
//!
//! The host wraps each inbound message in an [`EventContext`] and hands it to
//! its plugins in priority order. A plugin that takes the message sets a
//! [`Reply`] and switches the action to [`EventAction::BreakPass`], after which
//! the host stops offering the message to other plugins and sends the reply.

use async_trait::async_trait;

/// What the host should do with an event once a plugin has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventAction {
    /// Not handled; keep offering it to other plugins.
    #[default]
    Continue,
    /// Fully handled; send the reply and skip the remaining plugins.
    BreakPass,
}

/// The kind of reply a plugin produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Text,
    Error,
}

/// A reply for the host to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub content: String,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Text,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Error,
            content: content.into(),
        }
    }
}

/// One inbound message as seen by the plugins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventContext {
    /// The message text.
    pub content: String,
    /// Set by the plugin that handles the message.
    pub reply: Option<Reply>,
    pub action: EventAction,
}

impl EventContext {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Sets the reply and marks the event as fully handled.
    pub fn finish(&mut self, reply: Reply) {
        self.reply = Some(reply);
        self.action = EventAction::BreakPass;
    }

    pub fn is_handled(&self) -> bool {
        self.action == EventAction::BreakPass
    }
}

/// Registration metadata for a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub author: &'static str,
    /// Higher priorities see events first.
    pub priority: i32,
}

/// A message handler the host can register.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn info(&self) -> PluginInfo;

    /// Human-readable usage text.
    fn help_text(&self) -> String;

    /// Offered every inbound message. Leaving `ctx` untouched passes the message on.
    async fn on_handle_context(&self, ctx: &mut EventContext);
}

/// Offers `ctx` to each plugin, highest priority first, until one handles it.
pub async fn dispatch(plugins: &[std::sync::Arc<dyn Plugin>], ctx: &mut EventContext) {
    let mut ordered: Vec<_> = plugins.iter().collect();
    ordered.sort_by_key(|p| std::cmp::Reverse(p.info().priority));

    for plugin in ordered {
        plugin.on_handle_context(ctx).await;
        if ctx.is_handled() {
            tracing::debug!("Event handled by plugin {}", plugin.info().name);
            break;
        }
    }
}
