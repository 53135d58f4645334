//! The search relay: trigger detection, Bing search, prompt assembly and
//! summarization, wired up as a [`Plugin`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::SearchPlusConfig;
use crate::plugin::{EventContext, Plugin, PluginInfo, Reply};
use crate::utils::bing::{BingClient, BingSearchError, format_search_results};
use crate::utils::summarizer::{Summarizer, SummarizerError, summarizer_from_env};
use crate::utils::time::{current_local_time, parse_timezone};

/// Reply when Bing returns nothing usable.
pub const NO_RESULTS_MESSAGE: &str = "抱歉，没有找到相关的搜索结果。";
/// Reply when the model produces no text.
pub const EMPTY_SUMMARY_MESSAGE: &str = "抱歉，生成摘要时出现错误。";
/// Prefix of every error reply.
pub const ERROR_PREFIX: &str = "搜索出错：";

/// Separates a template name from the keywords, as in `news#最新科技新闻`.
const TEMPLATE_SEPARATOR: char = '#';

#[derive(Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    Search(#[from] BingSearchError),

    #[error(transparent)]
    Summarize(#[from] SummarizerError),
}

/// How a single search request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The model's answer.
    Summary(String),
    /// The search returned neither news nor web pages; the model was not called.
    NoResults,
    /// The model answered with empty text.
    EmptySummary,
    /// Search or summarization failed with this message.
    Failed(String),
}

impl RelayOutcome {
    pub fn into_reply(self) -> Reply {
        match self {
            Self::Summary(text) => Reply::text(text),
            Self::NoResults => Reply::text(NO_RESULTS_MESSAGE),
            Self::EmptySummary => Reply::text(EMPTY_SUMMARY_MESSAGE),
            Self::Failed(message) => Reply::error(format!("{}{}", ERROR_PREFIX, message)),
        }
    }
}

/// Fills the `{timezone}`, `{current_time}` and `{search_results}` placeholders of a template.
pub fn build_prompt(
    template: &str,
    timezone: &str,
    current_time: &str,
    search_results: &str,
) -> String {
    template
        .replace("{timezone}", timezone)
        .replace("{current_time}", current_time)
        .replace("{search_results}", search_results)
}

/// The plugin. Built once at startup and shared by every request.
pub struct SearchRelay {
    config: SearchPlusConfig,
    tz: Tz,
    search: BingClient,
    summarizer: Arc<dyn Summarizer>,
}

impl SearchRelay {
    pub fn new(config: SearchPlusConfig, summarizer: Arc<dyn Summarizer>) -> Self {
        let tz = parse_timezone(&config.timezone);
        let search = BingClient::new(
            config.search_url.clone(),
            config.bing_subscription_key.clone(),
            config.search_count,
            config.market.clone(),
        );
        info!(
            "SearchPlus initialized with prefixes {:?} and timezone {}",
            config.prefix, tz
        );

        Self {
            config,
            tz,
            search,
            summarizer,
        }
    }

    /// Builds the relay from `config.json` and the environment.
    pub fn from_env() -> Self {
        Self::new(SearchPlusConfig::load(), summarizer_from_env())
    }

    pub fn config(&self) -> &SearchPlusConfig {
        &self.config
    }

    /// Returns the query if `content` starts with a trigger prefix.
    ///
    /// Prefixes are tried in configuration order and the first match wins.
    pub fn match_prefix<'a>(&self, content: &'a str) -> Option<&'a str> {
        self.config
            .prefix
            .iter()
            .find_map(|prefix| content.strip_prefix(prefix.as_str()))
            .map(str::trim)
    }

    /// Splits `type#keywords` into the named template and the keywords.
    ///
    /// Queries that do not name a configured template use the default template
    /// and are searched verbatim.
    pub fn select_template<'q>(&self, query: &'q str) -> (&str, &'q str) {
        if let Some((name, keywords)) = query.split_once(TEMPLATE_SEPARATOR) {
            let keywords = keywords.trim();
            if let Some(template) = self.config.template(name.trim()) {
                if !keywords.is_empty() {
                    debug!("Using prompt template {:?}", name.trim());
                    return (template, keywords);
                }
            }
        }

        (self.config.default_template(), query)
    }

    /// Runs the pipeline for `query`, propagating failures.
    pub async fn search_and_summarize(&self, query: &str) -> Result<RelayOutcome, RelayError> {
        let (template, keywords) = self.select_template(query);
        info!("Starting search for: {}", keywords);

        let current_time = current_local_time(&self.tz);
        debug!("Current local time: {}", current_time);

        let response = self.search.search(keywords).await?;
        let Some(results) = format_search_results(&response, &self.tz) else {
            info!("No search results for {:?}", keywords);
            return Ok(RelayOutcome::NoResults);
        };

        let prompt = build_prompt(template, self.tz.name(), &current_time, &results);
        let summary = self
            .summarizer
            .summarize(&prompt, self.config.max_tokens)
            .await?;

        if summary.trim().is_empty() {
            error!("Model returned an empty summary for {:?}", keywords);
            return Ok(RelayOutcome::EmptySummary);
        }

        Ok(RelayOutcome::Summary(summary))
    }

    /// Runs the pipeline for `query`, turning failures into [`RelayOutcome::Failed`].
    pub async fn relay(&self, query: &str) -> RelayOutcome {
        match self.search_and_summarize(query).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Search request for {:?} failed: {}", query, e);
                RelayOutcome::Failed(e.to_string())
            }
        }
    }
}

#[async_trait]
impl Plugin for SearchRelay {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: "SearchPlus",
            description: "Combines Bing search with a generative model for summarized search results",
            version: env!("CARGO_PKG_VERSION"),
            author: "田羊羽",
            priority: 800,
        }
    }

    fn help_text(&self) -> String {
        let triggers = self
            .config
            .prefix
            .iter()
            .map(|p| format!("'{} <关键词>'", p))
            .collect::<Vec<_>>()
            .join(" 或 ");
        let example_prefix = self.config.prefix.first().map_or("搜索", String::as_str);

        let mut help = String::from("🔍 搜索插件使用说明：\n\n");
        help.push_str("1. 基本搜索：\n");
        help.push_str(&format!("   发送：{}\n", triggers));
        help.push_str(&format!("   示例：'{} 今天上证指数收盘价'\n\n", example_prefix));

        help.push_str("2. 指定搜索类型：\n");
        help.push_str(&format!("   发送：'{} <类型>#<关键词>'\n", example_prefix));
        help.push_str("   支持的类型：\n");
        for name in self.config.prompts.keys() {
            help.push_str(&format!("   - {}\n", name));
        }
        help.push_str("\n   示例：\n");
        for name in self.config.prompts.keys().filter(|n| *n != "default").take(3) {
            help.push_str(&format!("   - '{} {}#人工智能发展'\n", example_prefix, name));
        }
        help.push('\n');

        help.push_str("3. 注意事项：\n");
        help.push_str(&format!("   - 所有时间都会自动转换为{}时间显示\n", self.tz));
        help.push_str("   - 搜索结果不限制时间范围\n");
        help.push_str("   - 如果不指定类型，将使用默认的搜索模式\n");

        help
    }

    async fn on_handle_context(&self, ctx: &mut EventContext) {
        if ctx.content.is_empty() {
            return;
        }

        let Some(query) = self.match_prefix(&ctx.content) else {
            return;
        };
        info!("Received search request: {}", ctx.content);

        if query.is_empty() {
            let help = self.help_text();
            ctx.finish(Reply::text(help));
            return;
        }

        let query = query.to_string();
        let outcome = self.relay(&query).await;
        ctx.finish(outcome.into_reply());
    }
}
