//! Plugin configuration, read once at startup from a JSON file.
//!
//! A missing file or a file that fails to parse is not fatal: the embedded
//! default configuration is used and a warning is logged. Keys missing from an
//! otherwise valid file take their individual defaults.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "SEARCH_PLUS_CONFIG";
/// Configuration file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
/// Environment fallback for the Bing subscription key.
pub const BING_KEY_ENV: &str = "BING_SUBSCRIPTION_KEY";

/// Name of the template used when a query does not select one.
pub const DEFAULT_TEMPLATE: &str = "default";

pub const DEFAULT_SEARCH_URL: &str = "https://api.bing.microsoft.com/v7.0/search";

const DEFAULT_PROMPT: &str = "请对以下搜索结果进行分析和总结：

当前时间（{timezone}）：{current_time}
搜索结果：
{search_results}

要求：
1. 重点关注信息的时效性，标注信息的发布时间
2. 如果是实时数据（如股票价格），请明确标注数据的时间点
3. 如果发现信息可能过时，请在总结中提醒用户
4. 按照时间顺序组织信息，最新的信息放在前面
5. 如果不同来源的数据有冲突，请标注出来并说明可能的原因
6. 将所有时间都转换为{timezone}时间显示

总结：";

const NEWS_PROMPT: &str = "请对以下新闻搜索结果进行分析和总结：

当前时间（{timezone}）：{current_time}
新闻搜索结果：
{search_results}

要求：
1. 重点关注新闻的时效性，标注新闻的发布时间
2. 如果是实时新闻，请明确标注新闻的时间点
3. 如果发现新闻可能过时，请在总结中提醒用户
4. 按照时间顺序组织新闻，最新的新闻放在前面
5. 如果不同来源的新闻有冲突，请标注出来并说明可能的原因
6. 将所有时间都转换为{timezone}时间显示

总结：";

const FINANCE_PROMPT: &str = "请从以下搜索结果中提取股票指数相关的具体数据：

搜索结果：
{search_results}

当前时间（{timezone}）：{current_time}

请按以下格式提取信息：
1. 股票指数名称和数值（如：上证指数 3000点）
2. 涨跌幅
3. 成交量/成交额（如有）
4. 数据时间
5. 数据来源

注意事项：
- 优先提取最新的数据
- 必须包含具体的数字
- 如果数据不是今天的，请特别说明
- 如果找不到具体数据，请直接说明\"未找到具体的股票数据\"";

/// Errors raised while reading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Unable to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON.
    #[error("Unable to parse config file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The plugin's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchPlusConfig {
    /// Bing Web Search subscription key. May be empty, in which case searches fail at request time.
    pub bing_subscription_key: String,
    /// Number of results requested from Bing.
    pub search_count: u32,
    /// Trigger prefixes, checked in order.
    pub prefix: Vec<String>,
    /// Named prompt templates with `{timezone}`, `{current_time}` and `{search_results}` placeholders.
    pub prompts: BTreeMap<String, String>,
    /// Output token budget handed to the model.
    pub max_tokens: u32,
    /// IANA name of the zone timestamps are displayed in.
    pub timezone: String,
    /// Bing market code.
    pub market: String,
    /// Bing Web Search endpoint.
    pub search_url: String,
}

impl Default for SearchPlusConfig {
    fn default() -> Self {
        let prompts = [
            (DEFAULT_TEMPLATE, DEFAULT_PROMPT),
            ("news", NEWS_PROMPT),
            ("finance", FINANCE_PROMPT),
        ]
        .into_iter()
        .map(|(name, template)| (name.to_string(), template.to_string()))
        .collect();

        Self {
            bing_subscription_key: String::new(),
            search_count: 5,
            prefix: vec!["搜索".to_string(), "search".to_string()],
            prompts,
            max_tokens: 800,
            timezone: "Asia/Shanghai".to_string(),
            market: "zh-CN".to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
        }
    }
}

impl SearchPlusConfig {
    /// Reads the configuration from `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Loads the configuration the way the plugin does at startup: the file named
    /// by `SEARCH_PLUS_CONFIG` (or `config.json`), falling back to the defaults,
    /// with the Bing key taken from the environment when the file leaves it empty.
    pub fn load() -> Self {
        let path = env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let config = Self::load_from(&path).with_env_key(env::var(BING_KEY_ENV).ok());

        if config.bing_subscription_key.is_empty() {
            warn!("No Bing subscription key found, searches will fail until one is configured");
        }

        config
    }

    /// Loads from `path`, logging and falling back to the defaults on any problem.
    pub fn load_from(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(Some(config)) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Ok(None) => {
                warn!(
                    "No config found at {}, using default config",
                    path.display()
                );
                Self::default()
            }
            Err(e) => {
                error!("Error loading config: {}", e);
                Self::default()
            }
        }
    }

    /// Fills an empty subscription key from `key`.
    pub fn with_env_key(mut self, key: Option<String>) -> Self {
        if self.bing_subscription_key.is_empty() {
            if let Some(key) = key.filter(|k| !k.is_empty()) {
                debug!("Using Bing subscription key from {}", BING_KEY_ENV);
                self.bing_subscription_key = key;
            }
        }
        self
    }

    /// Looks up a prompt template by name.
    pub fn template(&self, name: &str) -> Option<&str> {
        self.prompts.get(name).map(String::as_str)
    }

    /// The template used when the query does not name one.
    ///
    /// A configuration that drops `default` from its prompts still gets the built-in one.
    pub fn default_template(&self) -> &str {
        self.template(DEFAULT_TEMPLATE).unwrap_or(DEFAULT_PROMPT)
    }
}
