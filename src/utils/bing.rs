//! Utilities for interacting with the Bing Web Search API.
//! The subscription key comes from the plugin configuration (or `BING_SUBSCRIPTION_KEY`).

use chrono_tz::Tz;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::utils::time::format_utc_to_local;

/// Header carrying the subscription key.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Items taken from each result category.
pub const MAX_ITEMS_PER_CATEGORY: usize = 3;

/// Shown when a news item has no provider.
pub const UNKNOWN_PROVIDER: &str = "未知来源";

/// Errors that can occur during Bing Search API interactions.
#[derive(Error, Debug)]
pub enum BingSearchError {
    /// Error during HTTP request communication, including non-2xx statuses.
    #[error("API communication failure: {0}")]
    Api(#[from] reqwest::Error),

    /// Error parsing the JSON response from the API.
    #[error("Unable to parse response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads an explicit `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The parts of a Bing Web Search response the plugin reads.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BingSearchResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news: Option<BingNews>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_pages: Option<BingWebPages>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BingNews {
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: Vec<BingNewsArticle>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BingWebPages {
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: Vec<BingWebPage>,
}

/// A single news article.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct BingNewsArticle {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    /// UTC publication time, e.g. `2024-01-01T03:00:00.0000000Z`.
    pub date_published: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub provider: Vec<BingProvider>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BingProvider {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

/// A single web page result.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct BingWebPage {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub snippet: String,
    /// UTC time Bing last crawled the page.
    pub date_last_crawled: Option<String>,
}

impl BingSearchResponse {
    pub fn news_items(&self) -> &[BingNewsArticle] {
        self.news.as_ref().map_or(&[], |n| n.value.as_slice())
    }

    pub fn web_items(&self) -> &[BingWebPage] {
        self.web_pages.as_ref().map_or(&[], |w| w.value.as_slice())
    }

    /// True when neither category carries an entry.
    pub fn is_empty(&self) -> bool {
        self.news_items().is_empty() && self.web_items().is_empty()
    }
}

/// Client for the Bing Web Search endpoint.
#[derive(Debug, Clone)]
pub struct BingClient {
    http: Client,
    endpoint: String,
    subscription_key: String,
    count: u32,
    market: String,
}

impl BingClient {
    pub fn new(
        endpoint: impl Into<String>,
        subscription_key: impl Into<String>,
        count: u32,
        market: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
            subscription_key: subscription_key.into(),
            count,
            market: market.into(),
        }
    }

    /// Performs a web search.
    ///
    /// # Arguments
    ///
    /// * `query` - The search query string.
    ///
    /// # Returns
    ///
    /// The decoded response, which may hold no results at all. Non-2xx statuses
    /// surface as [`BingSearchError::Api`].
    pub async fn search(&self, query: &str) -> Result<BingSearchResponse, BingSearchError> {
        info!("Searching Bing for {:?}", query);

        let count = self.count.to_string();
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("textDecorations", "true"),
                ("textFormat", "HTML"),
                ("mkt", self.market.as_str()),
            ])
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let search_response: BingSearchResponse = serde_json::from_str(&body)?;

        debug!(
            "Bing returned {} news and {} web results",
            search_response.news_items().len(),
            search_response.web_items().len()
        );

        Ok(search_response)
    }
}

/// Formats the top news and web results into the block handed to the model.
///
/// Returns `None` when the response has no entries in either category.
pub fn format_search_results(response: &BingSearchResponse, tz: &Tz) -> Option<String> {
    if response.is_empty() {
        return None;
    }

    let mut formatted = String::new();

    let news = response.news_items();
    if !news.is_empty() {
        formatted.push_str("最新新闻：\n\n");
        for (i, article) in news.iter().take(MAX_ITEMS_PER_CATEGORY).enumerate() {
            let published = article
                .date_published
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(|d| format_utc_to_local(d, tz))
                .unwrap_or_default();
            let provider = article
                .provider
                .first()
                .map_or(UNKNOWN_PROVIDER, |p| p.name.as_str());

            formatted.push_str(&format!(
                "{}. {}\n时间：{}\n来源：{}\n详情：{}\n\n",
                i + 1,
                article.name,
                published,
                provider,
                article.description
            ));
        }
    }

    let pages = response.web_items();
    if !pages.is_empty() {
        formatted.push_str("相关网页：\n\n");
        for (i, page) in pages.iter().take(MAX_ITEMS_PER_CATEGORY).enumerate() {
            formatted.push_str(&format!("{}. {}\n", i + 1, page.name));
            if let Some(crawled) = page.date_last_crawled.as_deref().filter(|d| !d.is_empty()) {
                formatted.push_str(&format!("更新时间：{}\n", format_utc_to_local(crawled, tz)));
            }
            formatted.push_str(&format!("详情：{}\n\n", page.snippet));
        }
    }

    Some(formatted)
}

/// Module containing tests for the Bing Search utility functions.
#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SHANGHAI: Tz = chrono_tz::Asia::Shanghai;

    fn article(n: usize) -> BingNewsArticle {
        BingNewsArticle {
            name: format!("News {}", n),
            description: format!("Story {}.", n),
            date_published: Some("2024-01-01T03:00:00.0000000Z".to_string()),
            provider: vec![BingProvider {
                name: format!("Agency {}", n),
            }],
        }
    }

    fn page(n: usize) -> BingWebPage {
        BingWebPage {
            name: format!("Page {}", n),
            snippet: format!("Snippet {}.", n),
            date_last_crawled: None,
        }
    }

    fn client_for(server: &MockServer, key: &str) -> BingClient {
        BingClient::new(format!("{}/v7.0/search", server.uri()), key, 5, "zh-CN")
    }

    #[test]
    fn test_deserialize_camel_case_response() {
        let body = json!({
            "_type": "SearchResponse",
            "news": {"value": [{
                "name": "上证指数收涨",
                "description": "沪指涨0.5%",
                "datePublished": "2024-01-01T03:00:00.0000000Z",
                "provider": [{"_type": "Organization", "name": "新华社"}]
            }]},
            "webPages": {"value": [{
                "name": "行情中心",
                "snippet": "实时行情",
                "dateLastCrawled": "2024-01-01T02:00:00.0000000Z",
                "url": "https://example.com"
            }]}
        });

        let response: BingSearchResponse = serde_json::from_value(body).unwrap();

        assert_eq!(response.news_items().len(), 1);
        assert_eq!(response.news_items()[0].provider[0].name, "新华社");
        assert_eq!(
            response.web_items()[0].date_last_crawled.as_deref(),
            Some("2024-01-01T02:00:00.0000000Z")
        );
    }

    #[test]
    fn test_null_fields_degrade_like_missing_ones() {
        let body = json!({
            "news": {"value": [{
                "name": "a",
                "description": null,
                "datePublished": null,
                "provider": null
            }]},
            "webPages": {"value": null}
        });

        let response: BingSearchResponse = serde_json::from_value(body).unwrap();

        assert_eq!(
            response.news_items(),
            &[BingNewsArticle {
                name: "a".to_string(),
                ..Default::default()
            }]
        );
        assert!(response.web_items().is_empty());

        let formatted = format_search_results(&response, &SHANGHAI).unwrap();
        assert!(formatted.contains("来源：未知来源\n"));
    }

    #[test]
    fn test_format_news_and_pages() {
        let mut crawled = page(1);
        crawled.date_last_crawled = Some("2024-01-01T00:00:00Z".to_string());
        let response = BingSearchResponse {
            news: Some(BingNews {
                value: vec![article(1)],
            }),
            web_pages: Some(BingWebPages {
                value: vec![crawled, page(2)],
            }),
        };

        let expected = "最新新闻：\n\n\
            1. News 1\n时间：2024-01-01 11:00:00\n来源：Agency 1\n详情：Story 1.\n\n\
            相关网页：\n\n\
            1. Page 1\n更新时间：2024-01-01 08:00:00\n详情：Snippet 1.\n\n\
            2. Page 2\n详情：Snippet 2.\n\n";

        assert_eq!(
            format_search_results(&response, &SHANGHAI).as_deref(),
            Some(expected)
        );
    }

    #[test]
    fn test_format_limits_each_category_to_three() {
        let response = BingSearchResponse {
            news: Some(BingNews {
                value: (1..=5).map(article).collect(),
            }),
            web_pages: Some(BingWebPages {
                value: (1..=5).map(page).collect(),
            }),
        };

        let formatted = format_search_results(&response, &SHANGHAI).unwrap();

        assert!(formatted.contains("3. News 3"));
        assert!(!formatted.contains("News 4"));
        assert!(formatted.contains("3. Page 3"));
        assert!(!formatted.contains("Page 4"));
        assert_eq!(formatted.matches("时间：2024-01-01 11:00:00").count(), 3);
    }

    #[test]
    fn test_format_missing_provider_and_bad_date() {
        let mut odd = article(1);
        odd.provider.clear();
        odd.date_published = Some("not a date".to_string());
        let response = BingSearchResponse {
            news: Some(BingNews { value: vec![odd] }),
            web_pages: None,
        };

        let formatted = format_search_results(&response, &SHANGHAI).unwrap();

        assert!(formatted.contains("来源：未知来源\n"));
        assert!(formatted.contains("时间：not a date\n"));
        assert!(!formatted.contains("相关网页"));
    }

    #[test]
    fn test_format_empty_collections_is_none() {
        let response = BingSearchResponse {
            news: Some(BingNews { value: vec![] }),
            web_pages: Some(BingWebPages { value: vec![] }),
        };

        assert_eq!(format_search_results(&response, &SHANGHAI), None);
        assert_eq!(
            format_search_results(&BingSearchResponse::default(), &SHANGHAI),
            None
        );
    }

    /// Tests the `search` function with a successful mock API response.
    #[tokio::test]
    async fn test_search_success() {
        let server = MockServer::start().await;
        let api_key = "test-api-key-success";
        let query = "上证指数";

        let body = json!({
            "webPages": {"value": [{"name": "Rust", "snippet": "A language."}]}
        });

        Mock::given(method("GET"))
            .and(path("/v7.0/search"))
            .and(query_param("q", query))
            .and(query_param("count", "5"))
            .and(query_param("textDecorations", "true"))
            .and(query_param("textFormat", "HTML"))
            .and(query_param("mkt", "zh-CN"))
            .and(header(SUBSCRIPTION_KEY_HEADER, api_key))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, api_key).search(query).await;

        assert!(result.is_ok(), "Search failed: {:?}", result.err());
        let response = result.unwrap();
        assert!(response.news_items().is_empty());
        assert_eq!(response.web_items()[0].name, "Rust");

        server.verify().await;
    }

    /// Tests the `search` function handling a non-2xx HTTP status code from the mock API.
    #[tokio::test]
    async fn test_search_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v7.0/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client_for(&server, "test-api-key-error")
            .search("error query")
            .await;

        match result.err().unwrap() {
            BingSearchError::Api(e) => {
                assert!(e.is_status());
                assert_eq!(
                    e.status().unwrap(),
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR
                );
            }
            e => panic!("Expected Api error, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_search_invalid_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v7.0/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let result = client_for(&server, "key").search("q").await;

        assert_matches!(result, Err(BingSearchError::Json(_)));
    }
}
