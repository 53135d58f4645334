//! Sample Bing and Gemini payloads used across the integration tests.

use serde_json::{Value, json};

/// Sample trigger message from the search scenario.
pub const SAMPLE_MESSAGE_CONTENT: &str = "搜索 上证指数";

/// The query Bing should receive for [`SAMPLE_MESSAGE_CONTENT`].
pub const SAMPLE_QUERY: &str = "上证指数";

pub const BING_KEY: &str = "test-bing-key";
pub const GEMINI_KEY: &str = "test-gemini-key";

/// One news item published at 2024-01-01 03:00 UTC.
pub fn single_news_response() -> Value {
    json!({
        "_type": "SearchResponse",
        "news": {
            "value": [{
                "name": "上证指数收涨0.5%",
                "description": "沪指收报2975点",
                "datePublished": "2024-01-01T03:00:00Z",
                "provider": [{"_type": "Organization", "name": "新华社"}]
            }]
        }
    })
}

/// Five web pages, more than the relay will use.
pub fn many_pages_response() -> Value {
    let pages: Vec<Value> = (1..=5)
        .map(|i| {
            json!({
                "name": format!("Page {}", i),
                "snippet": format!("Snippet {}", i),
                "dateLastCrawled": "2024-01-01T00:00:00.0000000Z"
            })
        })
        .collect();
    json!({"webPages": {"value": pages}})
}

pub fn empty_response() -> Value {
    json!({"_type": "SearchResponse", "queryContext": {"originalQuery": "nothing"}})
}

pub fn gemini_text(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"parts": [{"text": text}], "role": "model"},
            "finishReason": "STOP"
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_data() {
        assert!(SAMPLE_MESSAGE_CONTENT.ends_with(SAMPLE_QUERY));
        assert!(single_news_response()["news"]["value"].is_array());
    }
}
