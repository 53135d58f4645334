//! Common test utilities: tracing setup and a relay wired to mock Bing and Gemini servers.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::{Arc, Once};

use search_plus::SearchPlusConfig;
use search_plus::SearchRelay;
use search_plus::utils::summarizer::GeminiSummarizer;
use serde_json::Value;
use tracing::Level;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fixtures::{BING_KEY, GEMINI_KEY};

static INIT: Once = Once::new();

/// Initialize test logging once per test binary.
pub fn init() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .init();
    });
}

pub const BING_PATH: &str = "/v7.0/search";
pub const GEMINI_PATH: &str = "/v1beta/models/gemini-pro:generateContent";

/// Mock Bing and Gemini endpoints plus a relay pointed at them.
pub struct Harness {
    pub bing: MockServer,
    pub gemini: MockServer,
    pub relay: SearchRelay,
}

impl Harness {
    pub async fn start() -> Self {
        Self::with_config(SearchPlusConfig::default()).await
    }

    pub async fn with_config(config: SearchPlusConfig) -> Self {
        init();
        let bing = MockServer::start().await;
        let gemini = MockServer::start().await;

        let config = SearchPlusConfig {
            bing_subscription_key: BING_KEY.to_string(),
            search_url: format!("{}{}", bing.uri(), BING_PATH),
            ..config
        };
        let summarizer = GeminiSummarizer::new(gemini.uri(), GEMINI_KEY, "gemini-pro");
        let relay = SearchRelay::new(config, Arc::new(summarizer));

        Self {
            bing,
            gemini,
            relay,
        }
    }

    pub async fn bing_responds(&self, status: u16, body: Value) {
        Mock::given(method("GET"))
            .and(path(BING_PATH))
            .and(header("Ocp-Apim-Subscription-Key", BING_KEY))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .expect(1)
            .mount(&self.bing)
            .await;
    }

    pub async fn gemini_responds(&self, body: Value, times: u64) {
        Mock::given(method("POST"))
            .and(path(GEMINI_PATH))
            .and(header("x-goog-api-key", GEMINI_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(times)
            .mount(&self.gemini)
            .await;
    }

    pub async fn verify(&self) {
        self.bing.verify().await;
        self.gemini.verify().await;
    }

    /// The prompt text of every request Gemini received.
    pub async fn prompts(&self) -> Vec<String> {
        self.gemini
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
            .filter_map(|body| {
                body["contents"][0]["parts"][0]["text"]
                    .as_str()
                    .map(str::to_string)
            })
            .collect()
    }
}
