use serde::{Deserialize, Serialize};

use crate::config::SearchSettings;
use crate::error::{Error, Result};

const TOOL_NAME: &str = "tavily_search_results_json";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    url: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct Snippet<'a> {
    url: &'a str,
    content: &'a str,
}

/// Web search against the Tavily API.
#[derive(Clone)]
pub struct TavilySearch {
    base_url: String,
    api_key: String,
    max_results: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for TavilySearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilySearch")
            .field("base_url", &self.base_url)
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl TavilySearch {
    pub fn new(settings: &SearchSettings, api_key: String, client: reqwest::Client) -> Self {
        TavilySearch {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            max_results: settings.max_results,
            client,
        }
    }

    /// Returns the hits as a JSON array of `{url, content}` objects.
    pub async fn run(&self, query: &str) -> Result<String> {
        self.search(query)
            .await
            .map_err(|e| Error::tool(TOOL_NAME, format!("{:#}", e)))
    }

    async fn search(&self, query: &str) -> anyhow::Result<String> {
        let request = SearchRequest {
            query,
            max_results: self.max_results,
            search_depth: "advanced",
        };

        tracing::debug!(query, "searching");
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Tavily API error: {} {}", status, body.trim()));
        }

        let response: SearchResponse = response.json().await?;
        tracing::debug!(hits = response.results.len(), "search finished");

        let snippets: Vec<Snippet> = response
            .results
            .iter()
            .map(|hit| Snippet {
                url: &hit.url,
                content: &hit.content,
            })
            .collect();
        Ok(serde_json::to_string(&snippets)?)
    }
}
