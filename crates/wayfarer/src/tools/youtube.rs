use reqwest::{Client, Url};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use wayfarer_core::tool::{Tool, ToolResult};

use super::{FetchError, read_text};

const RESULTS_URL: &str = "https://www.youtube.com/results";
const WATCH_MARKER: &str = "/watch?v=";
const VIDEO_ID_LEN: usize = 11;

fn default_max_results() -> usize {
    2
}

/// Input of [`YouTubeSearchTool`].
#[derive(Deserialize, JsonSchema)]
pub struct YouTubeSearchParameters {
    /// What to search for, e.g. "Goa travel guide".
    query: String,
    /// How many video links to return.
    #[serde(default = "default_max_results")]
    max_results: usize,
}

/// Links to YouTube videos about a destination.
pub struct YouTubeSearchTool {
    client: Client,
    endpoint: String,
    parameter_schema: Value,
}

impl YouTubeSearchTool {
    /// Creates the tool.
    #[inline]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            endpoint: RESULTS_URL.to_owned(),
            parameter_schema: schema_for!(YouTubeSearchParameters).to_value(),
        }
    }

    /// Fetches result pages from `endpoint` instead of YouTube.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Tool for YouTubeSearchTool {
    type Input = YouTubeSearchParameters;

    fn name(&self) -> &str {
        "youtube_search"
    }

    fn description(&self) -> &str {
        "Fetches YouTube videos about travel destinations."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: YouTubeSearchParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        async move {
            let found =
                search_videos(&client, &endpoint, &input.query, input.max_results)
                    .await;
            match found {
                Ok(urls) if urls.is_empty() => {
                    Ok(format!("No YouTube videos found for {}.", input.query))
                }
                Ok(urls) => Ok(urls.join("\n")),
                Err(err) => {
                    warn!("YouTube search failed: {err}");
                    Ok(format!("YouTube search unavailable. Error: {err}"))
                }
            }
        }
    }
}

async fn search_videos(
    client: &Client,
    endpoint: &str,
    query: &str,
    max_results: usize,
) -> Result<Vec<String>, FetchError> {
    let url = Url::parse_with_params(endpoint, &[("search_query", query)])
        .map_err(|err| FetchError::Parse(err.to_string()))?;
    let page = read_text(client.get(url).send().await?).await?;
    Ok(video_ids(&page, max_results)
        .into_iter()
        .map(|id| format!("https://www.youtube.com/watch?v={id}"))
        .collect())
}

/// Collects distinct video ids linked from a results page, in page order.
fn video_ids(page: &str, limit: usize) -> Vec<&str> {
    let is_id_char = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';

    let mut ids = Vec::new();
    for (pos, _) in page.match_indices(WATCH_MARKER) {
        if ids.len() >= limit {
            break;
        }
        let rest = &page[pos + WATCH_MARKER.len()..];
        let len = rest.find(|c: char| !is_id_char(c)).unwrap_or(rest.len());
        let id = &rest[..len];
        if id.len() == VIDEO_ID_LEN && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}
