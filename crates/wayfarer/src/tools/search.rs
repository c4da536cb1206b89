//! Web search: Google through the Serper API, and DuckDuckGo.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use wayfarer_core::tool::{Tool, ToolResult};

use super::{FetchError, read_text};

const SERPER_SEARCH_URL: &str = "https://google.serper.dev/search";
const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";
const SERPER_MAX_ORGANIC: usize = 10;
const DUCKDUCKGO_MAX_RESULTS: usize = 5;

/// A search engine answering with text ready for the model.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Searches `query` and formats the results.
    async fn search(&self, query: &str) -> Result<String, FetchError>;

    /// The engine name, for logging.
    fn name(&self) -> &'static str;
}

/// Google results through the Serper API.
#[derive(Clone)]
pub struct SerperBackend {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl SerperBackend {
    /// Creates a backend authenticated with `api_key`.
    #[inline]
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            endpoint: SERPER_SEARCH_URL.to_owned(),
        }
    }

    /// Sends the searches to `endpoint` instead of `google.serper.dev`.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchBackend for SerperBackend {
    async fn search(&self, query: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query, "num": SERPER_MAX_ORGANIC }))
            .send()
            .await?;
        let body = read_text(resp).await?;
        let results = serde_json::from_str::<SerperResponse>(&body)
            .map_err(|err| FetchError::Parse(err.to_string()))?;
        Ok(results.summarize())
    }

    fn name(&self) -> &'static str {
        "serper"
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SerperResponse {
    answer_box: Option<AnswerBox>,
    knowledge_graph: Option<KnowledgeGraph>,
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerBox {
    answer: Option<String>,
    snippet: Option<String>,
    snippet_highlighted: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct KnowledgeGraph {
    title: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    description: Option<String>,
    #[serde(default)]
    attributes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    snippet: Option<String>,
    #[serde(default)]
    attributes: Map<String, Value>,
}

impl SerperResponse {
    /// Flattens the response into snippets, most direct answer first.
    ///
    /// An answer box short-circuits everything else since it answers the
    /// query directly.
    fn summarize(&self) -> String {
        if let Some(answer_box) = &self.answer_box {
            let direct = answer_box
                .answer
                .clone()
                .or_else(|| {
                    answer_box
                        .snippet
                        .as_ref()
                        .map(|snippet| snippet.replace('\n', " "))
                })
                .or_else(|| {
                    answer_box
                        .snippet_highlighted
                        .as_ref()
                        .map(|highlighted| highlighted.join(" "))
                });
            if let Some(direct) = direct {
                return direct;
            }
        }

        let mut snippets = Vec::new();
        if let Some(graph) = &self.knowledge_graph {
            let title = graph.title.as_deref().unwrap_or_default();
            if let Some(kind) = &graph.kind {
                snippets.push(format!("{title}: {kind}."));
            }
            if let Some(description) = &graph.description {
                snippets.push(description.clone());
            }
            for (attribute, value) in &graph.attributes {
                snippets.push(format!("{title} {attribute}: {}.", text(value)));
            }
        }
        for result in self.organic.iter().take(SERPER_MAX_ORGANIC) {
            if let Some(snippet) = &result.snippet {
                snippets.push(snippet.clone());
            }
            for (attribute, value) in &result.attributes {
                snippets.push(format!("{attribute}: {}.", text(value)));
            }
        }

        if snippets.is_empty() {
            "No good Google Search Result was found".to_owned()
        } else {
            snippets.join(" ")
        }
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// DuckDuckGo's HTML endpoint, which needs no API key.
#[derive(Clone)]
pub struct DuckDuckGoBackend {
    client: Client,
    endpoint: String,
}

impl DuckDuckGoBackend {
    /// Creates the backend.
    #[inline]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            endpoint: DUCKDUCKGO_HTML_URL.to_owned(),
        }
    }

    /// Fetches result pages from `endpoint` instead of DuckDuckGo.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    async fn search(&self, query: &str) -> Result<String, FetchError> {
        let url = Url::parse_with_params(&self.endpoint, &[("q", query)])
            .map_err(|err| FetchError::Parse(err.to_string()))?;
        let html = read_text(self.client.get(url).send().await?).await?;
        let results = extract_ddg_results(&html);
        if results.is_empty() {
            return Ok("No good DuckDuckGo Search Result was found".to_owned());
        }
        Ok(results.join("\n\n"))
    }

    fn name(&self) -> &'static str {
        "duckduckgo"
    }
}

/// Pulls title, snippet and URL of the first results out of a DuckDuckGo
/// HTML result page.
fn extract_ddg_results(html: &str) -> Vec<String> {
    let inner_text = |chunk: &str, class: &str| {
        chunk
            .split(class)
            .nth(1)
            .and_then(|s| s.split_once('>'))
            .and_then(|(_, s)| s.split("</a>").next())
            .map(|s| html_decode(&strip_tags(s)).trim().to_owned())
            .filter(|s| !s.is_empty())
    };

    html.split("result__body")
        .skip(1)
        .filter_map(|chunk| {
            let title = inner_text(chunk, "class=\"result__a\"")?;
            let snippet = inner_text(chunk, "class=\"result__snippet\"")
                .unwrap_or_default();
            let url = inner_text(chunk, "class=\"result__url\"")
                .unwrap_or_default();
            Some(format!("**{title}**\n{snippet}\nURL: {url}"))
        })
        .take(DUCKDUCKGO_MAX_RESULTS)
        .collect()
}

/// Removes inline markup such as the `<b>` around matched words.
fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn html_decode(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Input of the search tools.
#[derive(Deserialize, JsonSchema)]
pub struct SearchParameters {
    /// What to search for, e.g. "Dubai hotels price per night".
    query: String,
}

/// Attractions, restaurants and hotels from Google, falling back to
/// DuckDuckGo when no Serper key is configured.
pub struct GoogleSearchTool {
    serper: Option<Arc<dyn SearchBackend>>,
    fallback: Arc<dyn SearchBackend>,
    parameter_schema: Value,
}

impl GoogleSearchTool {
    /// Creates the tool.
    pub fn new(client: Client, serper_api_key: Option<String>) -> Self {
        let serper = serper_api_key.map(|key| {
            Arc::new(SerperBackend::new(client.clone(), key))
                as Arc<dyn SearchBackend>
        });
        Self::with_backends(serper, Arc::new(DuckDuckGoBackend::new(client)))
    }

    /// Creates the tool searching with `google`, or with `fallback` when
    /// there is no Google backend.
    pub fn with_backends(
        google: Option<Arc<dyn SearchBackend>>,
        fallback: Arc<dyn SearchBackend>,
    ) -> Self {
        Self {
            serper: google,
            fallback,
            parameter_schema: schema_for!(SearchParameters).to_value(),
        }
    }
}

impl Tool for GoogleSearchTool {
    type Input = SearchParameters;

    fn name(&self) -> &str {
        "search_google"
    }

    fn description(&self) -> &str {
        "Fetches details about attractions, restaurants, hotels, etc. from Google Serper API."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SearchParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let serper = self.serper.clone();
        let fallback = Arc::clone(&self.fallback);
        async move {
            let Some(serper) = serper else {
                debug!("no Serper key, searching with DuckDuckGo");
                return Ok(search_duck(fallback.as_ref(), &input.query).await);
            };
            match serper.search(&input.query).await {
                Ok(results) => Ok(results),
                Err(err) => {
                    warn!("{} search failed: {err}", serper.name());
                    Ok(format!(
                        "Google search unavailable, trying alternative search. Error: {err}"
                    ))
                }
            }
        }
    }
}

/// General web search through DuckDuckGo.
pub struct DuckSearchTool {
    backend: Arc<dyn SearchBackend>,
    parameter_schema: Value,
}

impl DuckSearchTool {
    /// Creates the tool.
    #[inline]
    pub fn new(client: Client) -> Self {
        Self::with_backend(Arc::new(DuckDuckGoBackend::new(client)))
    }

    /// Creates the tool on top of any search backend.
    #[inline]
    pub fn with_backend(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            parameter_schema: schema_for!(SearchParameters).to_value(),
        }
    }
}

impl Tool for DuckSearchTool {
    type Input = SearchParameters;

    fn name(&self) -> &str {
        "search_duck"
    }

    fn description(&self) -> &str {
        "Fetches details using DuckDuckGo search."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SearchParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let backend = Arc::clone(&self.backend);
        async move { Ok(search_duck(backend.as_ref(), &input.query).await) }
    }
}

async fn search_duck(backend: &dyn SearchBackend, query: &str) -> String {
    match backend.search(query).await {
        Ok(results) => results,
        Err(err) => {
            warn!("{} search failed: {err}", backend.name());
            format!("Search unavailable. Error: {err}")
        }
    }
}
