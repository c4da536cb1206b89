use reqwest::Client;
use wayfarer_core::{Agent, AgentBuilder, TranscriptSource};
use wayfarer_model::ModelProvider;
use wayfarer_openai_model::{OpenAIConfigBuilder, OpenAIProvider};

use crate::config::Settings;
use crate::demo::demo_response;
use crate::tools::{self, *};

const SYSTEM_PROMPT: &str = include_str!("./system_prompt.md");

/// Turns a travel query into an itinerary.
///
/// Without a configured model, or when the agent fails, the planner answers
/// with a demo itinerary instead of an error, so the page always has
/// something to show.
#[derive(Clone)]
pub struct Planner {
    agent: Option<Agent>,
}

impl Planner {
    /// Creates a planner backed by the OpenAI model in `settings`, or a
    /// demo planner when there is no usable API key.
    pub fn from_settings(settings: &Settings) -> Self {
        let Some(api_key) = &settings.openai_api_key else {
            info!("no OpenAI API key, serving demo itineraries");
            return Self::demo();
        };
        let client = match tools::http_client() {
            Ok(client) => client,
            Err(err) => {
                error!("failed to create the HTTP client for tools: {err}");
                return Self::demo();
            }
        };

        let config = OpenAIConfigBuilder::with_api_key(api_key.clone())
            .with_base_url(settings.openai_base_url.clone())
            .with_model(settings.openai_model.clone())
            .build();
        info!(model = config.model(), "travel agent is ready");
        let provider = OpenAIProvider::new(config);
        Self::with_agent(travel_agent(provider, client, settings))
    }

    /// Creates a planner that only serves demo itineraries.
    #[inline]
    pub fn demo() -> Self {
        Self { agent: None }
    }

    /// Creates a planner backed by `agent`.
    #[inline]
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent: Some(agent) }
    }

    /// Returns `true` if answers come from the demo text only.
    #[inline]
    pub fn is_demo(&self) -> bool {
        self.agent.is_none()
    }

    /// Plans a trip for `query`.
    pub async fn plan(&self, query: &str) -> String {
        let Some(agent) = &self.agent else {
            return demo_response(query).to_owned();
        };
        match agent.run(query).await {
            Ok(reply) => {
                info!(
                    steps = reply.steps,
                    tool_calls = reply.tool_calls,
                    "planned a trip"
                );
                reply.text
            }
            Err(err) => {
                error!("travel agent failed, answering with the demo: {err}");
                demo_response(query).to_owned()
            }
        }
    }
}

/// Assembles the travel agent: the system prompt and every travel tool.
///
/// `client` is shared by the network tools.
pub fn travel_agent<P: ModelProvider + 'static>(
    provider: P,
    client: Client,
    settings: &Settings,
) -> Agent {
    let mut builder = AgentBuilder::with_model_provider(provider)
        .with_system_prompt(SYSTEM_PROMPT)
        .on_transcript(|transcript, source| {
            if source == TranscriptSource::Tool {
                debug!("tool output: {transcript}");
            }
        });
    for operation in Operation::ALL {
        builder = builder.with_tool(ArithmeticTool::new(operation));
    }
    builder
        .with_tool(WeatherTool::new(
            client.clone(),
            settings.weather_api_key.clone(),
        ))
        .with_tool(GoogleSearchTool::new(
            client.clone(),
            settings.serper_api_key.clone(),
        ))
        .with_tool(DuckSearchTool::new(client.clone()))
        .with_tool(PythonReplTool::new(settings.python_bin.clone()))
        .with_tool(YouTubeSearchTool::new(client))
        .build()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wayfarer_model::{ModelMessage, ToolCallRequest};
    use wayfarer_test_model::{
        PresetEvent, PresetResponse, TestModelProvider,
    };

    use super::*;

    fn settings() -> Settings {
        Settings::from_lookup(|_| None).unwrap()
    }

    #[tokio::test]
    async fn test_demo_planner() {
        let planner = Planner::demo();
        assert!(planner.is_demo());
        let answer = planner.plan("Weekend in Dubai").await;
        assert!(answer.starts_with("## Weather Information"));
    }

    #[tokio::test]
    async fn test_agent_answers_with_tools() {
        let mut provider = TestModelProvider::default();
        provider.add_input_steps(2);
        provider.add_assistant_response_step(PresetResponse::with_events([
            PresetEvent::ToolCall(ToolCallRequest {
                id: "call_1".to_owned(),
                name: "multiply".to_owned(),
                arguments: json!({ "a": 450, "b": 3 }),
            }),
        ]));
        provider.add_input_step();
        provider.add_assistant_response_step(PresetResponse::with_events([
            PresetEvent::MessageDelta("## 💰 Cost Breakdown\n".to_owned()),
            PresetEvent::MessageDelta("Hotels: 1350 AED".to_owned()),
        ]));

        let agent = travel_agent(provider.clone(), Client::new(), &settings());
        let planner = Planner::with_agent(agent);
        let answer = planner.plan("3 nights in Dubai").await;
        assert_eq!(answer, "## 💰 Cost Breakdown\nHotels: 1350 AED");

        let requests = provider.received_requests();
        let tools = requests[0]
            .tools
            .iter()
            .map(|tool| tool.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            tools,
            [
                "addition",
                "division",
                "get_weather",
                "multiply",
                "python_repl",
                "search_duck",
                "search_google",
                "subtraction",
                "youtube_search",
            ]
        );
        assert!(matches!(
            &requests[0].messages[0],
            ModelMessage::System(prompt) if prompt.starts_with("You are a professional AI Travel Agent.")
        ));
        match &requests[1].messages[3] {
            ModelMessage::Tool(result) => assert_eq!(result.content, "1350"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_agent_failure_falls_back_to_demo() {
        let mut provider = TestModelProvider::default();
        provider.add_input_steps(2);
        provider.add_assistant_response_step(
            PresetResponse::with_events(Vec::new()).with_failures(0),
        );

        let agent = travel_agent(provider, Client::new(), &settings());
        let answer = Planner::with_agent(agent).plan("Goa in December").await;
        assert!(answer.ends_with("you need a valid OpenAI API key."));
    }
}
