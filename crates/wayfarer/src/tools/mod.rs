//! The tools available to the travel agent.

mod arithmetic;
mod python_repl;
mod search;
mod weather;
mod youtube;

use std::fmt::{self, Display};
use std::time::Duration;

use reqwest::{Client, StatusCode};

pub use arithmetic::{ArithmeticTool, Operation};
pub use python_repl::PythonReplTool;
pub use search::{
    DuckDuckGoBackend, DuckSearchTool, GoogleSearchTool, SearchBackend,
    SerperBackend,
};
pub use weather::WeatherTool;
pub use youtube::YouTubeSearchTool;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0 Safari/537.36";

/// Builds the HTTP client shared by the network tools.
pub fn http_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(20))
        .build()
}

/// Failure of an outbound API call made by a tool.
#[derive(Debug)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    Http(reqwest::Error),
    /// The service answered with an error status.
    Status(StatusCode, String),
    /// The body is not what the service should return.
    Parse(String),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(err) => write!(f, "{err}"),
            FetchError::Status(status, message) if message.is_empty() => {
                write!(f, "{status}")
            }
            FetchError::Status(status, message) => {
                write!(f, "{status}: {message}")
            }
            FetchError::Parse(message) => {
                write!(f, "unexpected response: {message}")
            }
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    #[inline]
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err)
    }
}

/// Returns the body of a successful response as text.
async fn read_text(resp: reqwest::Response) -> Result<String, FetchError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        let message = body.trim().chars().take(200).collect();
        return Err(FetchError::Status(status, message));
    }
    Ok(body)
}
