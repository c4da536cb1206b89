//! Runtime settings read from the environment.

use std::env;
use std::fmt::{self, Display};

use serde::Serialize;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_PYTHON_BIN: &str = "python3";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

const OPENAI_PLACEHOLDER: &str = "your_openai_api_key_here";
const SERPER_PLACEHOLDER: &str = "your_serper_api_key_here";
const WEATHER_PLACEHOLDER: &str = "your_openweathermap_api_key_here";

/// A configuration error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// `PORT` is not a valid port number.
    InvalidPort(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPort(value) => {
                write!(f, "PORT must be a number in 0..=65535, got {value:?}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Which external APIs have a usable key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApiStatus {
    /// The model is available, otherwise answers come from the demo text.
    pub openai: bool,
    /// Google search is available, otherwise DuckDuckGo is used.
    pub serper: bool,
    /// Weather lookups are available.
    pub weather: bool,
}

/// Settings of the travel agent server.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// `OPENAI_API_KEY`, `None` when unset or still the placeholder.
    pub openai_api_key: Option<String>,
    /// `OPENAI_BASE_URL`.
    pub openai_base_url: String,
    /// `OPENAI_MODEL`.
    pub openai_model: String,
    /// `SERPER_API_KEY`.
    pub serper_api_key: Option<String>,
    /// `OPENWEATHERMAP_API_KEY`.
    pub weather_api_key: Option<String>,
    /// `PYTHON_BIN`, the interpreter behind the `python_repl` tool.
    pub python_bin: String,
    /// `HOST`.
    pub host: String,
    /// `PORT`.
    pub port: u16,
}

impl Settings {
    /// Reads the settings from the process environment.
    ///
    /// Load a `.env` file with `dotenvy` first if it should be honored.
    #[inline]
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the settings through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str, default: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };
        let api_key = |name: &str, placeholder: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty() && value != placeholder)
        };

        let port = match lookup("PORT").map(|port| port.trim().to_owned()) {
            None => DEFAULT_PORT,
            Some(port) if port.is_empty() => DEFAULT_PORT,
            Some(port) => port.parse().map_err(|_| Error::InvalidPort(port))?,
        };

        Ok(Self {
            openai_api_key: api_key("OPENAI_API_KEY", OPENAI_PLACEHOLDER),
            openai_base_url: value("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            openai_model: value("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            serper_api_key: api_key("SERPER_API_KEY", SERPER_PLACEHOLDER),
            weather_api_key: api_key(
                "OPENWEATHERMAP_API_KEY",
                WEATHER_PLACEHOLDER,
            ),
            python_bin: value("PYTHON_BIN", DEFAULT_PYTHON_BIN),
            host: value("HOST", DEFAULT_HOST),
            port,
        })
    }

    /// Returns which API keys are usable.
    #[inline]
    pub fn api_status(&self) -> ApiStatus {
        ApiStatus {
            openai: self.openai_api_key.is_some(),
            serper: self.serper_api_key.is_some(),
            weather: self.weather_api_key.is_some(),
        }
    }

    /// Returns the `host:port` address to listen on.
    #[inline]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Settings")
            .field("openai_api_key", &key(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("serper_api_key", &key(&self.serper_api_key))
            .field("weather_api_key", &key(&self.weather_api_key))
            .field("python_bin", &self.python_bin)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}
