use std::fmt::Write as _;

use reqwest::{Client, Url};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use wayfarer_core::tool::{Tool, ToolResult};

use super::{FetchError, read_text};

const CURRENT_WEATHER_URL: &str =
    "https://api.openweathermap.org/data/2.5/weather";

/// Input of [`WeatherTool`].
#[derive(Deserialize, JsonSchema)]
pub struct WeatherParameters {
    /// The city to get the current weather for, e.g. "Dubai".
    city: String,
}

/// Current weather from OpenWeatherMap, in metric units.
pub struct WeatherTool {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    parameter_schema: Value,
}

impl WeatherTool {
    /// Creates the tool. Without an API key every lookup reports that the
    /// weather is not available.
    #[inline]
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            endpoint: CURRENT_WEATHER_URL.to_owned(),
            parameter_schema: schema_for!(WeatherParameters).to_value(),
        }
    }

    /// Asks `endpoint` instead of OpenWeatherMap.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Tool for WeatherTool {
    type Input = WeatherParameters;

    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Fetches the current weather of the city from OpenWeatherMap."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: WeatherParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let endpoint = self.endpoint.clone();
        async move {
            let city = input.city;
            let Some(api_key) = api_key else {
                return Ok(format!(
                    "Weather API key not available. Cannot get weather for {city}."
                ));
            };
            match fetch_current_weather(&client, &endpoint, &api_key, &city).await {
                Ok(weather) => Ok(weather.report(&city)),
                Err(err) => {
                    warn!("weather lookup for {city} failed: {err}");
                    Ok(format!(
                        "Weather data unavailable for {city}. Error: {err}"
                    ))
                }
            }
        }
    }
}

async fn fetch_current_weather(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    city: &str,
) -> Result<CurrentWeather, FetchError> {
    let url = Url::parse_with_params(
        endpoint,
        &[("q", city), ("appid", api_key), ("units", "metric")],
    )
    .map_err(|err| FetchError::Parse(err.to_string()))?;
    let body = read_text(client.get(url).send().await?).await?;
    serde_json::from_str(&body).map_err(|err| FetchError::Parse(err.to_string()))
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    name: String,
    #[serde(default)]
    weather: Vec<Condition>,
    main: Readings,
    #[serde(default)]
    wind: Wind,
    #[serde(default)]
    clouds: Clouds,
    rain: Option<Precipitation>,
    sys: Option<Country>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u32,
}

#[derive(Debug, Default, Deserialize)]
struct Wind {
    speed: f64,
    #[serde(default)]
    deg: u32,
}

#[derive(Debug, Default, Deserialize)]
struct Clouds {
    all: u32,
}

#[derive(Debug, Deserialize)]
struct Precipitation {
    #[serde(rename = "1h")]
    last_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Country {
    country: Option<String>,
}

impl CurrentWeather {
    fn report(&self, city: &str) -> String {
        let location = if self.name.is_empty() {
            city
        } else {
            self.name.as_str()
        };
        let mut report = format!("In {location}");
        if let Some(country) =
            self.sys.as_ref().and_then(|sys| sys.country.as_deref())
        {
            let _ = write!(report, ", {country}");
        }
        report.push_str(", the current weather is as follows:\n");

        let status = self
            .weather
            .iter()
            .map(|condition| condition.description.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(report, "Detailed status: {status}");
        let _ = writeln!(
            report,
            "Wind speed: {} m/s, direction: {}°",
            self.wind.speed, self.wind.deg
        );
        let _ = writeln!(report, "Humidity: {}%", self.main.humidity);
        report.push_str("Temperature:\n");
        let _ = writeln!(report, "  - Current: {}°C", self.main.temp);
        let _ = writeln!(report, "  - High: {}°C", self.main.temp_max);
        let _ = writeln!(report, "  - Low: {}°C", self.main.temp_min);
        let _ = writeln!(report, "  - Feels like: {}°C", self.main.feels_like);
        match self.rain.as_ref().and_then(|rain| rain.last_hour) {
            Some(mm) => {
                let _ = writeln!(report, "Rain: {mm} mm in the last hour");
            }
            None => report.push_str("Rain: none\n"),
        }
        let _ = write!(report, "Cloud cover: {}%", self.clouds.all);
        report
    }
}
