//! Current weather from OpenWeatherMap.

use crate::error::{ToolsError, ToolsResult};
use ash_core::config::get_env_string;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_CITY: &str = "Munich";
pub const DEFAULT_COUNTRY: &str = "DE";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct WeatherConfig {
    pub api_key: String,
    pub city: String,
    pub country: String,
    pub api_base: String,
}

impl std::fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("city", &self.city)
            .field("country", &self.country)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl WeatherConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            city: DEFAULT_CITY.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_location(mut self, city: impl Into<String>, country: impl Into<String>) -> Self {
        self.city = city.into();
        self.country = country.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// `None` when `WEATHER_API_KEY` is unset.
    pub fn from_env() -> Option<Self> {
        let city = get_env_string("WEATHER_CITY").unwrap_or_else(|| DEFAULT_CITY.to_string());
        let country =
            get_env_string("WEATHER_COUNTRY").unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
        Some(Self::new(get_env_string("WEATHER_API_KEY")?).with_location(city, country))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Weather {
    pub city: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub description: String,
}

impl Weather {
    pub fn render(&self) -> String {
        format!(
            "🌤️ {}: {}°C (gefühlt {}°C), {}",
            self.city, self.temperature, self.feels_like, self.description
        )
    }
}

#[derive(Deserialize)]
struct CurrentWeather {
    main: MainReadings,
    weather: Vec<Condition>,
}

#[derive(Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
}

#[derive(Deserialize)]
struct Condition {
    description: String,
}

pub struct WeatherClient {
    http: Client,
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Current conditions in metric units, described in German.
    pub async fn current(&self) -> ToolsResult<Weather> {
        let location = format!("{},{}", self.config.city, self.config.country);
        let response = self
            .http
            .get(format!("{}/weather", self.config.api_base))
            .query(&[
                ("q", location.as_str()),
                ("appid", self.config.api_key.as_str()),
                ("units", "metric"),
                ("lang", "de"),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(ToolsError::Upstream {
                service: "OpenWeatherMap",
                status: response.status().as_u16(),
                detail: response.text().await.unwrap_or_default(),
            });
        }

        let current: CurrentWeather = response.json().await?;
        let description = current
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .ok_or_else(|| ToolsError::NotFound("weather response has no conditions".into()))?;

        Ok(Weather {
            city: self.config.city.clone(),
            temperature: current.main.temp,
            feels_like: current.main.feels_like,
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_and_renders_conditions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Berlin,DE"))
            .and(query_param("units", "metric"))
            .and(query_param("lang", "de"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "main": {"temp": 12.5, "feels_like": 10.25},
                "weather": [{"description": "leichter Regen"}]
            })))
            .mount(&server)
            .await;

        let client = WeatherClient::new(
            WeatherConfig::new("key")
                .with_location("Berlin", "DE")
                .with_api_base(server.uri()),
        );
        let weather = client.current().await.unwrap();
        assert_eq!(
            weather.render(),
            "🌤️ Berlin: 12.5°C (gefühlt 10.25°C), leichter Regen"
        );
    }

    #[tokio::test]
    async fn unauthorized_key_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = WeatherClient::new(WeatherConfig::new("bad").with_api_base(server.uri()));
        assert!(matches!(
            client.current().await,
            Err(ToolsError::Upstream { status: 401, .. })
        ));
    }
}
