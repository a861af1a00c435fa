use reqwest::Client;
use serde::Deserialize;
use shared::WeatherReport;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Latitude and longitude are required")]
    MissingCoordinates,
    #[error("Weather request failed: {0}")]
    Request(String),
    #[error("Weather API returned status {0}")]
    Status(u16),
    #[error("Weather API returned an unexpected payload: {0}")]
    Payload(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Parses query-string coordinates. Missing, non-numeric or out-of-range values are rejected.
    pub fn parse(lat: Option<&str>, lon: Option<&str>) -> Result<Self, WeatherError> {
        let parse = |value: Option<&str>, limit: f64| {
            value
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && v.abs() <= limit)
                .ok_or(WeatherError::MissingCoordinates)
        };
        Ok(Self {
            lat: parse(lat, 90.0)?,
            lon: parse(lon, 180.0)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    name: String,
    sys: OwmSys,
    main: OwmMain,
    weather: Vec<OwmCondition>,
    wind: OwmWind,
    clouds: OwmClouds,
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmClouds {
    all: f64,
}

impl OwmResponse {
    fn into_report(self) -> Result<WeatherReport, WeatherError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::Payload("no weather conditions".to_string()))?;

        let location = if self.sys.country.is_empty() {
            self.name
        } else {
            format!("{}, {}", self.name, self.sys.country)
        };

        Ok(WeatherReport {
            location,
            temperature: self.main.temp.round() as i32,
            condition: condition.description,
            humidity: self.main.humidity.round() as i32,
            // m/s to km/h
            wind_speed: (self.wind.speed * 3.6).round() as i32,
            feels_like: self.main.feels_like.round() as i32,
            rain_chance: self.clouds.all.round() as i32,
            icon: condition.main,
        })
    }
}

/// Current conditions from OpenWeatherMap, or fixed demo values when no key is configured.
#[derive(Clone)]
pub struct WeatherService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl WeatherService {
    pub fn new(api_key: Option<String>, base_url: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_live(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn demo_report() -> WeatherReport {
        WeatherReport {
            location: "Demo Location".to_string(),
            temperature: 24,
            condition: "partly cloudy".to_string(),
            humidity: 65,
            wind_speed: 12,
            feels_like: 26,
            rain_chance: 30,
            icon: "Clear".to_string(),
        }
    }

    pub async fn current(&self, coords: Coordinates) -> Result<WeatherReport, WeatherError> {
        let Some(api_key) = &self.api_key else {
            log::debug!("No weather API key configured, serving demo conditions");
            return Ok(Self::demo_report());
        };

        let response = self
            .client
            .get(format!("{}/data/2.5/weather", self.base_url))
            .query(&[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("appid", api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status(status.as_u16()));
        }

        let body: OwmResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Payload(e.without_url().to_string()))?;

        body.into_report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_endpoint;
    use actix_web::HttpResponse;
    use serde_json::json;

    #[test]
    fn coordinates_must_be_present_and_numeric() {
        assert_eq!(
            Coordinates::parse(Some("52.5"), Some(" 13.4 ")).unwrap(),
            Coordinates { lat: 52.5, lon: 13.4 }
        );
        assert!(Coordinates::parse(None, Some("13.4")).is_err());
        assert!(Coordinates::parse(Some("north"), Some("13.4")).is_err());
        assert!(Coordinates::parse(Some("91"), Some("0")).is_err());
        assert!(Coordinates::parse(Some("NaN"), Some("0")).is_err());
    }

    #[actix_web::test]
    async fn without_key_returns_demo_values() {
        let service = WeatherService::new(Some("  ".into()), "http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        assert!(!service.is_live());
        let report = service.current(Coordinates { lat: 0.0, lon: 0.0 }).await.unwrap();
        assert_eq!(report, WeatherService::demo_report());
    }

    #[actix_web::test]
    async fn maps_openweathermap_payload() {
        let endpoint = spawn_endpoint(|req, _| {
            assert_eq!(req.path(), "/data/2.5/weather");
            let query = req.query_string();
            assert!(query.contains("appid=owm-key"));
            assert!(query.contains("units=metric"));
            HttpResponse::Ok().json(json!({
                "name": "Nairobi",
                "sys": {"country": "KE"},
                "main": {"temp": 21.6, "feels_like": 21.2, "humidity": 58},
                "weather": [{"main": "Clouds", "description": "scattered clouds"}],
                "wind": {"speed": 4.1},
                "clouds": {"all": 40}
            }))
        });

        let service = WeatherService::new(Some("owm-key".into()), &endpoint.base_url, Duration::from_secs(5)).unwrap();
        let report = service.current(Coordinates { lat: -1.29, lon: 36.82 }).await.unwrap();

        assert_eq!(report.location, "Nairobi, KE");
        assert_eq!(report.temperature, 22);
        assert_eq!(report.feels_like, 21);
        assert_eq!(report.wind_speed, 15);
        assert_eq!(report.rain_chance, 40);
        assert_eq!(report.condition, "scattered clouds");
        assert_eq!(report.icon, "Clouds");
    }

    #[actix_web::test]
    async fn upstream_error_is_reported() {
        let endpoint = spawn_endpoint(|_, _| HttpResponse::Unauthorized().finish());
        let service = WeatherService::new(Some("bad".into()), &endpoint.base_url, Duration::from_secs(5)).unwrap();

        let err = service.current(Coordinates { lat: 1.0, lon: 1.0 }).await.unwrap_err();
        assert!(matches!(err, WeatherError::Status(401)));
    }
}
