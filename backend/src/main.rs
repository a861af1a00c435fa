mod analysis;
mod config;
mod diagnosis;
mod gemini;
mod history;
mod recommendations;
mod routes;
mod session;
mod weather;

#[cfg(test)]
mod test_support;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use config::AppConfig;
use diagnosis::DiagnosisPipeline;
use gemini::client::GeminiClient;
use gemini::stub::StubGenerator;
use gemini::Provider;
use history::ConversationLog;
use recommendations::RecommendationService;
use routes::configure_routes;
use session::{SessionMiddleware, SessionStore, SESSION_HEADER};
use std::env;
use weather::WeatherService;

fn build_provider(config: &AppConfig) -> std::io::Result<Provider> {
    let key = match (&config.ai.gemini_api_key, config.uses_gemini()) {
        (Some(key), true) => key,
        _ => {
            log::warn!("Gemini provider disabled or no API key configured, using the local stub");
            return Ok(Provider::Stub(StubGenerator));
        }
    };

    let client = GeminiClient::new(
        key.clone(),
        &config.ai.gemini_base_url,
        &config.ai.gemini_model,
        config.http_timeout(),
    )
    .map_err(|e| std::io::Error::other(format!("Gemini client setup failed: {}", e)))?;

    log::info!("Using Gemini model {}", config.ai.gemini_model);
    Ok(Provider::Gemini(client))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return Err(std::io::Error::other(format!("Configuration error: {}", e)));
        }
    };

    let conversation_log = match ConversationLog::open(&config.storage.database_path) {
        Ok(log) => {
            log::info!(
                "Conversation log opened at {}",
                config.storage.database_path.display()
            );
            log
        }
        Err(e) => {
            log::warn!(
                "Conversation log unavailable ({}), continuing without history",
                e
            );
            ConversationLog::unavailable(e.to_string())
        }
    };

    let provider = build_provider(&config)?;
    let pipeline = DiagnosisPipeline::new(provider.clone(), conversation_log.clone())
        .with_context_entries(config.ai.context_entries);
    let recommendations = RecommendationService::new(provider, conversation_log.clone(), config.farm.clone());

    let weather = WeatherService::new(
        config.weather.api_key.as_ref().map(|k| k.expose().to_string()),
        &config.weather.base_url,
        config.http_timeout(),
    )
    .map_err(|e| std::io::Error::other(format!("Weather client setup failed: {}", e)))?;
    if !weather.is_live() {
        log::warn!("WEATHER_API_KEY is not set, weather endpoint serves demo data");
    }

    let sessions = SessionStore::new();
    let static_dir = config.server.static_dir.clone();
    if let Some(dir) = &static_dir {
        log::info!("Serving static files from {}", dir.display());
    }

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(SessionMiddleware)
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                        actix_web::http::header::HeaderName::from_static(SESSION_HEADER),
                    ])
                    .expose_headers(vec![actix_web::http::header::HeaderName::from_static(
                        SESSION_HEADER,
                    )])
                    .max_age(3600),
            )
            .app_data(web::Data::new(conversation_log.clone()))
            .app_data(web::Data::new(pipeline.clone()))
            .app_data(web::Data::new(recommendations.clone()))
            .app_data(web::Data::new(weather.clone()))
            .app_data(web::Data::new(sessions.clone()))
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
