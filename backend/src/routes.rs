use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::{EnvironmentReading, SimulatedDiagnosis, SoilAnalysisRequest, SymptomRequest};
use std::path::PathBuf;

use crate::analysis::environment::analyze_environment;
use crate::analysis::soil::analyze_soil;
use crate::analysis::thresholds::classify;
use crate::diagnosis::catalog::simulate_cnn_analysis;
use crate::diagnosis::image::MAX_IMAGE_SIZE;
use crate::diagnosis::{DiagnosisPipeline, ImageUpload, InputError};
use crate::gemini::stub::STUB_MODEL_VERSION;
use crate::history::{ConversationLog, HistoryError};
use crate::recommendations::RecommendationService;
use crate::session::{SessionId, SessionStore};
use crate::weather::{Coordinates, WeatherService};

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_json(error: impl Into<String>) -> ErrorResponse {
    ErrorResponse { error: error.into() }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: Option<PathBuf>) {
    cfg.service(web::resource("/api/diagnosis/image").route(web::post().to(diagnose_image)))
        .service(web::resource("/api/diagnosis/symptoms").route(web::post().to(diagnose_symptoms)))
        .service(web::resource("/api/diagnoses").route(web::get().to(list_diagnoses)))
        .service(web::resource("/api/plant-diagnosis").route(web::post().to(simulated_plant_diagnosis)))
        .service(web::resource("/api/recommendations").route(web::get().to(recommendations)))
        .service(web::resource("/api/weather").route(web::get().to(weather)))
        .service(web::resource("/api/classify/{key}/{value}").route(web::get().to(classify_reading)))
        .service(web::resource("/api/soil/analysis").route(web::post().to(soil_analysis)))
        .service(web::resource("/api/sensors/analysis").route(web::post().to(sensor_analysis)))
        .service(web::resource("/api/sensors/history").route(web::get().to(sensor_history)))
        .service(
            web::resource("/api/history")
                .route(web::get().to(get_history))
                .route(web::delete().to(clear_history)),
        )
        .service(web::resource("/api/health").route(web::get().to(health)));

    if let Some(dir) = static_dir {
        cfg.service(Files::new("/", dir).index_file("index.html"));
    }
}

/// Reads the `image` field of a multipart upload, stopping as soon as it exceeds the size cap.
async fn read_image_upload(payload: &mut Multipart) -> Result<ImageUpload, InputError> {
    while let Ok(Some(mut field)) = payload.try_next().await {
        if field.name() != Some("image") {
            continue;
        }

        let declared_mime = field.content_type().map(|m| m.essence_str().to_string());
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut image_data = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| {
                warn!("Failed to read uploaded image: {}", e);
                InputError::MissingImage
            })?;
            if image_data.len() + data.len() > MAX_IMAGE_SIZE {
                return Err(InputError::ImageTooLarge);
            }
            image_data.extend_from_slice(&data);
        }

        return ImageUpload::new(image_data, declared_mime.as_deref(), file_name);
    }
    Err(InputError::MissingImage)
}

fn bad_input(e: InputError) -> HttpResponse {
    info!("Rejected diagnosis input: {}", e);
    HttpResponse::BadRequest().json(error_json(e.to_string()))
}

async fn diagnose_image(
    pipeline: web::Data<DiagnosisPipeline>,
    sessions: web::Data<SessionStore>,
    session: SessionId,
    mut payload: Multipart,
) -> HttpResponse {
    let upload = match read_image_upload(&mut payload).await {
        Ok(upload) => upload,
        Err(e) => return bad_input(e),
    };

    let record = pipeline.diagnose_image(&upload).await;
    info!(
        "Image diagnosis for session {}: {} ({:.1}%)",
        session.0, record.diagnosis, record.confidence
    );
    sessions.record_diagnosis(session.0, record.clone()).await;
    HttpResponse::Ok().json(record)
}

async fn diagnose_symptoms(
    pipeline: web::Data<DiagnosisPipeline>,
    sessions: web::Data<SessionStore>,
    session: SessionId,
    body: web::Json<SymptomRequest>,
) -> HttpResponse {
    let request = body.into_inner();
    match pipeline
        .diagnose_symptoms(&request.symptoms, request.notes.as_deref())
        .await
    {
        Ok(record) => {
            info!(
                "Symptom diagnosis for session {}: {} ({:.1}%)",
                session.0, record.diagnosis, record.confidence
            );
            sessions.record_diagnosis(session.0, record.clone()).await;
            HttpResponse::Ok().json(record)
        }
        Err(e) => bad_input(e),
    }
}

async fn list_diagnoses(sessions: web::Data<SessionStore>, session: SessionId) -> HttpResponse {
    HttpResponse::Ok().json(sessions.diagnoses(session.0).await)
}

async fn simulated_plant_diagnosis(mut payload: Multipart) -> HttpResponse {
    let upload = match read_image_upload(&mut payload).await {
        Ok(upload) => upload,
        Err(InputError::MissingImage) => {
            return HttpResponse::BadRequest().json(error_json("No image provided"));
        }
        Err(e) => return bad_input(e),
    };

    let mut rng = rand::rng();
    let (disease, confidence) = simulate_cnn_analysis(&mut rng);
    info!(
        "Simulated CNN analysis of {} ({} bytes): {}",
        upload.file_name().unwrap_or("upload"),
        upload.len(),
        disease.name
    );

    HttpResponse::Ok().json(SimulatedDiagnosis {
        success: true,
        diagnosis: disease.name.to_string(),
        confidence,
        category: disease.category,
        treatment: disease.treatment.to_string(),
        severity: disease.severity,
        description: disease.description.to_string(),
        image_processed: true,
        timestamp: Utc::now(),
        model_version: STUB_MODEL_VERSION.to_string(),
        processing_time: rng.random_range(500..=2500),
    })
}

async fn recommendations(
    service: web::Data<RecommendationService>,
    sessions: web::Data<SessionStore>,
    session: SessionId,
) -> HttpResponse {
    let latest = sessions.latest_diagnosis(session.0).await;
    let response = service
        .recommend(latest.as_ref().map(|record| record.diagnosis.as_str()))
        .await;
    HttpResponse::Ok().json(response)
}

#[derive(Deserialize)]
struct WeatherQuery {
    lat: Option<String>,
    lon: Option<String>,
}

async fn weather(service: web::Data<WeatherService>, query: web::Query<WeatherQuery>) -> HttpResponse {
    let coords = match Coordinates::parse(query.lat.as_deref(), query.lon.as_deref()) {
        Ok(coords) => coords,
        Err(e) => return HttpResponse::BadRequest().json(error_json(e.to_string())),
    };

    match service.current(coords).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            error!("Weather API error: {}", e);
            HttpResponse::InternalServerError().json(error_json("Failed to fetch weather data"))
        }
    }
}

async fn classify_reading(path: web::Path<(String, String)>) -> HttpResponse {
    let (key, value) = path.into_inner();
    match value.trim().parse::<f64>() {
        Ok(value) => HttpResponse::Ok().json(classify(&key, value)),
        Err(_) => HttpResponse::BadRequest().json(error_json("Reading value must be a number")),
    }
}

async fn soil_analysis(body: web::Json<SoilAnalysisRequest>) -> HttpResponse {
    let report = analyze_soil(&body.readings);
    info!(
        "Soil analysis: {} reading(s), {} need attention",
        report.metrics.len(),
        report.attention_count
    );
    HttpResponse::Ok().json(report)
}

async fn sensor_analysis(
    sessions: web::Data<SessionStore>,
    session: SessionId,
    body: web::Json<EnvironmentReading>,
) -> HttpResponse {
    let analysis = analyze_environment(body.into_inner());
    sessions.record_sensor_reading(session.0, analysis.clone()).await;
    HttpResponse::Ok().json(analysis)
}

async fn sensor_history(sessions: web::Data<SessionStore>, session: SessionId) -> HttpResponse {
    HttpResponse::Ok().json(sessions.sensor_readings(session.0).await)
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

fn history_unavailable(e: HistoryError) -> HttpResponse {
    warn!("Conversation history request failed: {}", e);
    HttpResponse::ServiceUnavailable().json(error_json("Conversation history unavailable"))
}

async fn get_history(log: web::Data<ConversationLog>, query: web::Query<HistoryQuery>) -> HttpResponse {
    let entries = match query.limit {
        Some(limit) => log.recent(limit).await,
        None => log.all().await,
    };
    match entries {
        Ok(entries) => HttpResponse::Ok().json(entries),
        Err(e) => history_unavailable(e),
    }
}

async fn clear_history(log: web::Data<ConversationLog>) -> HttpResponse {
    match log.clear().await {
        Ok(()) => {
            info!("Conversation history cleared");
            HttpResponse::NoContent().finish()
        }
        Err(e) => history_unavailable(e),
    }
}

async fn health(pipeline: web::Data<DiagnosisPipeline>, log: web::Data<ConversationLog>) -> HttpResponse {
    let history = if log.is_available() { "available" } else { "unavailable" };
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "provider": pipeline.provider().name(),
        "history": history,
    }))
}
