use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use courserec_core::{Error, Outcome, Recommender};
use courserec_storage::StorageManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

const SUGGESTION_LIMIT: usize = 10;

#[derive(Deserialize)]
struct RecommendRequest {
    title: String,
    k: Option<usize>,
}

#[derive(Deserialize)]
struct FreeTextRequest {
    query: String,
    k: Option<usize>,
    cutoff: Option<f64>,
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct HealthInfo {
    status: &'static str,
    generation: u64,
    courses: usize,
}

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    pub recommender: Arc<Recommender>,
    /// Needed for `/catalog/reload`; reloading is refused without it
    pub storage: Option<Arc<StorageManager>>,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(state: ApiState, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(state.clone()))
                .configure(RestApi::routes)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }

    /// Register all routes; used by the server and by tests
    pub fn routes(cfg: &mut web::ServiceConfig) {
        cfg.route("/health", web::get().to(health))
            .route("/courses", web::get().to(list_courses))
            .route("/courses/search", web::get().to(search_courses))
            .route("/recommend", web::post().to(recommend_by_title))
            .route("/recommend/search", web::post().to(recommend_by_query))
            .route("/catalog/reload", web::post().to(reload_catalog));
    }
}

async fn health(state: web::Data<ApiState>) -> ActixResult<HttpResponse> {
    let snapshot = state.recommender.snapshot();
    Ok(HttpResponse::Ok().json(HealthInfo {
        status: "ok",
        generation: snapshot.generation(),
        courses: snapshot.len(),
    }))
}

async fn list_courses(
    state: web::Data<ApiState>,
    query: web::Query<ListQuery>,
) -> ActixResult<HttpResponse> {
    let limit = query.limit.unwrap_or(SUGGESTION_LIMIT);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "result": state.recommender.preview(limit)
    })))
}

async fn search_courses(
    state: web::Data<ApiState>,
    query: web::Query<SearchQuery>,
) -> ActixResult<HttpResponse> {
    let limit = query.limit.unwrap_or(SUGGESTION_LIMIT);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "result": state.recommender.search_labels(&query.q, limit)
    })))
}

async fn recommend_by_title(
    state: web::Data<ApiState>,
    req: web::Json<RecommendRequest>,
) -> ActixResult<HttpResponse> {
    let config = state.recommender.config();
    let k = req.k.unwrap_or(config.default_k);
    if let Err(e) = config.check_request_k(k) {
        return Ok(error_response(&e));
    }
    match state.recommender.recommend_by_label(&req.title, k) {
        Ok(outcome) => Ok(outcome_response(&state, outcome)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn recommend_by_query(
    state: web::Data<ApiState>,
    req: web::Json<FreeTextRequest>,
) -> ActixResult<HttpResponse> {
    let config = state.recommender.config();
    let k = req.k.unwrap_or(config.default_k);
    let cutoff = req.cutoff.unwrap_or(config.fuzzy_cutoff);
    if let Err(e) = config.check_request_k(k) {
        return Ok(error_response(&e));
    }
    match state.recommender.recommend_by_free_text(&req.query, k, cutoff) {
        Ok(outcome) => Ok(outcome_response(&state, outcome)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn reload_catalog(state: web::Data<ApiState>) -> ActixResult<HttpResponse> {
    let Some(storage) = state.storage.clone() else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Catalog reload is not configured"
        })));
    };
    let recommender = state.recommender.clone();

    match web::block(move || storage.reload(&recommender)).await {
        Ok(Ok(generation)) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "result": { "generation": generation }
        }))),
        Ok(Err(e)) => {
            warn!(error = %e, "Catalog reload failed");
            Ok(HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("{:#}", e)
            })))
        }
        Err(e) => Ok(HttpResponse::InternalServerError().json(serde_json::json!({
            "error": e.to_string()
        }))),
    }
}

fn outcome_response(state: &ApiState, outcome: Outcome) -> HttpResponse {
    match outcome {
        Outcome::Found { .. } => HttpResponse::Ok().json(serde_json::json!({
            "result": outcome
        })),
        Outcome::NotFound { label } => HttpResponse::NotFound().json(serde_json::json!({
            "status": "not_found",
            "error": format!("Course not found: {}", label),
        })),
        Outcome::NoMatch { query } => {
            let suggestions = state.recommender.search_labels(&query, SUGGESTION_LIMIT);
            HttpResponse::NotFound().json(serde_json::json!({
                "status": "no_match",
                "error": format!("No course title matches '{}'", query),
                "suggestions": suggestions,
            }))
        }
    }
}

fn error_response(e: &Error) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        Error::InvalidArgument(_) | Error::InvalidConfig(_) => HttpResponse::BadRequest().json(body),
        Error::NotFound(_) | Error::NoMatch(_) => HttpResponse::NotFound().json(body),
        _ => {
            warn!(error = %e, "Unexpected recommender failure");
            HttpResponse::InternalServerError().json(body)
        }
    }
}
