//! HTTP Handler Example
//!
//! An axum API that maps classified errors onto responses:
//! - Permanent errors become 4xx, everything else 500
//! - The error domain and first hint are returned to the client
//! - Every failure is logged once with the request id
//!
//! Try it with:
//!
//! ```text
//! curl http://localhost:8888/health
//! curl http://localhost:8888/users/1
//! curl http://localhost:8888/users/999
//! curl http://localhost:8888/users/abc
//! curl -X POST http://localhost:8888/users -H 'Content-Type: application/json' \
//!     -d '{"name":"David","email":"david@example.com"}'
//! curl -X POST http://localhost:8888/users -H 'Content-Type: application/json' \
//!     -d '{"name":"","email":""}'
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use faultline::classify::{is_permanent, mark_permanent, mark_temporary};
use faultline::domain::{self, get_domain, wrap_with_stack};
use faultline::logx::{self, Logger};
use faultline::{kv, Report};

const ADDR: &str = "0.0.0.0:8888";

// ==================== User service ====================

#[derive(Debug, Clone, Serialize)]
struct User {
    id: u64,
    name: String,
    email: String,
    created_at: String,
}

impl User {
    fn new(id: u64, name: &str, email: &str) -> Self {
        User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[derive(Debug)]
struct UserService {
    users: Mutex<HashMap<u64, User>>,
}

impl UserService {
    fn new() -> Self {
        let users = [
            User::new(1, "Alice", "alice@example.com"),
            User::new(2, "Bob", "bob@example.com"),
            User::new(3, "Charlie", "charlie@example.com"),
        ];
        UserService {
            users: Mutex::new(users.into_iter().map(|user| (user.id, user)).collect()),
        }
    }

    fn get_user(&self, id: u64) -> Result<User, Report> {
        // One request in ten sees a flaky database.
        if Utc::now().timestamp() % 10 == 0 {
            let err = mark_temporary(Report::msg("database connection timeout"))
                .with_domain(domain::ADAPTERS)
                .with_hint("Retry the request");
            return Err(wrap_with_stack(err, "failed to fetch user from database"));
        }

        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        users.get(&id).cloned().ok_or_else(|| {
            mark_permanent(Report::msg(format!("user with id {} not found", id)))
                .with_domain(domain::ADAPTERS)
        })
    }

    fn create_user(&self, name: &str, email: &str) -> Result<User, Report> {
        if name.is_empty() {
            return Err(mark_permanent(Report::msg("name is required"))
                .with_domain(domain::USECASE)
                .with_hint("Provide a valid name"));
        }
        if email.is_empty() {
            return Err(mark_permanent(Report::msg("email is required"))
                .with_domain(domain::USECASE)
                .with_hint("Provide a valid email address"));
        }

        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let user = User::new(users.len() as u64 + 1, name, email);
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

// ==================== Error responses ====================

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// A failed request: the report plus the status it maps to.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    report: Report,
    request_id: String,
}

impl ApiError {
    fn new(status: StatusCode, report: Report, request_id: &str) -> Self {
        ApiError {
            status,
            report,
            request_id: request_id.to_string(),
        }
    }

    /// Permanent errors map to `client_status`, anything else to 500.
    fn classify(report: Report, client_status: StatusCode, request_id: &str) -> Self {
        let status = if is_permanent(&report) {
            client_status
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        ApiError::new(status, report, request_id)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        logx::error_err(
            "API request failed",
            &self.report,
            kv! { "request_id" => self.request_id, "status" => self.status.as_u16() },
        );

        let body = ErrorResponse {
            error: self.report.to_string(),
            code: get_domain(&self.report).map(|domain| domain.to_string()),
            details: self.report.hints().first().map(|hint| hint.to_string()),
        };
        (self.status, Json(body)).into_response()
    }
}

// ==================== Handlers ====================

#[derive(Clone)]
struct AppState {
    users: Arc<UserService>,
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("X-Request-ID")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(String::from)
        .unwrap_or_else(|| {
            format!(
                "req_{}",
                Utc::now().timestamp_nanos_opt().unwrap_or_default()
            )
        })
}

fn request_logger(request_id: &str) -> Logger {
    logx::with_component("http").with_request_id(request_id)
}

/// GET /health
async fn health_handler() -> Json<HashMap<&'static str, String>> {
    Json(HashMap::from([
        ("status", "ok".to_string()),
        ("time", Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
    ]))
}

/// GET /users/{id}
async fn get_user_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let request_id = request_id(&headers);
    let log = request_logger(&request_id);

    let id: u64 = raw_id.parse().map_err(|err| {
        let report = mark_permanent(Report::new(err).wrap("invalid user ID"));
        ApiError::new(StatusCode::BAD_REQUEST, report, &request_id)
    })?;

    log.info("Fetching user", kv! { "user_id" => id });

    let user = state
        .users
        .get_user(id)
        .map_err(|err| ApiError::classify(err, StatusCode::NOT_FOUND, &request_id))?;

    log.info("User fetched successfully", kv! { "user_id" => id });
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateUserRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
}

/// POST /users
async fn create_user_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let request_id = request_id(&headers);
    let log = request_logger(&request_id);

    let req: CreateUserRequest = serde_json::from_slice(&body).map_err(|err| {
        let report = mark_permanent(Report::new(err).wrap("invalid JSON request"));
        ApiError::new(StatusCode::BAD_REQUEST, report, &request_id)
    })?;

    log.info(
        "Creating user",
        kv! { "name" => req.name.as_str(), "email" => req.email.as_str() },
    );

    let user = state
        .users
        .create_user(&req.name, &req.email)
        .map_err(|err| ApiError::classify(err, StatusCode::BAD_REQUEST, &request_id))?;

    log.info("User created successfully", kv! { "user_id" => user.id });
    Ok((StatusCode::CREATED, Json(user)))
}

fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/users/{id}", get(get_user_handler))
        .route("/users", post(create_user_handler))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    logx::init(&logx::LogConfig::from_env());

    println!("======================================");
    println!("        HTTP Handler Example          ");
    println!("======================================");

    let state = AppState {
        users: Arc::new(UserService::new()),
    };

    let listener = match tokio::net::TcpListener::bind(ADDR).await {
        Ok(listener) => listener,
        Err(err) => {
            let err = Report::new(err).wrap(format!("failed to bind {}", ADDR));
            logx::error_err("Server failed to start", &err, kv! {});
            return;
        }
    };

    println!("\nServer listening on {}", ADDR);
    println!("See the module docs for curl commands to try\n");

    if let Err(err) = axum::serve(listener, routes(state)).await {
        logx::error_err("Server stopped", &Report::new(err), kv! {});
    }
}
