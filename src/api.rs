//! REST API for the pallet planner.
//!
//! Provides HTTP endpoints for planning and streaming plans.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, PlanningConfig};
use crate::error::{ErrorKind, PlanError};
use crate::model::{
    Grouping, LayerSlot, OrderLineInput, Pallet, PalletPlan, PalletSummary, PlanTotals,
    PurchaseOrder, PurchaseOrderInput, Settings, SettingsInput, validate_orders,
};
use crate::planner::{
    PlanEvent, PlannerConfig, plan_pallets_with_config, plan_pallets_with_progress, preflight,
};
use crate::types::Coordinate;

#[derive(Clone)]
struct ApiState {
    planning: PlanningConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>pallet-planner API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request structure for the planning endpoints.
#[derive(Deserialize, Serialize, Clone, ToSchema)]
#[schema(
    example = json!({
        "orders": [
            {
                "po": "PO1",
                "lines": [
                    { "sku": "A", "quantity": 300, "unitsPerBox": 50 }
                ]
            }
        ],
        "settings": { "maxPalletHeight": 93, "grouping": "po-item" }
    })
)]
pub struct PlanRequest {
    pub orders: Vec<PurchaseOrderInput>,
    #[serde(default)]
    pub settings: SettingsInput,
}

#[derive(Debug)]
struct ValidatedPlanRequest {
    orders: Vec<PurchaseOrder>,
    settings: Settings,
}

impl ValidatedPlanRequest {
    fn order_count(&self) -> usize {
        self.orders.len()
    }

    fn line_count(&self) -> usize {
        self.orders.iter().map(|order| order.lines.len()).sum()
    }
}

impl PlanRequest {
    fn into_validated(self, defaults: Settings) -> Result<ValidatedPlanRequest, PlanError> {
        // settings first: configuration errors take precedence over order data
        let settings = self.settings.into_validated(defaults)?;
        let orders = validate_orders(self.orders)?;
        Ok(ValidatedPlanRequest { orders, settings })
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    code: String,
    details: String,
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    version: String,
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    code: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    let body = ErrorResponse {
        error: error.into(),
        code: code.into(),
        details: details.into(),
    };
    (status, Json(body)).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        "invalid_json",
        err.body_text(),
    )
}

fn plan_error_response(err: PlanError) -> Response {
    let error = match err.kind() {
        ErrorKind::Configuration => "Invalid planner configuration",
        ErrorKind::InvalidInput => "Invalid input data",
    };
    warn!("⚠️ Rejected plan request: {}", err);
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        error,
        err.code(),
        err.to_string(),
    )
}

fn parse_plan_request(
    payload: Result<Json<PlanRequest>, JsonRejection>,
    config: &PlannerConfig,
) -> Result<ValidatedPlanRequest, Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;
    let request = payload
        .into_validated(config.default_settings)
        .map_err(plan_error_response)?;
    preflight(&request.orders, request.settings, *config).map_err(plan_error_response)?;
    Ok(request)
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_plan, handle_plan_stream, handle_health),
    components(
        schemas(
            PlanRequest,
            PurchaseOrderInput,
            OrderLineInput,
            SettingsInput,
            Grouping,
            PalletPlan,
            Pallet,
            PalletSummary,
            PlanTotals,
            LayerSlot,
            Coordinate,
            ErrorResponse,
            HealthResponse
        )
    ),
    tags((name = "planning", description = "Endpoints for pallet planning"))
)]
struct ApiDoc;

/// Builds the application router.
fn router(planning: PlanningConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { planning };

    Router::new()
        .route("/plan", post(handle_plan))
        .route("/plan_stream", post(handle_plan_stream))
        .route("/health", get(handle_health))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server on the configured address.
///
/// Runs until the server is terminated; binding errors are returned.
pub async fn start_api_server(
    config: ApiConfig,
    planning: PlanningConfig,
) -> std::io::Result<()> {
    let app = router(planning);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let display_host = config.display_host().to_string();
    info!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!("📦 API Endpoints: POST /plan, POST /plan_stream, GET /health");
    info!("📑 Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /plan endpoint.
///
/// Expands the orders into cartons and plans them onto pallets.
#[utoipa::path(
    post,
    path = "/plan",
    request_body = PlanRequest,
    responses(
        (status = 200, description = "Planned pallets", body = PalletPlan),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid orders or planner configuration",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_plan(
    State(state): State<ApiState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> impl IntoResponse {
    let config = state.planning.planner_config();
    let request = match parse_plan_request(payload, &config) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!(
        "📥 New plan request: {} orders, {} lines, max height {}, grouping {}",
        request.order_count(),
        request.line_count(),
        request.settings.max_pallet_height,
        request.settings.grouping
    );

    match plan_pallets_with_config(&request.orders, request.settings, config) {
        Ok(plan) => {
            info!(
                "📦 Result: {} pallets, {} cartons, {} lbs",
                plan.totals.pallets, plan.totals.cartons, plan.totals.weight
            );
            (StatusCode::OK, Json(plan)).into_response()
        }
        Err(err) => plan_error_response(err),
    }
}

/// Handler for POST /plan_stream endpoint (SSE).
///
/// Streams planning events as Server-Sent Events (text/event-stream).
/// Invalid requests are rejected before the stream starts.
#[utoipa::path(
    post,
    path = "/plan_stream",
    request_body = PlanRequest,
    responses(
        (
            status = 200,
            description = "Streams planning events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid orders or planner configuration",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_plan_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> impl IntoResponse {
    let config = state.planning.planner_config();
    let request = match parse_plan_request(payload, &config) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let ValidatedPlanRequest { orders, settings } = request;
        let mut connected = true;
        let result = plan_pallets_with_progress(&orders, settings, config, |evt| {
            if connected && !forward_event(&tx, evt) {
                debug!("Client left the plan stream, dropping remaining events");
                connected = false;
            }
        });
        if let Err(err) = result {
            warn!("⚠️ Streaming plan failed: {}", err);
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Sends one event to the stream. Returns `false` once the client has gone.
fn forward_event(tx: &mpsc::Sender<String>, evt: &PlanEvent) -> bool {
    if tx.is_closed() {
        return false;
    }
    match serde_json::to_string(evt) {
        Ok(json) => tx.blocking_send(json).is_ok(),
        Err(err) => {
            warn!("⚠️ Could not serialize plan event: {}", err);
            true
        }
    }
}

/// Handler for GET /health.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "planning"
)]
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_from(json: &str) -> PlanRequest {
        serde_json::from_str(json).expect("Should parse valid JSON")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        serde_json::from_slice(&bytes).expect("Body should be JSON")
    }

    fn state() -> ApiState {
        ApiState {
            planning: PlanningConfig::default(),
        }
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/plan", "/plan_stream", "/health"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in ["PlanRequest", "PalletPlan", "Pallet", "ErrorResponse"] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI document",
                name
            );
        }
    }

    #[test]
    fn plan_request_settings_default_when_absent() {
        let request = request_from(r#"{ "orders": [] }"#);
        let validated = request
            .into_validated(Settings::default())
            .expect("Should validate");
        assert_eq!(validated.settings, Settings::default());
        assert_eq!(validated.order_count(), 0);
    }

    #[test]
    fn plan_request_accepts_form_strings() {
        let request = request_from(
            r#"{
                "orders": [{ "po": "", "skus": [{ "sku": "A", "quantity": "120", "unitsPerBox": "" }] }],
                "settings": { "maxPalletHeight": "60", "grouping": "item" }
            }"#,
        );
        let validated = request
            .into_validated(Settings::default())
            .expect("Should validate");
        assert_eq!(validated.settings.max_pallet_height, 60.0);
        assert_eq!(validated.settings.grouping, Grouping::Item);
        assert_eq!(validated.line_count(), 1);
        assert_eq!(validated.orders[0].lines[0].units_per_box, 50);
    }

    #[test]
    fn unknown_grouping_is_a_configuration_error() {
        let request = request_from(
            r#"{ "orders": [{ "po": "PO1", "lines": [{ "sku": "A", "quantity": "x" }] }],
                 "settings": { "grouping": "by-color" } }"#,
        );
        let err = request
            .into_validated(Settings::default())
            .expect_err("Should reject grouping");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn parse_plan_request_rejects_low_pallet() {
        let request = request_from(
            r#"{ "orders": [{ "po": "PO1", "lines": [{ "sku": "A", "quantity": 10 }] }],
                 "settings": { "maxPalletHeight": 18 } }"#,
        );
        let response = parse_plan_request(Ok(Json(request)), &PlannerConfig::default())
            .expect_err("Should reject height");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn handle_plan_returns_planned_pallets() {
        let request = request_from(
            r#"{ "orders": [{ "po": "PO1", "lines": [{ "sku": "A", "quantity": 300, "unitsPerBox": 50 }] }],
                 "settings": { "maxPalletHeight": 93, "grouping": "po-item" } }"#,
        );
        let response = handle_plan(State(state()), Ok(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["totals"]["pallets"], 1);
        assert_eq!(body["totals"]["cartons"], 6);
        assert_eq!(body["totals"]["weight"], 122);
        let pallet = &body["pallets"][0];
        assert_eq!(pallet["palletNumber"], 1);
        assert_eq!(pallet["boxCount"], 6);
        assert_eq!(pallet["estimatedHeight"], 20);
        assert_eq!(pallet["dims"], "40x48x20");
        assert_eq!(pallet["layerBreakdown"][0]["PO1-A"], 6);
        assert_eq!(pallet["layerLayout"][0][3]["coordinate"], "b3");
        assert_eq!(pallet["layerLayout"][0][3]["sku"], "PO1-A");
        assert_eq!(body["summaries"][0]["dims"], "40x48x20");
    }

    #[tokio::test]
    async fn handle_plan_reports_field_and_value() {
        let request = request_from(
            r#"{ "orders": [{ "po": "PO1", "lines": [{ "sku": "A", "quantity": -4 }] }] }"#,
        );
        let response = handle_plan(State(state()), Ok(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["code"], "invalid_number");
        let details = body["details"].as_str().unwrap_or_default();
        assert!(details.contains("orders[0].lines[0].quantity"));
        assert!(details.contains("-4"));
    }

    #[tokio::test]
    async fn handle_plan_rejects_uncountable_height() {
        let request = request_from(
            r#"{ "orders": [{ "po": "PO1", "lines": [{ "sku": "A", "quantity": 300 }] }],
                 "settings": { "maxPalletHeight": 1e300 } }"#,
        );
        let response = handle_plan(State(state()), Ok(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["code"], "height_too_high");
    }

    #[tokio::test]
    async fn handle_plan_stream_emits_events_in_order() {
        let request = request_from(
            r#"{ "orders": [{ "po": "PO1", "lines": [{ "sku": "A", "quantity": 2000, "unitsPerBox": 50 }] }],
                 "settings": { "maxPalletHeight": 93, "grouping": "item" } }"#,
        );
        let response = handle_plan_stream(State(state()), Ok(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/event-stream"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Stream should end after Finished");
        let text = String::from_utf8(bytes.to_vec()).expect("Stream should be UTF-8");
        let events: Vec<serde_json::Value> = text
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim_start()).expect("Event should be JSON"))
            .collect();

        // 40 cartons on 36-carton pallets
        assert_eq!(events.len(), 4);
        assert_eq!(events[0]["type"], "PlanStarted");
        assert_eq!(events[0]["pallets"], 2);
        for (idx, event) in events[1..3].iter().enumerate() {
            assert_eq!(event["type"], "PalletPlanned");
            assert_eq!(event["pallet"]["palletNumber"], idx + 1);
        }
        assert_eq!(events[3]["type"], "Finished");
        assert_eq!(events[3]["totals"]["cartons"], 40);
    }

    #[tokio::test]
    async fn handle_plan_stream_rejects_before_streaming() {
        let request = request_from(
            r#"{ "orders": [{ "po": "PO1", "lines": [{ "sku": "A", "quantity": "lots" }] }] }"#,
        );
        let response = handle_plan_stream(State(state()), Ok(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["code"], "invalid_number");
    }

    #[test]
    fn forward_event_stops_after_disconnect() {
        let event = PlanEvent::Finished {
            totals: PlanTotals::default(),
        };

        let (tx, mut rx) = mpsc::channel::<String>(4);
        assert!(forward_event(&tx, &event));
        let sent = rx.try_recv().expect("Event should be queued");
        assert!(sent.contains("\"Finished\""));

        drop(rx);
        assert!(!forward_event(&tx, &event));
    }

    #[tokio::test]
    async fn handle_health_reports_ok() {
        let response = handle_health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }
}
