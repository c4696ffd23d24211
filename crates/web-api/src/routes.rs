use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse, GraphQLSubscription};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Instrument;

use crate::{schema::request_span, state::AppState};

const GRAPHQL_PATH: &str = "/query";
const SUBSCRIPTION_PATH: &str = "/query/ws";

pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route(GRAPHQL_PATH, post(graphql_handler))
        .route_service(SUBSCRIPTION_PATH, GraphQLSubscription::new(state.schema.clone()));

    if state.playground {
        router = router.route("/", get(playground));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn graphql_handler(
    State(state): State<AppState>,
    request: GraphQLRequest,
) -> GraphQLResponse {
    state
        .schema
        .execute(request.into_inner())
        .instrument(request_span())
        .await
        .into()
}

async fn playground() -> impl IntoResponse {
    Html(
        GraphiQLSource::build()
            .endpoint(GRAPHQL_PATH)
            .subscription_endpoint(SUBSCRIPTION_PATH)
            .finish(),
    )
}
