use axum::extract::State;
use serde::Serialize;

use crate::api::response::ApiResponse;
use crate::api::state::AppState;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct EngineInfo {
    pub name: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct EnginesData {
    pub engines: Vec<EngineInfo>,
}

/// `GET /engines`
#[utoipa::path(
    get,
    path = "/engines",
    tag = "engines",
    responses(
        (status = 200, description = "Registered recognition engines", body = EnginesData),
    )
)]
pub async fn list_engines(State(state): State<AppState>) -> ApiResponse<EnginesData> {
    let engines = state
        .registry
        .names()
        .into_iter()
        .filter_map(|name| state.registry.get(&name))
        .map(|worker| EngineInfo {
            name: worker.name().to_string(),
            available: worker.is_available(),
        })
        .collect();

    ApiResponse::success(EnginesData { engines })
}
