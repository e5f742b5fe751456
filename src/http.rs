use crate::config::PokemonConfig;
use crate::debounce::SearchDebouncer;
use crate::error::AppError;
use crate::pokemon::{Entity, TypeTag};
use crate::store::{PokemonDetail, PokemonStore, StoreSnapshot};
use axum::{
    Json, Router, debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    store: Arc<PokemonStore>,
    debouncer: Arc<SearchDebouncer>,
}

impl AppState {
    pub fn new(store: Arc<PokemonStore>, debouncer: SearchDebouncer) -> Self {
        Self {
            store,
            debouncer: Arc::new(debouncer),
        }
    }

    pub fn from_config(store: Arc<PokemonStore>, config: &PokemonConfig) -> Self {
        let debouncer = SearchDebouncer::from_config(Arc::clone(&store), config);
        Self::new(store, debouncer)
    }
}

pub struct HttpError(AppError);

impl From<AppError> for HttpError {
    fn from(err: AppError) -> Self {
        HttpError(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Network { .. } | AppError::Client { .. } | AppError::Parse(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Persistence(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

type HttpResult<T> = Result<Json<T>, HttpError>;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    #[serde(flatten)]
    detail: PokemonDetail,
    favorite: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FavoriteResponse {
    pub id: u32,
    pub favorite: bool,
}

/// `/search` runs the query immediately. `/search/input` is for keystroke
/// streams: it debounces and answers 202, and the result shows up in `/pokemon`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/pokemon", get(list_handler))
        .route("/pokemon/refresh", post(refresh_handler))
        .route("/pokemon/more", post(more_handler))
        .route("/pokemon/{id}", get(detail_handler))
        .route("/search", get(search_handler))
        .route("/search/input", post(search_input_handler))
        .route("/types", get(types_handler))
        .route("/types/{name}/toggle", post(toggle_type_handler))
        .route("/filters/clear", post(clear_filters_handler))
        .route("/favorites", get(favorites_handler))
        .route("/favorites/{id}/toggle", post(toggle_favorite_handler))
        .route("/error", delete(clear_error_handler))
        .with_state(state)
}

#[debug_handler]
async fn list_handler(State(state): State<AppState>) -> Json<StoreSnapshot> {
    Json(state.store.snapshot())
}

#[debug_handler]
async fn refresh_handler(State(state): State<AppState>) -> HttpResult<StoreSnapshot> {
    state.store.fetch_pokemon_list(true).await?;
    Ok(Json(state.store.snapshot()))
}

#[debug_handler]
async fn more_handler(State(state): State<AppState>) -> HttpResult<StoreSnapshot> {
    state.store.fetch_more_pokemon().await?;
    Ok(Json(state.store.snapshot()))
}

#[debug_handler]
async fn detail_handler(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> HttpResult<DetailResponse> {
    let detail = state.store.fetch_pokemon_with_evolutions(id).await?;
    let favorite = state.store.is_favorite(detail.entity.id);
    Ok(Json(DetailResponse { detail, favorite }))
}

#[debug_handler]
async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Entity>> {
    state.store.search_pokemon(&params.q).await;
    Json(state.store.filtered_list())
}

#[debug_handler]
async fn search_input_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> StatusCode {
    state.debouncer.submit(params.q);
    StatusCode::ACCEPTED
}

#[debug_handler]
async fn types_handler(State(state): State<AppState>) -> Json<Vec<TypeTag>> {
    if state.store.snapshot().pokemon_types.is_empty() {
        state.store.fetch_pokemon_types().await;
    }
    Json(state.store.filterable_types())
}

#[debug_handler]
async fn toggle_type_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<StoreSnapshot> {
    state.store.toggle_type_filter(&name);
    Json(state.store.snapshot())
}

#[debug_handler]
async fn clear_filters_handler(State(state): State<AppState>) -> Json<StoreSnapshot> {
    state.store.clear_filters();
    Json(state.store.snapshot())
}

#[debug_handler]
async fn favorites_handler(State(state): State<AppState>) -> Json<Vec<Entity>> {
    Json(state.store.favorites())
}

#[debug_handler]
async fn toggle_favorite_handler(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> HttpResult<FavoriteResponse> {
    let entity = state.store.entity(id).await?;
    // Persistence completes in the background
    let _ = state.store.toggle_favorite(entity);
    Ok(Json(FavoriteResponse {
        id,
        favorite: state.store.is_favorite(id),
    }))
}

#[debug_handler]
async fn clear_error_handler(State(state): State<AppState>) -> StatusCode {
    state.store.clear_error();
    StatusCode::NO_CONTENT
}
