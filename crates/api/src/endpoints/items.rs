//! Item endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use club_common::AppResult;
use club_core::ItemInput;

use crate::{extractors::AuthUser, middleware::AppState, response::ItemResponse};

async fn list_items(State(state): State<AppState>) -> AppResult<Json<Vec<ItemResponse>>> {
    let items = state.item_service.list().await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

async fn create_item(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ItemInput>,
) -> AppResult<(StatusCode, Json<ItemResponse>)> {
    let item = state.item_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ItemResponse>> {
    Ok(Json(state.item_service.get(&id).await?.into()))
}

async fn update_item(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ItemInput>,
) -> AppResult<Json<ItemResponse>> {
    Ok(Json(state.item_service.update(&id, input).await?.into()))
}

async fn delete_item(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.item_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route(
            "/{id}",
            get(get_item)
                .put(update_item)
                .patch(update_item)
                .delete(delete_item),
        )
}
