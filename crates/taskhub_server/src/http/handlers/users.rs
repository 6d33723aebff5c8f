//! Account administration endpoints.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use taskhub_core::model::user::RegisterUser;
use taskhub_core::EntityKind;

use crate::http::error::{parse_id, ApiError};
use crate::http::resources::{collect, Data, Deleted, UserResource};
use crate::http::upload::read_picture_form;
use crate::AppState;

pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Data<Vec<UserResource>>>, ApiError> {
    let users = state.identity(|gateway| gateway.list_users()).await?;
    Ok(Json(Data::new(collect(users))))
}

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUser>, JsonRejection>,
) -> Result<Json<Data<UserResource>>, ApiError> {
    let Json(input) = payload?;
    let user = state
        .identity(move |gateway| gateway.create_user(&input))
        .await?;
    Ok(Json(Data::new(user.into())))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let user_id = parse_id(EntityKind::User, &user_id)?;
    state
        .identity(move |gateway| gateway.delete_user(user_id))
        .await?;
    Ok(Json(Deleted::of(EntityKind::User)))
}

pub async fn update_profile_picture(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Data<UserResource>>, ApiError> {
    let user_id = parse_id(EntityKind::User, &user_id)?;
    let multipart = multipart?;
    let upload = read_picture_form(multipart).await?;
    let user = state
        .identity(move |gateway| gateway.update_profile_picture(user_id, &upload))
        .await?;
    Ok(Json(Data::new(user.into())))
}
