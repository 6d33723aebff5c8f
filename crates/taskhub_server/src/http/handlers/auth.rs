//! Registration and login endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::Json;
use taskhub_core::model::user::{Credentials, ExternalTokenInput, RegisterUser};
use taskhub_core::service::identity::verify_external_token;
use taskhub_core::ServiceError;

use crate::blocking;
use crate::http::error::ApiError;
use crate::http::resources::{Data, UserResource};
use crate::http::upload::{is_multipart, read_register_form};
use crate::AppState;

/// Accepts JSON, or `multipart/form-data` when a picture is attached.
pub async fn register(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Data<UserResource>>, ApiError> {
    let (input, picture) = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state).await?;
        read_register_form(multipart).await?
    } else {
        let Json(input) = Json::<RegisterUser>::from_request(request, &state).await?;
        (input, None)
    };

    let user = state
        .identity(move |gateway| gateway.register(&input, picture.as_ref()))
        .await?;
    Ok(Json(Data::new(user.into())))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Data<UserResource>>, ApiError> {
    let Json(credentials) = payload?;
    let user = state
        .identity(move |gateway| gateway.login(&credentials))
        .await?;
    Ok(Json(Data::new(user.into())))
}

/// The provider round-trip runs before the store lock is taken.
pub async fn login_with_google(
    State(state): State<AppState>,
    payload: Result<Json<ExternalTokenInput>, JsonRejection>,
) -> Result<Json<Data<UserResource>>, ApiError> {
    let Json(input) = payload?;
    let token = input.id_token.ok_or(ServiceError::Unauthorized)?;

    let verifier = Arc::clone(&state.verifier);
    let claims = blocking(move || verify_external_token(verifier.as_ref(), &token)).await?;
    let user = state
        .identity(move |gateway| gateway.provision_external_user(&claims))
        .await?;
    Ok(Json(Data::new(user.into())))
}
