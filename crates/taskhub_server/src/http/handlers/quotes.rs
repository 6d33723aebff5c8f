//! Quote endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use taskhub_core::model::quote::QuoteInput;
use taskhub_core::service::ownership::QuotePath;
use taskhub_core::EntityKind;

use crate::http::error::{parse_id, ApiError};
use crate::http::resources::{collect, Data, Deleted, QuoteResource};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    user_id: String,
    quote_id: String,
}

impl QuoteParams {
    fn parse(&self) -> Result<QuotePath, ApiError> {
        Ok(QuotePath {
            user_id: parse_id(EntityKind::User, &self.user_id)?,
            quote_id: parse_id(EntityKind::Quote, &self.quote_id)?,
        })
    }
}

pub async fn list_quotes(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Data<Vec<QuoteResource>>>, ApiError> {
    let user_id = parse_id(EntityKind::User, &user_id)?;
    let quotes = state
        .resources(move |service| service.list_quotes(user_id))
        .await?;
    Ok(Json(Data::new(collect(quotes))))
}

pub async fn create_quote(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<QuoteInput>, JsonRejection>,
) -> Result<Json<Data<QuoteResource>>, ApiError> {
    let user_id = parse_id(EntityKind::User, &user_id)?;
    let Json(input) = payload?;
    let quote = state
        .resources(move |service| service.create_quote(user_id, input))
        .await?;
    Ok(Json(Data::new(quote.into())))
}

pub async fn show_quote(
    State(state): State<AppState>,
    Path(params): Path<QuoteParams>,
) -> Result<Json<Data<QuoteResource>>, ApiError> {
    let path = params.parse()?;
    let quote = state
        .resources(move |service| service.get_quote(path))
        .await?;
    Ok(Json(Data::new(quote.into())))
}

pub async fn update_quote(
    State(state): State<AppState>,
    Path(params): Path<QuoteParams>,
    payload: Result<Json<QuoteInput>, JsonRejection>,
) -> Result<Json<Data<QuoteResource>>, ApiError> {
    let path = params.parse()?;
    let Json(input) = payload?;
    let quote = state
        .resources(move |service| service.update_quote(path, &input))
        .await?;
    Ok(Json(Data::new(quote.into())))
}

pub async fn delete_quote(
    State(state): State<AppState>,
    Path(params): Path<QuoteParams>,
) -> Result<Json<Deleted>, ApiError> {
    let path = params.parse()?;
    state
        .resources(move |service| service.delete_quote(path))
        .await?;
    Ok(Json(Deleted::of(EntityKind::Quote)))
}
