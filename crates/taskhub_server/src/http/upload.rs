//! `multipart/form-data` readers for account forms and profile pictures.

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use taskhub_core::model::user::RegisterUser;
use taskhub_core::{ImageUpload, ValidationErrors};

use crate::http::error::ApiError;

pub const PICTURE_FIELD: &str = "profile_picture";

pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        })
}

/// Reads registration fields plus an optional picture. Unknown fields are
/// skipped.
pub async fn read_register_form(
    mut multipart: Multipart,
) -> Result<(RegisterUser, Option<ImageUpload>), ApiError> {
    let mut input = RegisterUser::default();
    let mut picture = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some(PICTURE_FIELD) => picture = read_image(field).await?,
            Some("name") => input.name = Some(field.text().await?),
            Some("email") => input.email = Some(field.text().await?),
            Some("password") => input.password = Some(field.text().await?),
            Some("password_confirmation") => {
                input.password_confirmation = Some(field.text().await?)
            }
            _ => {}
        }
    }
    Ok((input, picture))
}

/// Reads the required `profile_picture` part.
pub async fn read_picture_form(mut multipart: Multipart) -> Result<ImageUpload, ApiError> {
    let mut picture = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(PICTURE_FIELD) {
            picture = read_image(field).await?;
        }
    }
    picture.ok_or_else(|| {
        ValidationErrors::single(PICTURE_FIELD, "The profile picture field is required.").into()
    })
}

/// An empty part without a file name means "no file chosen".
async fn read_image(field: Field<'_>) -> Result<Option<ImageUpload>, ApiError> {
    let content_type = field.content_type().map(ToString::to_string);
    let has_file_name = field.file_name().is_some_and(|name| !name.is_empty());
    let bytes = field.bytes().await?;
    if bytes.is_empty() && !has_file_name {
        return Ok(None);
    }
    Ok(Some(ImageUpload::new(bytes.to_vec(), content_type)))
}

#[cfg(test)]
mod tests {
    use super::is_multipart;
    use axum::http::header::CONTENT_TYPE;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn detects_multipart_content_type() {
        let mut headers = HeaderMap::new();
        assert!(!is_multipart(&headers));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("Multipart/Form-Data; boundary=xyz"),
        );
        assert!(is_multipart(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(!is_multipart(&headers));
    }
}
