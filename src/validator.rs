use anyhow::anyhow;
use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::utils::errors::AppError;

/// JSON extractor that runs `validator` rules after deserialization.
///
/// Malformed bodies (missing fields, wrong types, wrong content type)
/// reject with 400; bodies that deserialize but break a validation rule
/// (short password, bad email, empty name) reject with 422. Both reject
/// with the same `{"message": ...}` body as every other error in the API.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

fn collect_messages(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            match &error.message {
                Some(message) => messages.push(message.to_string()),
                None => messages.push(format!("{} is invalid", field)),
            }
        }
    }
    messages.join(", ")
}

fn rejection_error(rejection: JsonRejection) -> AppError {
    let detail = rejection.body_text();
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::bad_request(anyhow!("Expected 'Content-Type: application/json'"))
        }
        JsonRejection::JsonDataError(_) => {
            // serde reports absent and mistyped DTO fields here.
            if let Some(field) = detail
                .split("missing field `")
                .nth(1)
                .and_then(|s| s.split('`').next())
            {
                AppError::bad_request(anyhow!("{} is required", field))
            } else if detail.contains("invalid type") {
                AppError::bad_request(anyhow!("Invalid field type in request"))
            } else {
                AppError::bad_request(anyhow!("Invalid request body"))
            }
        }
        _ => AppError::bad_request(anyhow!("Invalid request body")),
    }
}

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_error)?;

        value
            .validate()
            .map_err(|errors| AppError::unprocessable(anyhow!("{}", collect_messages(&errors))))?;

        Ok(ValidatedJson(value))
    }
}
