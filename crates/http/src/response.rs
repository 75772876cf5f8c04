//! Success envelope shared by module handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// `{"status": "success", "message"?: ..., "data"?: ...}` with a status code.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status_code: StatusCode,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
}

impl<T> ApiResponse<T> {
    /// 200 response carrying `data`
    pub fn ok(data: T) -> Self {
        Self {
            status_code: StatusCode::OK,
            message: None,
            data: Some(data),
        }
    }

    /// 201 response carrying `data`
    pub fn created(data: T) -> Self {
        Self {
            status_code: StatusCode::CREATED,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }
}

impl ApiResponse<()> {
    /// 200 response with only a message and no `data` key
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::OK,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let envelope = Envelope {
            status: "success",
            message: self.message.as_deref(),
            data: self.data.as_ref(),
        };

        (self.status_code, Json(envelope)).into_response()
    }
}
