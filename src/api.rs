use log::error;
use rocket::{
    http::Status,
    request::Request,
    response::{self, Responder, status::Custom},
    serde::json::{Json, Value as JsonValue, json},
};

use crate::store::StoreError;


pub type JsonResult = Result<Json<JsonValue>, ApiError>;


#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!("Store failure: {}", err);
        ApiError::Internal(err.to_string())
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        Custom(self.status(), failure(&self.to_string())).respond_to(req)
    }
}


pub fn success(mut payload: JsonValue) -> Json<JsonValue> {
    if let Some(map) = payload.as_object_mut() {
        map.insert("success".into(), JsonValue::Bool(true));
    }
    Json(payload)
}

pub fn failure(message: &str) -> Json<JsonValue> {
    Json(json!({
        "success": false,
        "error": message,
    }))
}


#[catch(400)]
pub fn bad_request() -> Json<JsonValue> {
    failure("Bad request")
}

#[catch(404)]
pub fn not_found() -> Json<JsonValue> {
    failure("Not found")
}

#[catch(422)]
pub fn unprocessable() -> Json<JsonValue> {
    failure("Unprocessable request")
}

#[catch(500)]
pub fn internal_error() -> Json<JsonValue> {
    failure("Internal server error")
}
