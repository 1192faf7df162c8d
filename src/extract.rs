//! Body and path extractors whose rejections come back as the JSON envelope
//! instead of axum's plain-text bodies. Parse details stay in the log.

use axum::{
    async_trait,
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Multipart, Path, Request,
    },
    http::request::Parts,
    Json,
};
use tracing::warn;

use crate::error::ApiError;

pub const INVALID_BODY: &str = "Invalid request body";
pub const INVALID_FORM: &str = "Invalid form data";
pub const INVALID_PATH: &str = "Invalid path parameter";

/// `Json<T>` with an enveloped 400 on any rejection.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                warn!(
                    status = %rejection.status(),
                    error = %rejection.body_text(),
                    "json body rejected"
                );
                Err(ApiError::validation(INVALID_BODY))
            }
        }
    }
}

/// `Multipart` with an enveloped 400 when the request is not a valid form.
pub struct ApiMultipart(pub Multipart);

#[async_trait]
impl<S> FromRequest<S> for ApiMultipart
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Multipart::from_request(req, state).await {
            Ok(mp) => Ok(ApiMultipart(mp)),
            Err(rejection) => {
                let rejection: MultipartRejection = rejection;
                warn!(error = %rejection.body_text(), "multipart body rejected");
                Err(ApiError::validation(INVALID_FORM))
            }
        }
    }
}

/// `Path<T>` with an enveloped 400 when a segment does not deserialize.
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => {
                warn!(error = %rejection.body_text(), "path rejected");
                Err(ApiError::validation(INVALID_PATH))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        name: String,
    }

    fn json_request(body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn malformed_json_hides_parser_detail() {
        let err = ApiJson::<Payload>::from_request(json_request("{not json"), &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), INVALID_BODY);
    }

    #[tokio::test]
    async fn well_formed_json_passes_through() {
        let req = json_request(r#"{"name":"Erin"}"#);
        let ApiJson(payload) = ApiJson::<Payload>::from_request(req, &()).await.ok().unwrap();
        assert_eq!(payload.name, "Erin");
    }

    #[tokio::test]
    async fn non_multipart_request_is_a_validation_error() {
        let err = ApiMultipart::from_request(json_request("{}"), &()).await.err().unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), INVALID_FORM);
    }
}
