//! Validated JSON extractor for Axum
//!
//! `ValidatedJson<T>` works like `axum::Json<T>`, but additionally runs
//! `validator::Validate::validate()` on the deserialized value.
//! Malformed JSON is answered with 400, a body of the wrong shape or one
//! failing validation with 422, both in the standard envelope.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use super::ApiResponse;

/// An extractor that deserializes JSON and validates it.
///
/// # Usage
///
/// ```ignore
/// use validator::Validate;
///
/// #[derive(Deserialize, Validate)]
/// #[serde(rename_all = "camelCase")]
/// struct GateEvent {
///     #[validate(length(min = 1, max = 20))]
///     plate_number: String,
///     #[validate(length(min = 1))]
///     parking_code: String,
/// }
///
/// async fn handler(ValidatedJson(body): ValidatedJson<GateEvent>) {
///     // `body` is guaranteed to pass validation
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

/// Error type for `ValidatedJson` extraction failures.
pub enum ValidatedJsonRejection {
    /// JSON parsing failed.
    JsonError(JsonRejection),
    /// Validation failed.
    ValidationError(validator::ValidationErrors),
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        match self {
            Self::JsonError(rejection) => {
                // Syntax errors are 400, well-formed JSON of the wrong shape is 422.
                let status = rejection.status();
                let body = ApiResponse::<()>::error(format!("Invalid JSON: {}", rejection.body_text()));
                (status, Json(body)).into_response()
            }
            Self::ValidationError(errors) => {
                let body = ApiResponse::<()>::error(validation_message(&errors));
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
        }
    }
}

/// `field: message` pairs joined by `; `, ordered by field name so the
/// message is stable across runs. Fields are reported in camelCase, the
/// way clients send them.
fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    let parts: Vec<String> = fields
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = camel_case(&field);
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{}: {}", field, msg),
                None => format!("{}: invalid ({})", field, e.code),
            })
        })
        .collect();

    if parts.is_empty() {
        "Validation failed".to_string()
    } else {
        parts.join("; ")
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(
        req: axum::extract::Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::JsonError)?;

        value
            .validate()
            .map_err(ValidatedJsonRejection::ValidationError)?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct SlotBody {
        #[validate(length(min = 1, max = 20))]
        code: String,
        #[validate(range(min = 1))]
        total_spaces: i32,
    }

    async fn handler(ValidatedJson(_body): ValidatedJson<SlotBody>) -> &'static str {
        "ok"
    }

    fn app() -> Router {
        Router::new().route("/slots", post(handler))
    }

    async fn send(req: Request<Body>) -> axum::http::Response<Body> {
        use tower::Service;
        let mut svc = app().into_service();
        svc.call(req).await.unwrap()
    }

    #[tokio::test]
    async fn valid_body_returns_ok() {
        let body = serde_json::json!({"code": "A-01", "totalSpaces": 10});
        let req = Request::builder()
            .method("POST")
            .uri("/slots")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        let resp = send(req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_json_returns_400() {
        let req = Request::builder()
            .method("POST")
            .uri("/slots")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();

        let resp = send(req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn validation_failure_returns_422() {
        let body = serde_json::json!({"code": "", "totalSpaces": 0});
        let req = Request::builder()
            .method("POST")
            .uri("/slots")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        let resp = send(req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("code: "), "{message}");
        assert!(message.contains("totalSpaces: "), "{message}");
    }

    #[test]
    fn snake_case_fields_are_reported_in_camel_case() {
        assert_eq!(camel_case("plate_number"), "plateNumber");
        assert_eq!(camel_case("code"), "code");
    }

    #[tokio::test]
    async fn missing_field_is_rejected_before_validation() {
        let body = serde_json::json!({"code": "A-01"});
        let req = Request::builder()
            .method("POST")
            .uri("/slots")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        let resp = send(req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
