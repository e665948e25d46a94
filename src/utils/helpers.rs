use actix_web::{error::InternalError, http::StatusCode, web, HttpResponse};
use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            message: None,
            data: None,
            error: Some(message),
        }
    }
}

impl ApiResponse<()> {
    pub fn to_response(&self, status: StatusCode) -> HttpResponse {
        HttpResponse::build(status).json(self)
    }
}

/// Shorthand for an error envelope with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    ApiResponse::<()>::error(message.into()).to_response(status)
}

/// Error usable from extractors so rejections still carry the JSON envelope.
pub fn envelope_error(status: StatusCode, message: impl Into<String>) -> actix_web::Error {
    let message = message.into();
    InternalError::from_response(message.clone(), error_response(status, message)).into()
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| {
            let message = format!("Invalid request body: {}", err);
            envelope_error(StatusCode::BAD_REQUEST, message)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_omits_empty_fields() {
        let body = serde_json::to_value(ApiResponse::success(json!({ "id": 1 }))).unwrap();
        assert_eq!(body, json!({ "success": true, "data": { "id": 1 } }));
    }

    #[test]
    fn error_envelope_carries_message() {
        let body = serde_json::to_value(ApiResponse::<()>::error("nope".to_string())).unwrap();
        assert_eq!(body, json!({ "success": false, "error": "nope" }));
    }

    #[test]
    fn message_is_included_when_given() {
        let body = serde_json::to_value(ApiResponse::success_with_message(
            3,
            "created".to_string(),
        ))
        .unwrap();
        assert_eq!(body["message"], "created");
        assert_eq!(body["data"], 3);
    }

    #[actix_web::test]
    async fn malformed_json_gets_envelope() {
        use actix_web::{test, App};

        #[derive(serde::Deserialize)]
        struct Body {
            #[allow(dead_code)]
            name: String,
        }

        let app = test::init_service(App::new().app_data(json_config()).route(
            "/echo",
            web::post().to(|_: web::Json<Body>| async { HttpResponse::Ok().finish() }),
        ))
        .await;

        let req = test::TestRequest::post()
            .uri("/echo")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
    }
}
