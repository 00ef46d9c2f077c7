use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use skyseat_core::{CoreError, ErrorKind};

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    Core(CoreError),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Core(err)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::State => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::DependencyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, "unauthenticated", msg),
            AppError::Core(err) => {
                let kind = err.kind();
                let status = status_for(kind);
                if kind == ErrorKind::Internal {
                    tracing::error!("Internal Server Error: {}", err);
                    (status, kind.as_str(), "Internal Server Error".to_string())
                } else {
                    if kind == ErrorKind::DependencyUnavailable {
                        tracing::warn!("Dependency unavailable: {}", err);
                    }
                    (status, kind.as_str(), err.to_string())
                }
            }
        };

        let body = Json(json!({
            "error": error_message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CoreError::InvalidSeatNumber { seat: 0, capacity: 10 }, StatusCode::BAD_REQUEST),
            (CoreError::OrderNotFound("x".into()), StatusCode::NOT_FOUND),
            (CoreError::SeatTaken(4), StatusCode::CONFLICT),
            (
                CoreError::InvalidStateTransition { from: "PAID".into(), action: "pay".into() },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (CoreError::CatalogUnavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (CoreError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (CoreError::Storage("pool".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_authentication_error_is_401() {
        let resp = AppError::AuthenticationError("missing token".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
