use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use skyseat_core::{CoreError, CoreResult, IdentityService, PassengerIdentity, Registration};
use std::time::Duration;
use tracing::{info, warn};

/// User service client used for admin-assisted booking.
///
/// * `GET  {base}/find-by-identity/{card}`
/// * `POST {base}/register-by-admin`
pub struct HttpIdentityService {
    http: reqwest::Client,
    base_url: Url,
    service_token: Option<String>,
}

/// User record as the user service returns it; ids may be numeric.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    id: Value,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    identity_card_number: Option<String>,
}

impl WireUser {
    fn into_identity(self) -> Option<PassengerIdentity> {
        let id = match self.id {
            Value::String(s) if !s.is_empty() => s,
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(PassengerIdentity {
            id,
            user_name: self.user_name,
            display_name: self.display_name,
            identity_card_number: self.identity_card_number,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    user: Option<WireUser>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    identity_card_number: &'a str,
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    user: Option<WireUser>,
    #[serde(default)]
    generated_password: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn reason(self) -> String {
        self.message.or(self.error).unwrap_or_default()
    }
}

impl HttpIdentityService {
    pub fn new(base_url: &str, timeout: Duration, service_token: Option<String>) -> CoreResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CoreError::Validation(format!("invalid identity url {base_url}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::IdentityUnavailable(e.to_string()))?;

        Ok(Self { http, base_url, service_token })
    }

    fn endpoint(&self, segments: &[&str]) -> CoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CoreError::IdentityUnavailable(format!("identity url {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.service_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

fn unavailable(e: reqwest::Error) -> CoreError {
    if e.is_timeout() {
        CoreError::IdentityUnavailable("request timed out".into())
    } else {
        CoreError::IdentityUnavailable(e.to_string())
    }
}

fn is_duplicate(status: StatusCode, reason: &str) -> bool {
    status == StatusCode::CONFLICT
        || (status == StatusCode::BAD_REQUEST && reason.to_lowercase().contains("already"))
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn find_by_identity(&self, identity_card_number: &str) -> CoreResult<Option<PassengerIdentity>> {
        let url = self.endpoint(&["find-by-identity", identity_card_number])?;
        let response = self.authorize(self.http.get(url)).send().await.map_err(unavailable)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CoreError::IdentityUnavailable(format!("lookup responded {status}")));
        }

        let body = response
            .json::<LookupResponse>()
            .await
            .map_err(|e| CoreError::IdentityUnavailable(format!("malformed lookup payload: {e}")))?;
        Ok(body.user.and_then(WireUser::into_identity))
    }

    async fn register(&self, identity_card_number: &str, display_name: &str) -> CoreResult<Registration> {
        let url = self.endpoint(&["register-by-admin"])?;
        let payload = RegisterRequest { identity_card_number, display_name };
        let response = self
            .authorize(self.http.post(url).json(&payload))
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(CoreError::IdentityUnavailable(format!("registration responded {status}")));
        }
        if !status.is_success() {
            let reason = response.json::<ErrorBody>().await.unwrap_or_default().reason();
            if is_duplicate(status, &reason) {
                return Err(CoreError::DuplicateIdentity(identity_card_number.to_string()));
            }
            warn!("Passenger registration rejected ({}): {}", status, reason);
            return Err(CoreError::IdentityRegistrationFailed(format!("{status}: {reason}")));
        }

        let body = response
            .json::<RegisterResponse>()
            .await
            .map_err(|e| CoreError::IdentityRegistrationFailed(format!("malformed registration payload: {e}")))?;

        match body.user.and_then(WireUser::into_identity) {
            Some(passenger) if body.success => {
                info!("Registered passenger {} on behalf of an administrator", passenger.id);
                Ok(Registration { passenger, generated_password: body.generated_password })
            }
            _ => Err(CoreError::IdentityRegistrationFailed(
                body.message.unwrap_or_else(|| "registration returned no user".into()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_escapes_card_number() {
        let svc = HttpIdentityService::new("http://users:3001", Duration::from_secs(1), None).unwrap();
        let url = svc.endpoint(&["find-by-identity", "0123 456"]).unwrap();
        assert_eq!(url.as_str(), "http://users:3001/find-by-identity/0123%20456");
    }

    #[test]
    fn test_duplicate_detection() {
        assert!(is_duplicate(StatusCode::CONFLICT, ""));
        assert!(is_duplicate(StatusCode::BAD_REQUEST, "Identity card number already registered"));
        assert!(!is_duplicate(StatusCode::BAD_REQUEST, "displayName is required"));
        assert!(!is_duplicate(StatusCode::FORBIDDEN, "already registered"));
    }

    #[test]
    fn test_register_response_shape() {
        let body: RegisterResponse = serde_json::from_str(
            r#"{"success":true,"user":{"id":"u-9","userName":"0123456","displayName":"Lan"},"generatedPassword":"x7Q!"}"#,
        )
        .unwrap();
        assert!(body.success);
        assert_eq!(body.user.and_then(WireUser::into_identity).unwrap().id, "u-9");
        assert_eq!(body.generated_password.as_deref(), Some("x7Q!"));
    }

    #[test]
    fn test_numeric_user_id() {
        let body: LookupResponse = serde_json::from_str(
            r#"{"success":true,"user":{"id":42,"identityCardNumber":"0123456","role":"Passenger"}}"#,
        )
        .unwrap();
        let user = body.user.and_then(WireUser::into_identity).unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.identity_card_number.as_deref(), Some("0123456"));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let svc = HttpIdentityService::new("http://127.0.0.1:9", Duration::from_millis(500), None).unwrap();
        let err = svc.find_by_identity("0123456").await.unwrap_err();
        assert!(matches!(err, CoreError::IdentityUnavailable(_)));
    }
}
