//! Adapter from the HTTP client to the engine's API-client contract

use cplnkit::{Client, ClientConfig};
use reconcile::{ApiClient, ApiError, DomainObject};
use serde_json::Value;

/// The management API as seen by the engine
pub struct CplnBackend {
    client: Client,
}

impl CplnBackend {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

fn api_error(err: cplnkit::Error) -> ApiError {
    log::debug!("API error ({}): {err}", err.category().description());
    ApiError::new(err.status(), err.to_string())
}

fn decode(value: Value) -> Result<DomainObject, ApiError> {
    DomainObject::from_json(value).map_err(|e| ApiError::new(None, format!("invalid response: {e}")))
}

impl ApiClient for CplnBackend {
    fn get(&self, kind: &str, scope: Option<&str>, name: &str) -> Result<DomainObject, ApiError> {
        let value = self.client.get(kind, scope, name).map_err(api_error)?;
        decode(value)
    }

    fn create(&self, kind: &str, scope: Option<&str>, object: &DomainObject) -> Result<DomainObject, ApiError> {
        let value = self
            .client
            .create(kind, scope, &object.to_json())
            .map_err(api_error)?;
        decode(value)
    }

    fn update(
        &self,
        kind: &str,
        scope: Option<&str>,
        name: &str,
        patch: &DomainObject,
    ) -> Result<DomainObject, ApiError> {
        let value = self
            .client
            .update(kind, scope, name, &patch.to_json())
            .map_err(api_error)?;
        decode(value)
    }

    fn delete(&self, kind: &str, scope: Option<&str>, name: &str) -> Result<(), ApiError> {
        self.client.delete(kind, scope, name).map_err(api_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_keeps_status_and_body() {
        let err = api_error(cplnkit::Error::Status {
            status: 409,
            body: "already exists".into(),
        });
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "status: 409, body: already exists");

        let err = api_error(cplnkit::Error::Network {
            message: "timeout".into(),
        });
        assert_eq!(err.status, None);
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        assert!(decode(serde_json::json!({"name": "prod", "kind": "gvc"})).is_ok());
        assert!(decode(serde_json::json!("prod")).is_err());
    }
}
