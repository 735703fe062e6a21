//! External collaborators: the authentication service and the employee directory.
//!
//! The session manager only depends on the [`AuthProvider`] and
//! [`EmployeeDirectory`] traits. The reqwest implementations talk to the
//! portal's REST API and are enabled by the `http-provider` feature.

use crate::errors::{AuthError, Result, UpstreamError};
use crate::user::UserRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body returned by the authentication service on success.
///
/// The service is not consistent about where it puts the role, so `role`
/// and `user` stay untyped until [`crate::session::extract_role`] reads them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LoginResponse {
    /// The response's user as a record, if it carried one.
    pub fn user_record(&self) -> Result<Option<UserRecord>> {
        match &self.user {
            None | Some(Value::Null) => Ok(None),
            Some(user) => Ok(Some(serde_json::from_value(user.clone())?)),
        }
    }

    /// Token when present and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

/// The authentication service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange credentials for a login response. Errors are passed to the
    /// caller unchanged.
    async fn login(&self, email: &str, password: &str)
    -> std::result::Result<LoginResponse, UpstreamError>;
}

/// The employee/profile service.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Full profile record for an employee.
    async fn get_by_id(
        &self,
        id: &str,
        token: &str,
    ) -> std::result::Result<UserRecord, UpstreamError>;
}

#[cfg(feature = "http-provider")]
pub use http::{HttpAuthProvider, HttpEmployeeDirectory};

#[cfg(feature = "http-provider")]
mod http {
    use super::*;
    use crate::config::ProviderConfig;
    use reqwest::{Client, Response, StatusCode};

    #[derive(Serialize)]
    struct LoginRequest<'a> {
        email: &'a str,
        password: &'a str,
    }

    fn build_client(config: &ProviderConfig) -> Result<Client> {
        Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AuthError::configuration(format!("Failed to build HTTP client: {e}")))
    }

    fn join_url(base: &str, path: &str) -> String {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Pulls `message` (or `error`) out of an error body, falling back to the status text.
    async fn error_message(response: Response) -> (StatusCode, String) {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        (status, message)
    }

    /// `POST {base_url}{login_path}` with `{ email, password }`.
    #[derive(Debug, Clone)]
    pub struct HttpAuthProvider {
        client: Client,
        login_url: String,
    }

    impl HttpAuthProvider {
        pub fn new(config: &ProviderConfig) -> Result<Self> {
            Ok(Self {
                client: build_client(config)?,
                login_url: join_url(&config.base_url, &config.login_path),
            })
        }
    }

    #[async_trait]
    impl AuthProvider for HttpAuthProvider {
        async fn login(
            &self,
            email: &str,
            password: &str,
        ) -> std::result::Result<LoginResponse, UpstreamError> {
            tracing::debug!(url = %self.login_url, email, "Sending login request");
            let response = self
                .client
                .post(&self.login_url)
                .json(&LoginRequest { email, password })
                .send()
                .await?;

            if !response.status().is_success() {
                let (status, message) = error_message(response).await;
                tracing::warn!(status = status.as_u16(), %message, "Login rejected upstream");
                return Err(match status {
                    StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        UpstreamError::Rejected { message }
                    }
                    _ => UpstreamError::Status {
                        status: status.as_u16(),
                        message,
                    },
                });
            }

            Ok(response.json::<LoginResponse>().await?)
        }
    }

    /// `GET {base_url}{employee_path}/{id}` with the session's bearer token.
    #[derive(Debug, Clone)]
    pub struct HttpEmployeeDirectory {
        client: Client,
        employees_url: String,
    }

    impl HttpEmployeeDirectory {
        pub fn new(config: &ProviderConfig) -> Result<Self> {
            Ok(Self {
                client: build_client(config)?,
                employees_url: join_url(&config.base_url, &config.employee_path),
            })
        }
    }

    #[async_trait]
    impl EmployeeDirectory for HttpEmployeeDirectory {
        async fn get_by_id(
            &self,
            id: &str,
            token: &str,
        ) -> std::result::Result<UserRecord, UpstreamError> {
            let url = join_url(&self.employees_url, id);
            let response = self.client.get(&url).bearer_auth(token).send().await?;

            match response.status() {
                status if status.is_success() => Ok(response.json::<UserRecord>().await?),
                StatusCode::NOT_FOUND => Err(UpstreamError::NotFound { id: id.to_string() }),
                _ => {
                    let (status, message) = error_message(response).await;
                    Err(UpstreamError::Status {
                        status: status.as_u16(),
                        message,
                    })
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_join_url_handles_slashes() {
            assert_eq!(join_url("http://h/api/", "/auth/login"), "http://h/api/auth/login");
            assert_eq!(join_url("http://h/api", "auth/login"), "http://h/api/auth/login");
        }
    }
}
