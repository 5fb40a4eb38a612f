use serde_json::Value;

use super::{
    client::{to_payload, ApiClient, HttpMethod, RequestOptions},
    error::ApiError,
    types::{LoginRequest, LoginResponse, TokenResponse, UserProfile, UserProfilePatch},
};

impl ApiClient {
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let payload = to_payload(request)?;
        self.request(HttpMethod::Post, "/login", Some(&payload), &RequestOptions::default())
            .await
    }

    /// `token` is the session being ended; the client's own token may already
    /// be cleared by then.
    pub async fn logout(&self, token: Option<String>) -> Result<(), ApiError> {
        let options = RequestOptions {
            bearer_override: token,
            ..RequestOptions::default()
        };
        self.envelope(HttpMethod::Post, "/logout", None, &options)
            .await
            .map(|_| ())
    }

    pub async fn get_user_info(&self) -> Result<UserProfile, ApiError> {
        let user: Option<UserProfile> = self.get("/user/info", None).await?;
        user.ok_or_else(|| ApiError::business(None, Some("User info missing from response".into())))
    }

    /// Returns the raw `data` object so callers can merge only the fields the
    /// server sent back.
    pub async fn update_user_info(&self, patch: &UserProfilePatch) -> Result<Option<Value>, ApiError> {
        self.put("/user/info", patch).await
    }

    pub async fn refresh_token(&self) -> Result<TokenResponse, ApiError> {
        let response: Option<TokenResponse> = self
            .request(HttpMethod::Post, "/token/refresh", None, &RequestOptions::default())
            .await?;
        response.ok_or_else(|| ApiError::business(None, Some("Token missing from response".into())))
    }
}
