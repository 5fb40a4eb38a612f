use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use leptos::*;
use serde::{Deserialize, Serialize};

use super::sequence::{Flight, RequestSequence};
use crate::{
    api::{client::to_payload, ApiClient, ApiError, LoginRequest, UserProfile, UserProfilePatch},
    utils::{
        jwt,
        storage::{KeyValueStore, StorageSlot, SESSION_KEY},
        time,
    },
};

pub const INACTIVITY_LIMIT_MINUTES: i64 = 30;
pub const DISPLAY_NAME_PLACEHOLDER: &str = "User";
pub const DEFAULT_AVATAR: &str = "/default-avatar.png";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
    Refreshing,
}

/// Persisted fields are the credential, the profile and the timestamps;
/// `loading`, `error` and `phase` only live in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
    pub is_logged_in: bool,
    pub login_time: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub loading: bool,
    #[serde(skip)]
    pub error: Option<String>,
    #[serde(skip)]
    pub phase: SessionPhase,
}

impl Session {
    fn authenticated(token: String, user: UserProfile, now: DateTime<Utc>) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
            is_logged_in: true,
            login_time: Some(now),
            last_activity: Some(now),
            loading: false,
            error: None,
            phase: SessionPhase::Authenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_logged_in && self.token.is_some() && self.user.is_some()
    }

    pub fn display_name(&self) -> String {
        self.user
            .as_ref()
            .map(|user| user.username.clone())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DISPLAY_NAME_PLACEHOLDER.to_string())
    }

    pub fn avatar(&self) -> String {
        self.user
            .as_ref()
            .and_then(|user| user.avatar.clone())
            .filter(|avatar| !avatar.is_empty())
            .unwrap_or_else(|| DEFAULT_AVATAR.to_string())
    }

    pub fn roles(&self) -> &[String] {
        self.user.as_ref().map(|u| u.roles.as_slice()).unwrap_or(&[])
    }

    pub fn permissions(&self) -> &[String] {
        self.user
            .as_ref()
            .map(|u| u.permissions.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles().iter().any(|r| r == role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions().iter().any(|p| p == permission)
    }

    /// Whole minutes since login; 0 when there was no login.
    pub fn session_duration_minutes(&self, now: DateTime<Utc>) -> i64 {
        self.login_time
            .map(|login| (now - login).num_minutes().max(0))
            .unwrap_or(0)
    }

    pub fn is_inactive(&self, now: DateTime<Utc>) -> bool {
        self.last_activity
            .map(|last| now - last > Duration::minutes(INACTIVITY_LIMIT_MINUTES))
            .unwrap_or(false)
    }
}

/// Owns the session signal and every mutation of it. Cheap to clone; clones
/// share state, client and storage.
#[derive(Clone)]
pub struct SessionStore {
    state: RwSignal<Session>,
    api: ApiClient,
    storage: StorageSlot<Session>,
    sequence: Rc<RequestSequence>,
}

impl SessionStore {
    pub fn new(api: ApiClient, backend: Rc<dyn KeyValueStore>) -> Self {
        api.set_token(None);
        Self {
            state: create_rw_signal(Session::default()),
            api,
            storage: StorageSlot::new(backend, SESSION_KEY),
            sequence: Rc::new(RequestSequence::default()),
        }
    }

    pub fn state(&self) -> ReadSignal<Session> {
        self.state.read_only()
    }

    pub fn snapshot(&self) -> Session {
        self.state.get_untracked()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub async fn login(&self, credentials: LoginRequest) -> Result<UserProfile, ApiError> {
        if credentials.username.trim().is_empty() || credentials.password.trim().is_empty() {
            return self.fail(ApiError::local("Username and password are required"));
        }

        let ticket = self.sequence.begin(Flight::Login);
        let previous = self.state.with_untracked(|s| s.phase);
        self.state.update(|s| {
            s.loading = true;
            s.error = None;
            s.phase = SessionPhase::Authenticating;
        });

        let result = self.api.login(&credentials).await;
        if !self.sequence.is_current(&ticket) {
            log::debug!("discarding stale login response for {}", credentials.username);
            return Err(ApiError::superseded("login"));
        }

        match result {
            Ok(response) => {
                // Calls still in flight belong to the previous session.
                self.sequence.invalidate_all();
                self.api.set_token(Some(response.token.clone()));
                self.state.set(Session::authenticated(
                    response.token,
                    response.user.clone(),
                    time::now(),
                ));
                self.persist();
                log::info!("login succeeded for {}", response.user.username);
                Ok(response.user)
            }
            Err(error) => {
                self.state.update(|s| s.phase = previous);
                log::warn!("login failed for {}: {}", credentials.username, error);
                self.fail(error)
            }
        }
    }

    /// Local state is cleared before the backend is told, so the session is
    /// gone even when the call fails. Without a token nothing is sent.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let token = self
            .state
            .with_untracked(|s| s.token.clone())
            .or_else(|| self.api.token());
        self.reset(None);

        let Some(token) = token else {
            return Ok(());
        };
        let epoch = self.sequence.epoch();
        match self.api.logout(Some(token)).await {
            Ok(()) => Ok(()),
            Err(error) => {
                log::warn!("backend logout failed: {}", error);
                if self.sequence.is_same_epoch(epoch) {
                    self.state.update(|s| s.error = Some(error.message.clone()));
                }
                Err(error)
            }
        }
    }

    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        if self.state.with_untracked(|s| s.token.is_none()) {
            return self.fail(ApiError::local("Not logged in"));
        }

        let ticket = self.sequence.begin(Flight::Profile);
        self.state.update(|s| s.loading = true);

        let result = self.api.get_user_info().await;
        if !self.sequence.is_current(&ticket) {
            log::debug!("discarding stale profile response");
            return Err(ApiError::superseded("fetch_profile"));
        }

        match result {
            Ok(user) => {
                let now = time::now();
                self.state.update(|s| {
                    s.user = Some(user.clone());
                    s.is_logged_in = s.token.is_some();
                    s.last_activity = Some(s.last_activity.map_or(now, |prev| prev.max(now)));
                    s.phase = SessionPhase::Authenticated;
                    s.loading = false;
                    s.error = None;
                });
                self.persist();
                Ok(user)
            }
            Err(error) => self.recover(error),
        }
    }

    /// Merges whatever the server returns over the loaded profile. An empty
    /// `data` means the server accepted the patch as sent.
    pub async fn update_profile(&self, patch: UserProfilePatch) -> Result<UserProfile, ApiError> {
        if self.state.with_untracked(|s| s.user.is_none()) {
            return self.fail(ApiError::local("No user profile loaded"));
        }
        let epoch = self.sequence.epoch();
        self.state.update(|s| s.loading = true);

        let result = self.api.update_user_info(&patch).await;
        if !self.sequence.is_same_epoch(epoch) {
            log::debug!("discarding profile update for a previous session");
            return Err(ApiError::superseded("update_profile"));
        }

        let server = match result {
            Ok(Some(data)) => data,
            Ok(None) => match to_payload(&patch) {
                Ok(sent) => sent,
                Err(error) => return self.fail(error),
            },
            Err(error) => return self.recover(error),
        };

        let Some(current) = self.state.with_untracked(|s| s.user.clone()) else {
            return Err(ApiError::superseded("update_profile"));
        };
        let merged = match current.merged_with(&server) {
            Ok(merged) => merged,
            Err(e) => {
                log::warn!("profile update returned an unusable object: {}", e);
                return self.fail(ApiError::malformed_response());
            }
        };

        self.state.update(|s| {
            s.user = Some(merged.clone());
            s.loading = false;
            s.error = None;
        });
        self.persist();
        Ok(merged)
    }

    /// Any failure ends the session; a stale token is never kept.
    pub async fn refresh_token(&self) -> Result<String, ApiError> {
        if self.state.with_untracked(|s| s.token.is_none()) {
            return self.fail(ApiError::local("No token to refresh"));
        }

        let ticket = self.sequence.begin(Flight::Refresh);
        self.state.update(|s| {
            s.loading = true;
            s.phase = SessionPhase::Refreshing;
        });

        let result = self.api.refresh_token().await;
        if !self.sequence.is_current(&ticket) {
            log::debug!("discarding stale token refresh");
            return Err(ApiError::superseded("refresh_token"));
        }

        match result {
            Ok(response) => {
                let now = time::now();
                self.api.set_token(Some(response.token.clone()));
                self.state.update(|s| {
                    s.token = Some(response.token.clone());
                    s.last_activity = Some(s.last_activity.map_or(now, |prev| prev.max(now)));
                    s.phase = SessionPhase::Authenticated;
                    s.loading = false;
                    s.error = None;
                });
                self.persist();
                Ok(response.token)
            }
            Err(error) => {
                log::warn!("token refresh failed: {}", error);
                self.expire(&error.message);
                Err(error)
            }
        }
    }

    /// Refreshes when the token's `exp` claim falls within `threshold`.
    /// Returns whether a refresh happened. Opaque tokens never expire here.
    pub async fn ensure_fresh_token(&self, threshold: Duration) -> Result<bool, ApiError> {
        let Some(token) = self.state.with_untracked(|s| s.token.clone()) else {
            return Ok(false);
        };
        match jwt::expires_at(&token) {
            Some(expires_at) if expires_at - time::now() <= threshold => {
                self.refresh_token().await.map(|_| true)
            }
            _ => Ok(false),
        }
    }

    /// Loads the persisted snapshot and confirms it with the backend.
    pub async fn restore_from_storage(&self) -> bool {
        let snapshot = match self.storage.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("discarding unreadable session snapshot: {}", e);
                self.clear_storage();
                None
            }
        };
        let Some(snapshot) = snapshot else {
            return false;
        };
        let Some(token) = snapshot.token.clone().filter(|_| snapshot.user.is_some()) else {
            self.clear_storage();
            return false;
        };

        self.api.set_token(Some(token));
        self.state.set(Session {
            is_logged_in: true,
            phase: SessionPhase::Authenticated,
            ..snapshot
        });

        match self.fetch_profile().await {
            Ok(_) => true,
            Err(error) => {
                log::info!("restored session not confirmed: {}", error);
                false
            }
        }
    }

    pub fn update_activity(&self) {
        self.update_activity_at(time::now());
    }

    /// `last_activity` never moves backwards.
    pub fn update_activity_at(&self, now: DateTime<Utc>) {
        self.state.update(|s| {
            s.last_activity = Some(s.last_activity.map_or(now, |prev| prev.max(now)));
        });
        if self.state.with_untracked(|s| s.is_logged_in) {
            self.persist();
        }
    }

    /// Drops the session locally without telling the backend.
    pub fn clear_user_data(&self) {
        self.reset(None);
    }

    /// Forced logout: the session is cleared and `reason` stays visible.
    pub fn expire(&self, reason: &str) {
        log::warn!("session ended: {}", reason);
        self.reset(Some(reason.to_string()));
    }

    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.state.update(|s| s.error = Some(message));
    }

    pub fn clear_error(&self) {
        self.state.update(|s| s.error = None);
    }

    fn reset(&self, error: Option<String>) {
        self.sequence.invalidate_all();
        self.api.set_token(None);
        self.state.set(Session {
            error,
            ..Session::default()
        });
        self.clear_storage();
    }

    fn fail<T>(&self, error: ApiError) -> Result<T, ApiError> {
        self.state.update(|s| {
            s.loading = false;
            s.error = Some(error.message.clone());
        });
        Err(error)
    }

    fn recover<T>(&self, error: ApiError) -> Result<T, ApiError> {
        if error.is_auth_failure() {
            self.expire(&error.message);
            return Err(error);
        }
        self.fail(error)
    }

    fn persist(&self) {
        let result = self.state.with_untracked(|s| self.storage.save(s));
        if let Err(e) = result {
            log::warn!("failed to persist session: {}", e);
        }
    }

    fn clear_storage(&self) {
        if let Err(e) = self.storage.clear() {
            log::warn!("failed to clear persisted session: {}", e);
        }
    }
}

pub fn provide_session(store: SessionStore) {
    provide_context(store);
}

pub fn use_session() -> SessionStore {
    expect_context::<SessionStore>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{admin_user, with_runtime};
    use crate::utils::storage::MemoryStore;
    use chrono::TimeZone;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn store(backend: &MemoryStore) -> SessionStore {
        SessionStore::new(
            ApiClient::new_with_base_url("http://127.0.0.1:9/api"),
            Rc::new(backend.clone()),
        )
    }

    #[test]
    fn empty_session_queries_fall_back() {
        let session = Session::default();
        assert_eq!(session.display_name(), DISPLAY_NAME_PLACEHOLDER);
        assert_eq!(session.avatar(), DEFAULT_AVATAR);
        assert!(session.roles().is_empty());
        assert!(!session.has_permission("system:users:read"));
        assert!(!session.is_authenticated());
        assert_eq!(session.session_duration_minutes(at(90)), 0);
        assert!(!session.is_inactive(at(90)));
    }

    #[test]
    fn profile_queries_read_the_user() {
        let session = Session::authenticated("t1".into(), admin_user(), at(0));
        assert_eq!(session.display_name(), "admin");
        assert!(session.has_role("admin"));
        assert!(!session.has_role("auditor"));
        assert!(session.has_permission("system:users:read"));
        assert_eq!(session.phase, SessionPhase::Authenticated);
    }

    #[test]
    fn duration_grows_with_elapsed_time() {
        let session = Session::authenticated("t1".into(), admin_user(), at(0));
        assert_eq!(session.session_duration_minutes(at(0)), 0);
        assert_eq!(session.session_duration_minutes(at(15)), 15);
        assert_eq!(session.session_duration_minutes(at(61)), 61);
        assert_eq!(session.session_duration_minutes(at(-5)), 0);
    }

    #[test]
    fn inactivity_threshold_is_strictly_thirty_minutes() {
        let session = Session::authenticated("t1".into(), admin_user(), at(0));
        assert!(!session.is_inactive(at(29)));
        assert!(!session.is_inactive(at(30)));
        assert!(session.is_inactive(at(31)));
    }

    #[test]
    fn transient_fields_are_not_persisted() {
        let mut session = Session::authenticated("t1".into(), admin_user(), at(0));
        session.loading = true;
        session.error = Some("boom".into());
        let raw = serde_json::to_string(&session).unwrap();
        assert!(raw.contains("\"isLoggedIn\":true"));
        assert!(!raw.contains("loading"));
        assert!(!raw.contains("boom"));
        let back: Session = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.token.as_deref(), Some("t1"));
        assert!(back.error.is_none());
    }

    #[test]
    fn update_activity_never_moves_backwards() {
        with_runtime(|| {
            let store = store(&MemoryStore::new());
            store.update_activity_at(at(10));
            store.update_activity_at(at(5));
            assert_eq!(store.snapshot().last_activity, Some(at(10)));
            store.update_activity_at(at(12));
            assert_eq!(store.snapshot().last_activity, Some(at(12)));
        });
    }

    #[test]
    fn clear_user_data_is_idempotent() {
        with_runtime(|| {
            let backend = MemoryStore::new();
            let store = store(&backend);
            store.state.set(Session::authenticated("t1".into(), admin_user(), at(0)));
            store.persist();
            assert!(backend.get(SESSION_KEY).unwrap().is_some());

            store.clear_user_data();
            store.clear_user_data();
            let snapshot = store.snapshot();
            assert_eq!(snapshot, Session::default());
            assert!(store.api().token().is_none());
            assert!(backend.get(SESSION_KEY).unwrap().is_none());
        });
    }

    #[test]
    fn expire_keeps_reason_visible() {
        with_runtime(|| {
            let store = store(&MemoryStore::new());
            store.state.set(Session::authenticated("t1".into(), admin_user(), at(0)));
            store.expire("Session expired due to inactivity");
            let snapshot = store.snapshot();
            assert!(!snapshot.is_logged_in);
            assert!(snapshot.token.is_none());
            assert_eq!(
                snapshot.error.as_deref(),
                Some("Session expired due to inactivity")
            );
        });
    }

    #[test]
    fn set_and_clear_error() {
        with_runtime(|| {
            let store = store(&MemoryStore::new());
            store.set_error("bad input");
            assert_eq!(store.snapshot().error.as_deref(), Some("bad input"));
            store.clear_error();
            assert!(store.snapshot().error.is_none());
        });
    }

    #[test]
    fn stores_are_isolated() {
        with_runtime(|| {
            let first = store(&MemoryStore::new());
            let second = store(&MemoryStore::new());
            first.set_error("only here");
            assert!(second.snapshot().error.is_none());
        });
    }
}
