#[cfg(all(test, not(target_arch = "wasm32")))]
pub mod ssr;

#[cfg(test)]
pub mod helpers {
    use crate::api::UserProfile;
    use crate::state::{Session, SessionPhase};

    pub fn with_runtime<T>(f: impl FnOnce() -> T) -> T {
        let runtime = leptos::create_runtime();
        let result = f();
        runtime.dispose();
        result
    }

    pub fn admin_user() -> UserProfile {
        UserProfile {
            id: "u-admin".into(),
            username: "admin".into(),
            email: "admin@yggdrasil-labs.com".into(),
            avatar: None,
            roles: vec!["admin".into()],
            permissions: vec![
                "system:users:read".into(),
                "system:roles:read".into(),
                "system:permissions:read".into(),
                "system:apis:read".into(),
            ],
            created_at: None,
            updated_at: None,
        }
    }

    pub fn regular_user() -> UserProfile {
        UserProfile {
            id: "u-regular".into(),
            username: "member".into(),
            email: "member@yggdrasil-labs.com".into(),
            avatar: None,
            roles: vec!["member".into()],
            permissions: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn session_for(user: UserProfile) -> Session {
        Session {
            token: Some(format!("token-{}", user.id)),
            user: Some(user),
            is_logged_in: true,
            phase: SessionPhase::Authenticated,
            ..Session::default()
        }
    }
}
