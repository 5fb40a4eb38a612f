use leptos::*;
use leptos_router::Redirect;

use crate::{
    config::RuntimeConfig,
    router::{Access, RouteMeta, FORBIDDEN_PATH, HOME_PATH, LOGIN_PATH},
    state::{use_session, Session, SessionStore},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectTo(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPolicy {
    pub login_path: String,
    pub home_path: String,
    pub forbidden_path: String,
    pub redirect_authenticated_from_login: bool,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            login_path: LOGIN_PATH.to_string(),
            home_path: HOME_PATH.to_string(),
            forbidden_path: FORBIDDEN_PATH.to_string(),
            redirect_authenticated_from_login: true,
        }
    }
}

impl GuardPolicy {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            redirect_authenticated_from_login: config.redirect_authenticated_from_login,
            ..Self::default()
        }
    }
}

pub fn evaluate(route: &RouteMeta, session: &Session, policy: &GuardPolicy) -> Decision {
    match route.access {
        Access::Public => Decision::Allow,
        Access::GuestOnly => {
            if policy.redirect_authenticated_from_login && session.is_authenticated() {
                Decision::RedirectTo(policy.home_path.clone())
            } else {
                Decision::Allow
            }
        }
        Access::Authenticated { permission } => {
            if !session.is_authenticated() {
                return Decision::RedirectTo(policy.login_path.clone());
            }
            match permission {
                Some(required) if !session.has_permission(required) => {
                    Decision::RedirectTo(policy.forbidden_path.clone())
                }
                _ => Decision::Allow,
            }
        }
    }
}

/// One navigation: records activity, then decides.
pub fn navigate(store: &SessionStore, route: &RouteMeta, policy: &GuardPolicy) -> Decision {
    store.update_activity();
    let decision = store
        .state()
        .with_untracked(|session| evaluate(route, session, policy));
    log::debug!("navigation to {} -> {:?}", route.path, decision);
    decision
}

/// Renders `children` while the session may see `route`, otherwise
/// redirects. Re-evaluates when the session changes.
#[component]
pub fn Guarded(route: RouteMeta, children: ChildrenFn) -> impl IntoView {
    let store = use_session();
    let policy = use_context::<GuardPolicy>().unwrap_or_default();
    navigate(&store, &route, &policy);

    let state = store.state();
    let decision = create_memo(move |_| evaluate(&route, &state.get(), &policy));
    view! {
        <Show
            when=move || decision.get() == Decision::Allow
            fallback=move || match decision.get() {
                Decision::RedirectTo(path) => view! { <Redirect path=path/> }.into_view(),
                Decision::Allow => ().into_view(),
            }
        >
            {children()}
        </Show>
    }
}
