use leptos::*;
use leptos_router::*;

use crate::{
    components::guard::{Guarded, GuardPolicy},
    config::RuntimeConfig,
    state::{provide_session, use_session, SessionStore},
};

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";
pub const FORBIDDEN_PATH: &str = "/403";
pub const APP_TITLE: &str = "Valhalla User Admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Reachable without a session; authenticated users may be sent home.
    GuestOnly,
    Authenticated { permission: Option<&'static str> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMeta {
    pub path: &'static str,
    pub title: &'static str,
    pub access: Access,
}

pub const ROUTES: &[RouteMeta] = &[
    RouteMeta {
        path: LOGIN_PATH,
        title: "Login",
        access: Access::GuestOnly,
    },
    RouteMeta {
        path: HOME_PATH,
        title: "Dashboard",
        access: Access::Authenticated { permission: None },
    },
    RouteMeta {
        path: "/users",
        title: "User Management",
        access: Access::Authenticated {
            permission: Some("system:users:read"),
        },
    },
    RouteMeta {
        path: "/roles",
        title: "Role Management",
        access: Access::Authenticated {
            permission: Some("system:roles:read"),
        },
    },
    RouteMeta {
        path: "/permissions",
        title: "Permission Management",
        access: Access::Authenticated {
            permission: Some("system:permissions:read"),
        },
    },
    RouteMeta {
        path: "/apis",
        title: "API Management",
        access: Access::Authenticated {
            permission: Some("system:apis:read"),
        },
    },
    RouteMeta {
        path: FORBIDDEN_PATH,
        title: "Access Denied",
        access: Access::Public,
    },
];

pub const NOT_FOUND: RouteMeta = RouteMeta {
    path: "*",
    title: "Page Not Found",
    access: Access::Public,
};

/// Looks up a location (query and fragment ignored). Unknown paths resolve
/// to [`NOT_FOUND`].
pub fn resolve(location: &str) -> RouteMeta {
    let path = location
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(HOME_PATH);
    let path = match path.trim_end_matches('/') {
        "" => HOME_PATH,
        trimmed => trimmed,
    };
    ROUTES
        .iter()
        .copied()
        .find(|route| route.path == path)
        .unwrap_or(NOT_FOUND)
}

pub fn page_title(route: &RouteMeta) -> String {
    format!("{} - {}", route.title, APP_TITLE)
}

pub fn app_root(store: SessionStore, config: RuntimeConfig) -> impl IntoView {
    provide_session(store);
    provide_context(GuardPolicy::from_config(&config));
    provide_context(config);
    view! {
        <Router>
            <Routes>
                <Route path="/login" view=|| route_page("/login")/>
                <Route path="/" view=|| route_page("/")/>
                <Route path="/users" view=|| route_page("/users")/>
                <Route path="/roles" view=|| route_page("/roles")/>
                <Route path="/permissions" view=|| route_page("/permissions")/>
                <Route path="/apis" view=|| route_page("/apis")/>
                <Route path="/403" view=|| route_page("/403")/>
                <Route path="/*any" view=|| view! { <RoutePage route=NOT_FOUND/> }/>
            </Routes>
        </Router>
    }
}

fn route_page(path: &'static str) -> impl IntoView {
    view! { <RoutePage route=resolve(path)/> }
}

#[component]
fn RoutePage(route: RouteMeta) -> impl IntoView {
    #[cfg(target_arch = "wasm32")]
    if let Some(document) = web_sys::window().and_then(|w| w.document()) {
        document.set_title(&page_title(&route));
    }
    let session = use_session().state();
    view! {
        <Guarded route=route>
            <main class="page">
                <h1>{route.title}</h1>
                <p class="session-user">{move || session.get().display_name()}</p>
            </main>
        </Guarded>
    }
}
