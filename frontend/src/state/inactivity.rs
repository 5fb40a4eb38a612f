use chrono::{DateTime, Utc};
use leptos::SignalWithUntracked;

use super::session::SessionStore;

pub const INACTIVITY_MESSAGE: &str = "Session expired due to inactivity";
pub const CHECK_INTERVAL_MS: u32 = 60_000;

/// Ends an authenticated session whose last activity is too old. Returns
/// whether the session was ended.
pub fn check_inactivity(store: &SessionStore, now: DateTime<Utc>) -> bool {
    let expired = store
        .state()
        .with_untracked(|s| s.is_authenticated() && s.is_inactive(now));
    if expired {
        store.expire(INACTIVITY_MESSAGE);
    }
    expired
}

#[cfg(target_arch = "wasm32")]
pub fn spawn_watcher(store: SessionStore) {
    wasm_bindgen_futures::spawn_local(async move {
        loop {
            gloo_timers::future::TimeoutFuture::new(CHECK_INTERVAL_MS).await;
            check_inactivity(&store, crate::utils::time::now());
        }
    });
}
