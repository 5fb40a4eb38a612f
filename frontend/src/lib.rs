pub mod api;
pub mod components;
pub mod config;
pub mod router;
pub mod state;
pub mod utils;

#[cfg(test)]
mod test_support;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    use std::rc::Rc;

    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Debug).is_err() {
        web_sys::console::warn_1(&"logger already initialized".into());
    }
    log::info!("Starting Valhalla admin frontend (wasm)");

    // Config comes first: the API base URL and envelope dialect depend on it.
    wasm_bindgen_futures::spawn_local(async move {
        let config = config::init().await;
        log::info!(
            "Runtime config initialized: {} ({:?}, {})",
            config.app_name,
            config.app_env,
            config.api_base_url
        );

        let api = api::ApiClient::new(&config);
        let store = state::SessionStore::new(api, Rc::new(utils::storage::LocalStore));
        let restored = store.restore_from_storage().await;
        log::info!("session restored: {}", restored);
        state::inactivity::spawn_watcher(store.clone());

        leptos::mount_to_body(move || router::app_root(store, config));
    });
}
