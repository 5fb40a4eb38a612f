use std::sync::OnceLock;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::api::DialectKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    #[default]
    Dev,
    Test,
    Prod,
}

impl AppEnv {
    pub fn default_api_base_url(self) -> &'static str {
        match self {
            AppEnv::Dev => "http://localhost:8080/api",
            AppEnv::Test => "https://test-api.yggdrasil-labs.com/api",
            AppEnv::Prod => "https://api.yggdrasil-labs.com/api",
        }
    }

    pub fn default_app_name(self) -> &'static str {
        match self {
            AppEnv::Dev => "Asgard Frontend (Development)",
            AppEnv::Test => "Asgard Frontend (Test)",
            AppEnv::Prod => "Asgard Frontend (Production)",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Some(AppEnv::Dev),
            "test" => Some(AppEnv::Test),
            "prod" | "production" => Some(AppEnv::Prod),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub api_base_url: String,
    pub app_env: AppEnv,
    pub app_name: String,
    pub envelope: DialectKind,
    pub request_timeout_ms: u64,
    /// Send authenticated users away from the login page.
    pub redirect_authenticated_from_login: bool,
}

/// Unvalidated: empty strings are filled in by [`RuntimeConfig::validated`].
impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            app_env: AppEnv::default(),
            app_name: String::new(),
            envelope: DialectKind::default(),
            request_timeout_ms: 10_000,
            redirect_authenticated_from_login: true,
        }
    }
}

impl RuntimeConfig {
    pub fn for_env(app_env: AppEnv) -> Self {
        Self {
            api_base_url: app_env.default_api_base_url().to_string(),
            app_env,
            app_name: app_env.default_app_name().to_string(),
            ..Self::default()
        }
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let config: RuntimeConfig =
            serde_json::from_str(raw).context("Failed to parse runtime config")?;
        config.validated()
    }

    /// Production builds must name their API explicitly; other environments
    /// fall back to their defaults.
    pub fn validated(mut self) -> anyhow::Result<Self> {
        if self.api_base_url.trim().is_empty() {
            if self.app_env == AppEnv::Prod {
                bail!("api_base_url must be set in production");
            }
            log::warn!(
                "api_base_url not set, using default: {}",
                self.app_env.default_api_base_url()
            );
            self.api_base_url = self.app_env.default_api_base_url().to_string();
        }
        if self.app_name.trim().is_empty() {
            self.app_name = self.app_env.default_app_name().to_string();
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be greater than zero");
        }
        Ok(self)
    }

    /// Builds a config from `VALHALLA_*` variables read through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let app_env = match lookup("VALHALLA_ENV") {
            Some(raw) => AppEnv::parse(&raw).with_context(|| format!("Unknown VALHALLA_ENV: {}", raw))?,
            None => AppEnv::default(),
        };
        let mut config = RuntimeConfig {
            app_env,
            ..RuntimeConfig::default()
        };
        if let Some(url) = lookup("VALHALLA_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Some(raw) = lookup("VALHALLA_ENVELOPE") {
            config.envelope = DialectKind::parse(&raw)
                .with_context(|| format!("Unknown VALHALLA_ENVELOPE: {}", raw))?;
        }
        config.validated()
    }
}

static RUNTIME_CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

#[cfg(target_arch = "wasm32")]
fn snapshot_from_globals() -> Option<anyhow::Result<RuntimeConfig>> {
    // Optional global set by env.js: window.__VALHALLA_CONFIG = { api_base_url: "..." }
    let window = web_sys::window()?;
    let any = js_sys::Reflect::get(&window, &"__VALHALLA_CONFIG".into()).ok()?;
    if any.is_undefined() || any.is_null() {
        return None;
    }
    let raw: String = js_sys::JSON::stringify(&any).ok()?.into();
    Some(RuntimeConfig::from_json(&raw))
}

#[cfg(target_arch = "wasm32")]
async fn fetch_runtime_config() -> Option<anyhow::Result<RuntimeConfig>> {
    let origin = web_sys::window()?.location().origin().ok()?;
    let resp = reqwest::get(format!("{}/config.json", origin)).await.ok()?;
    if !resp.status().is_success() {
        return None;
    }
    let raw = resp.text().await.ok()?;
    Some(RuntimeConfig::from_json(&raw))
}

#[cfg(target_arch = "wasm32")]
async fn load() -> anyhow::Result<RuntimeConfig> {
    if let Some(config) = snapshot_from_globals() {
        return config;
    }
    if let Some(config) = fetch_runtime_config().await {
        return config;
    }
    RuntimeConfig::default().validated()
}

#[cfg(not(target_arch = "wasm32"))]
async fn load() -> anyhow::Result<RuntimeConfig> {
    RuntimeConfig::from_lookup(|key| std::env::var(key).ok())
}

/// Loads the runtime config once; later calls return the cached value.
pub async fn init() -> RuntimeConfig {
    if let Some(cached) = RUNTIME_CONFIG.get() {
        return cached.clone();
    }
    let config = match load().await {
        Ok(config) => config,
        Err(e) => {
            log::error!("invalid runtime config, using development defaults: {:#}", e);
            RuntimeConfig::for_env(AppEnv::Dev)
        }
    };
    RUNTIME_CONFIG.get_or_init(|| config).clone()
}
