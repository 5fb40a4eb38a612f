mod apis;
mod auth;
pub mod client;
pub mod envelope;
pub mod error;
mod permissions;
mod roles;
pub mod types;
mod users;

pub use client::{
    ApiClient, CacheBuster, HttpMethod, RequestOptions, ResponseBody, ResponseType,
    CACHE_BUST_PARAM, REQUEST_ID_HEADER,
};
pub use envelope::*;
pub use error::*;
pub use types::*;

#[cfg(all(test, not(target_arch = "wasm32")))]
pub mod test_support;
#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests;
