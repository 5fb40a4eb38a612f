use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
    time::Duration,
};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{header, Client, Method, Request, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{
    envelope::{DialectKind, Envelope},
    error::ApiError,
    types::Page,
};
use crate::{config::RuntimeConfig, utils::time};

pub const CACHE_BUST_PARAM: &str = "_t";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    fn as_reqwest(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    fn carries_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_reqwest().as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseType {
    #[default]
    Json,
    /// Raw bytes, returned without envelope unwrapping.
    Blob,
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub response_type: ResponseType,
    pub timeout: Option<Duration>,
    /// Bearer token sent instead of the client's current one.
    pub bearer_override: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Data(Envelope),
    Blob(Vec<u8>),
}

/// Hands out strictly increasing millisecond stamps, so two GETs issued in
/// the same millisecond still get different URLs.
#[derive(Debug, Default)]
pub struct CacheBuster {
    last: Cell<i64>,
}

impl CacheBuster {
    pub fn next(&self) -> i64 {
        self.next_at(time::now_millis())
    }

    fn next_at(&self, now_ms: i64) -> i64 {
        let value = now_ms.max(self.last.get() + 1);
        self.last.set(value);
        value
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    dialect: DialectKind,
    timeout: Duration,
    auth_token: Rc<RefCell<Option<String>>>,
    cache_buster: Rc<CacheBuster>,
}

impl ApiClient {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self::new_with_base_url(config.api_base_url.clone())
            .with_dialect(config.envelope)
            .with_timeout(Duration::from_millis(config.request_timeout_ms))
    }

    pub fn new_with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            dialect: DialectKind::default(),
            timeout: DEFAULT_TIMEOUT,
            auth_token: Rc::new(RefCell::new(None)),
            cache_buster: Rc::new(CacheBuster::default()),
        }
    }

    pub fn with_dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token injected as `Authorization: Bearer` on every request. Clones of
    /// this client share it.
    pub fn set_token(&self, token: Option<String>) {
        *self.auth_token.borrow_mut() = token;
    }

    pub fn token(&self) -> Option<String> {
        self.auth_token.borrow().clone()
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Builds the outbound request without sending it.
    pub fn prepare(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Option<&Value>,
        options: &RequestOptions,
        request_id: &str,
    ) -> Result<Request, ApiError> {
        let mut builder = self
            .client
            .request(method.as_reqwest(), self.url(path))
            .header(header::ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, request_id);

        let mut query = if method.carries_body() {
            Vec::new()
        } else {
            payload.map(query_pairs).unwrap_or_default()
        };
        if method == HttpMethod::Get {
            query.push((CACHE_BUST_PARAM.to_string(), self.cache_buster.next().to_string()));
        }
        if !query.is_empty() {
            builder = builder.query(&query);
        }

        if method.carries_body() {
            if let Some(body) = payload {
                builder = builder
                    .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
                    .json(body);
            }
        }

        let token = options.bearer_override.clone().or_else(|| self.token());
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            builder = builder.timeout(options.timeout.unwrap_or(self.timeout));
        }

        builder.build().map_err(|e| {
            log::warn!("failed to build {} {}: {}", method, path, e);
            ApiError::local(format!("Invalid request: {}", e))
        })
    }

    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<ResponseBody, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        let request = self.prepare(method, path, payload, options, &request_id)?;
        log::debug!(
            "request sent: {} {} params={} request_id={}",
            method,
            path,
            request.url().query().unwrap_or(""),
            request_id
        );

        let timeout = options.timeout.unwrap_or(self.timeout);
        let response = self.execute(request, timeout).await.map_err(|error| {
            log::warn!("request failed: {} {} -> {}", method, path, error);
            error
        })?;

        let status = response.status();
        log::debug!(
            "response received: {} {} status={} request_id={}",
            method,
            path,
            status.as_u16(),
            request_id
        );

        if !status.is_success() {
            let server_message = response
                .bytes()
                .await
                .ok()
                .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
                .and_then(|body| self.dialect.strategy().error_message(&body));
            let error = ApiError::http_status(status.as_u16(), server_message);
            log::warn!("request failed: {} {} -> {}", method, path, error);
            return Err(error);
        }

        match options.response_type {
            ResponseType::Blob => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| classify_transport_error(&e))?;
                Ok(ResponseBody::Blob(bytes.to_vec()))
            }
            ResponseType::Json => {
                let body: Value = response
                    .json()
                    .await
                    .map_err(|e| classify_transport_error(&e))?;
                self.dialect
                    .strategy()
                    .unwrap(body)
                    .map(ResponseBody::Data)
                    .map_err(|error| {
                        log::warn!("business error: {} {} -> {}", method, path, error);
                        error
                    })
            }
        }
    }

    /// reqwest enforces the timeout set in `prepare`.
    #[cfg(not(target_arch = "wasm32"))]
    async fn execute(&self, request: Request, _timeout: Duration) -> Result<Response, ApiError> {
        self.client.execute(request).await.map_err(|e| {
            log::debug!("transport error: {}", e);
            classify_transport_error(&e)
        })
    }

    /// The browser fetch has no timeout of its own, so the call races a timer.
    #[cfg(target_arch = "wasm32")]
    async fn execute(&self, request: Request, timeout: Duration) -> Result<Response, ApiError> {
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        let deadline = gloo_timers::future::TimeoutFuture::new(millis);
        match with_deadline(self.client.execute(request), deadline).await? {
            Ok(response) => Ok(response),
            Err(e) => {
                log::debug!("transport error: {}", e);
                Err(classify_transport_error(&e))
            }
        }
    }

    pub async fn envelope(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Envelope, ApiError> {
        match self.send(method, path, payload, options).await? {
            ResponseBody::Data(envelope) => Ok(envelope),
            ResponseBody::Blob(_) => Err(ApiError::malformed_response()),
        }
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        self.envelope(method, path, payload, options)
            .await?
            .into_data()
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<&Value>,
    ) -> Result<T, ApiError> {
        self.request(HttpMethod::Get, path, params, &RequestOptions::default())
            .await
    }

    pub async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<&Value>,
    ) -> Result<Page<T>, ApiError> {
        let envelope = self
            .envelope(HttpMethod::Get, path, params, &RequestOptions::default())
            .await?;
        Page::from_envelope(envelope)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = to_payload(body)?;
        self.request(HttpMethod::Post, path, Some(&payload), &RequestOptions::default())
            .await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = to_payload(body)?;
        self.request(HttpMethod::Put, path, Some(&payload), &RequestOptions::default())
            .await
    }

    /// Posts and ignores whatever payload comes back.
    pub async fn post_void<B>(&self, path: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let payload = to_payload(body)?;
        self.envelope(HttpMethod::Post, path, Some(&payload), &RequestOptions::default())
            .await
            .map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.envelope(HttpMethod::Delete, path, None, &RequestOptions::default())
            .await
            .map(|_| ())
    }

    /// File download; the body is returned as-is.
    pub async fn download(
        &self,
        method: HttpMethod,
        path: &str,
        params: Option<&Value>,
    ) -> Result<Vec<u8>, ApiError> {
        let options = RequestOptions {
            response_type: ResponseType::Blob,
            ..RequestOptions::default()
        };
        match self.send(method, path, params, &options).await? {
            ResponseBody::Blob(bytes) => Ok(bytes),
            ResponseBody::Data(_) => Err(ApiError::malformed_response()),
        }
    }
}

/// Resolves to a timeout error when `deadline` finishes before `call`.
#[cfg(any(target_arch = "wasm32", test))]
pub(crate) async fn with_deadline<F, D>(call: F, deadline: D) -> Result<F::Output, ApiError>
where
    F: std::future::Future,
    D: std::future::Future<Output = ()>,
{
    use futures::future::{select, Either};

    match select(Box::pin(call), Box::pin(deadline)).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right(((), _)) => Err(ApiError::timeout()),
    }
}

pub(crate) fn to_payload<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::local(format!("Failed to encode request: {}", e)))
}

pub(crate) fn path_segment(id: &str) -> String {
    utf8_percent_encode(id, PATH_SEGMENT).to_string()
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn query_pairs(payload: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = payload else {
        return Vec::new();
    };
    let mut pairs = Vec::new();
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                pairs.extend(
                    items
                        .iter()
                        .filter_map(query_value)
                        .map(|v| (key.clone(), v)),
                );
            }
            other => {
                if let Some(v) = query_value(other) {
                    pairs.push((key.clone(), v));
                }
            }
        }
    }
    pairs
}

fn classify_transport_error(error: &reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::timeout()
    } else if let Some(status) = error.status() {
        ApiError::http_status(status.as_u16(), None)
    } else if error.is_decode() {
        ApiError::malformed_response()
    } else {
        ApiError::network()
    }
}
