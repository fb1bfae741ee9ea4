// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Generic remote HTTP client used by OAuth drivers and outbound services.
//!
//! Every call is a single attempt: no retries, no backoff. Transport
//! failures and non-2xx responses are logged and returned as
//! [`AppError::RemoteService`].

use crate::config::Config;
use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Maximum number of response body bytes echoed into error messages.
const ERROR_BODY_LIMIT: usize = 512;

/// Supported request verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            _ => Err(AppError::InvalidArgument(format!(
                "Unsupported HTTP method: {}",
                s
            ))),
        }
    }
}

/// How params are encoded for POST/PUT/PATCH.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyEncoding {
    #[default]
    Json,
    Form,
}

/// Per-call options.
///
/// `params` become the query string for GET and the request body otherwise.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub headers: Vec<(String, String)>,
    pub bearer_token: Option<String>,
    pub params: Map<String, Value>,
    pub encoding: BodyEncoding,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.to_string());
        self
    }

    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn form(mut self) -> Self {
        self.encoding = BodyEncoding::Form;
        self
    }

    /// Params flattened to string pairs; nulls are dropped.
    fn pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .filter_map(|(k, v)| match v {
                Value::Null => None,
                Value::String(s) => Some((k.clone(), s.clone())),
                other => Some((k.clone(), other.to_string())),
            })
            .collect()
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub status: u16,
    /// Final URL after redirects
    pub url: String,
    pub body: String,
}

impl RemoteResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_str(&self.body).map_err(|e| AppError::RemoteService {
            service: self.url.clone(),
            status: Some(self.status),
            message: format!("JSON parse error: {}", e),
        })
    }
}

/// Client bound to one remote base URL.
#[derive(Clone)]
pub struct RemoteClient {
    name: String,
    http: reqwest::Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(name: &str, base_url: &str, http: reqwest::Client) -> Self {
        Self {
            name: name.to_string(),
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve `path` against the base URL; absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Issue one request.
    pub async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        options: CallOptions,
    ) -> Result<RemoteResponse, AppError> {
        let url = self.url(path);
        let pairs = options.pairs();

        let mut request = match method {
            HttpMethod::Get => self.http.get(&url).query(&pairs),
            HttpMethod::Post => self.http.post(&url),
            HttpMethod::Put => self.http.put(&url),
            HttpMethod::Patch => self.http.patch(&url),
        };

        if method != HttpMethod::Get {
            request = match options.encoding {
                BodyEncoding::Json => request.json(&options.params),
                BodyEncoding::Form => request.form(&pairs),
            };
        }

        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &options.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(
                service = %self.name,
                method = %method,
                path,
                error = %e,
                "Remote call failed"
            );
            AppError::transport(&self.name, e)
        })?;

        let status = response.status();
        let final_url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::warn!(
                service = %self.name,
                method = %method,
                path,
                status = status.as_u16(),
                "Remote call returned error status"
            );
            if status.as_u16() == 429 {
                tracing::warn!(service = %self.name, "Remote rate limit hit (429)");
            }
            return Err(AppError::RemoteService {
                service: self.name.clone(),
                status: Some(status.as_u16()),
                message: format!("HTTP {}: {}", status, truncate(&body, ERROR_BODY_LIMIT)),
            });
        }

        tracing::debug!(
            service = %self.name,
            method = %method,
            path,
            status = status.as_u16(),
            "Remote call succeeded"
        );

        Ok(RemoteResponse {
            status: status.as_u16(),
            url: final_url,
            body,
        })
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Named remote clients (providers' REST APIs and configured services).
#[derive(Clone, Default)]
pub struct RemoteServices {
    clients: HashMap<String, RemoteClient>,
}

impl RemoteServices {
    /// One client per enabled provider (its `api_url`) and per entry of
    /// `remote_services`.
    pub fn from_config(config: &Config, http: &reqwest::Client) -> Self {
        let mut services = Self::default();
        for (name, settings) in config.providers.iter().filter(|(_, s)| s.enabled) {
            services.insert(RemoteClient::new(name, &settings.api_url, http.clone()));
        }
        for (name, url) in &config.remote_services {
            services.insert(RemoteClient::new(name, url, http.clone()));
        }
        services
    }

    pub fn insert(&mut self, client: RemoteClient) {
        self.clients.insert(client.name().to_string(), client);
    }

    pub fn get(&self, service: &str) -> Option<&RemoteClient> {
        self.clients.get(service)
    }

    /// Dispatch a call to the named service.
    pub async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        options: CallOptions,
        service: &str,
    ) -> Result<RemoteResponse, AppError> {
        let client = self.get(service).ok_or_else(|| {
            AppError::InvalidArgument(format!("Unknown remote service: {}", service))
        })?;
        client.call(method, path, options).await
    }
}
