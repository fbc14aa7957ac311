//! Request pipeline for the platform API.
//!
//! Every outbound call goes through [`ApiClient::send`]: the resource is
//! resolved against the configured endpoint, query parameters and the chosen
//! credential are attached, and any failure is normalized into an
//! [`ApiError`] before it leaves this module.

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use crate::api::request::{ApiRequest, AuthMode, RequestExtras};
use crate::config::{AuthApiConfig, Config};
use crate::error::{ApiError, Error, Result};
use crate::net::HttpClient;

/// Prefix some transports put in front of their messages.
const ERROR_PREFIX: &str = "Error: ";

/// Client for the platform API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: HttpClient,
    client_id: String,
    client_secret: String,
}

impl ApiClient {
    /// Create a client for the given API settings.
    pub fn new(api: &AuthApiConfig, http: HttpClient) -> Result<Self> {
        Ok(Self {
            base: Url::parse(&api.endpoint)?,
            http,
            client_id: api.client_id.clone(),
            client_secret: api.client_secret.clone(),
        })
    }

    /// Create a client from the full application configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.auth_api, HttpClient::from_config(&config.http))
    }

    /// Base endpoint every resource is resolved against.
    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Resolve a resource path and append query parameters in order.
    ///
    /// Resolution follows RFC 3986: an absolute path such as `/users`
    /// replaces the endpoint's path, a relative one is joined onto it.
    pub fn url_for(&self, resource: &str, query: &[(String, String)]) -> Result<Url> {
        let mut url = self.base.join(resource)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Build the outgoing HTTP request without sending it.
    pub fn build_request(&self, req: &ApiRequest) -> Result<reqwest::Request> {
        let url = self.url_for(&req.resource, &req.query)?;

        let mut builder = self
            .http
            .inner()
            .request(req.method.as_reqwest(), url)
            .header(reqwest::header::ACCEPT, "application/json");

        builder = match &req.extras.auth {
            AuthMode::None => builder,
            AuthMode::ClientBasic => builder.basic_auth(&self.client_id, Some(&self.client_secret)),
            AuthMode::Bearer(token) => builder.bearer_auth(token),
        };

        // The JSON body always wins; a form payload only fills an empty body.
        if let Some(body) = &req.body {
            builder = builder.json(body);
        } else if let Some(form) = &req.extras.form {
            builder = builder.form(form);
        }

        builder
            .build()
            .map_err(|e| Error::Transport(transport_error(&e)))
    }

    /// Execute a request and return the full parsed response body.
    pub async fn send(&self, req: &ApiRequest) -> Result<Value> {
        let request = self.build_request(req)?;
        debug!(method = %req.method, url = %request.url(), "Sending API request");

        let response = match self.http.inner().execute(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    method = %req.method,
                    resource = %req.resource,
                    body = ?req.body,
                    error = %e,
                    "API request failed before a response was received"
                );
                return Err(Error::Transport(transport_error(&e)));
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                error!(
                    method = %req.method,
                    resource = %req.resource,
                    status = status.as_u16(),
                    error = %e,
                    "Failed to read API response body"
                );
                let mut err = transport_error(&e);
                err.http_status = Some(status.as_u16());
                return Err(Error::Transport(err));
            }
        };

        if !status.is_success() {
            error!(
                method = %req.method,
                resource = %req.resource,
                status = status.as_u16(),
                body = ?req.body,
                response = %text,
                "API request failed"
            );
            return Err(Error::Api(normalize_error(status, &text)));
        }

        parse_envelope(status, &text)
    }

    /// Execute a request and return only the `data` field of the envelope.
    pub async fn request(&self, req: &ApiRequest) -> Result<Value> {
        self.send(req).await.map(into_data)
    }

    pub async fn get(
        &self,
        resource: &str,
        query: &[(&str, &str)],
        extras: RequestExtras,
    ) -> Result<Value> {
        let req = with_query(ApiRequest::get(resource), query).with_extras(extras);
        self.request(&req).await
    }

    pub async fn post(
        &self,
        resource: &str,
        body: Value,
        query: &[(&str, &str)],
        extras: RequestExtras,
    ) -> Result<Value> {
        let req = with_query(ApiRequest::post(resource).with_body(body), query).with_extras(extras);
        self.request(&req).await
    }

    pub async fn put(
        &self,
        resource: &str,
        body: Value,
        query: &[(&str, &str)],
        extras: RequestExtras,
    ) -> Result<Value> {
        let req = with_query(ApiRequest::put(resource).with_body(body), query).with_extras(extras);
        self.request(&req).await
    }

    pub async fn delete(
        &self,
        resource: &str,
        query: &[(&str, &str)],
        extras: RequestExtras,
    ) -> Result<Value> {
        let req = with_query(ApiRequest::delete(resource), query).with_extras(extras);
        self.request(&req).await
    }
}

fn with_query(req: ApiRequest, query: &[(&str, &str)]) -> ApiRequest {
    query
        .iter()
        .fold(req, |req, (key, value)| req.with_query(*key, *value))
}

/// Take the `data` member out of a response envelope.
fn into_data(envelope: Value) -> Value {
    match envelope {
        Value::Object(mut map) => map.remove("data").unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn parse_envelope(status: StatusCode, text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| {
        Error::Api(ApiError::new(
            format!("Invalid JSON response: {e}"),
            Some("EPARSE".to_string()),
            Some(status.as_u16()),
        ))
    })
}

/// Normalize a non-2xx response into an [`ApiError`].
///
/// - `{ "error": { "message", "code" } }` bodies contribute both fields;
/// - other JSON bodies fall back to `"<status> - <body>"` with no code;
/// - a plain string body becomes both message and code;
/// - an empty body yields the status line.
pub fn normalize_error(status: StatusCode, body: &str) -> ApiError {
    let http_status = Some(status.as_u16());

    if body.trim().is_empty() {
        return ApiError::new(status.to_string(), None, http_status);
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(text)) => ApiError::new(text.clone(), Some(text), http_status),
        Ok(Value::Object(map)) => {
            let detail = map.get("error");
            let message = detail
                .and_then(|e| e.get("message"))
                .and_then(scalar_to_string)
                .unwrap_or_else(|| generic_message(status, body));
            let code = detail
                .and_then(|e| e.get("code"))
                .and_then(scalar_to_string);
            ApiError::new(message, code, http_status)
        }
        Ok(_) => ApiError::new(generic_message(status, body), None, http_status),
        Err(_) => ApiError::new(body, Some(body.to_string()), http_status),
    }
}

/// Normalize a transport-level failure into an [`ApiError`].
pub fn transport_error(err: &reqwest::Error) -> ApiError {
    let code = if err.is_timeout() {
        "ETIMEDOUT"
    } else if err.is_connect() {
        "ECONNREFUSED"
    } else {
        "EREQUEST"
    };
    ApiError::new(
        strip_error_prefix(&err.to_string()),
        Some(code.to_string()),
        err.status().map(|s| s.as_u16()),
    )
}

fn generic_message(status: StatusCode, body: &str) -> String {
    strip_error_prefix(&format!("{} - {}", status.as_u16(), body.trim()))
}

fn strip_error_prefix(message: &str) -> String {
    message
        .strip_prefix(ERROR_PREFIX)
        .unwrap_or(message)
        .to_string()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
