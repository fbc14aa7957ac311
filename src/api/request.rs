//! Request descriptors for the platform API.

use std::fmt;

use serde_json::Value;

/// HTTP method supported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub(crate) fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// Which credential, if any, is attached to a request.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    None,
    /// HTTP basic auth with the configured client id and secret.
    ClientBasic,
    /// Bearer access token.
    Bearer(String),
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::ClientBasic => write!(f, "ClientBasic"),
            Self::Bearer(_) => write!(f, "Bearer(<redacted>)"),
        }
    }
}

/// Per-request options layered on top of method, URL and body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestExtras {
    pub auth: AuthMode,
    /// Form-encoded payload, used only when the request has no JSON body.
    pub form: Option<Vec<(String, String)>>,
}

/// A single call against the API, built per request and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub resource: String,
    pub method: Method,
    pub body: Option<Value>,
    /// Query parameters in insertion order. Duplicate keys are kept.
    pub query: Vec<(String, String)>,
    pub extras: RequestExtras,
}

impl ApiRequest {
    pub fn new(method: Method, resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            method,
            body: None,
            query: Vec::new(),
            extras: RequestExtras::default(),
        }
    }

    pub fn get(resource: impl Into<String>) -> Self {
        Self::new(Method::Get, resource)
    }

    pub fn post(resource: impl Into<String>) -> Self {
        Self::new(Method::Post, resource)
    }

    pub fn put(resource: impl Into<String>) -> Self {
        Self::new(Method::Put, resource)
    }

    pub fn delete(resource: impl Into<String>) -> Self {
        Self::new(Method::Delete, resource)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_auth(mut self, auth: AuthMode) -> Self {
        self.extras.auth = auth;
        self
    }

    pub fn with_form<K, V>(mut self, form: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.extras.form = Some(form.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn with_extras(mut self, extras: RequestExtras) -> Self {
        self.extras = extras;
        self
    }
}
