//! Function registration under a project.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::project::PROJECTS_PATH;
use super::{InsertOutcome, require, validate_slug};
use crate::api::{self, ApiClient, ApiRequest, AuthMode};
use crate::auth::TokenProvider;
use crate::error::{Error, Result};

pub const DEFAULT_VERSION: &str = "1.0.0";

/// Fields sent when registering a function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFunction {
    pub slug: String,
    pub name: String,
    pub language: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewFunction {
    pub fn new(
        slug: impl Into<String>,
        name: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            language: language.into(),
            version: DEFAULT_VERSION.to_string(),
            description: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn validate(&self) -> Result<()> {
        validate_slug(&self.slug)?;
        require("Function name", &self.name)?;
        require("Function language", &self.language)?;
        require("Function version", &self.version)
    }
}

/// A function as known to the platform.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Function {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct InsertData {
    #[serde(default)]
    state: Value,
    #[serde(default)]
    function: Option<Function>,
}

/// Path of a project's function collection. `project` is the project id
/// when known, otherwise its slug.
pub fn functions_path(project: &str) -> String {
    format!("{PROJECTS_PATH}/{project}/functions")
}

/// A project reference is a numeric id or a slug. Anything else could
/// carry `?`, `#` or `/` into the request path.
fn validate_project_ref(project: &str) -> Result<()> {
    if !project.is_empty() && project.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(());
    }
    validate_slug(project)
        .map_err(|_| Error::InvalidInput(format!("'{project}' is not a project id or slug")))
}

/// Calls against `/projects/{project}/functions`.
pub struct FunctionApi {
    client: Arc<ApiClient>,
    tokens: Arc<dyn TokenProvider>,
}

impl FunctionApi {
    pub fn new(client: Arc<ApiClient>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { client, tokens }
    }

    pub async fn insert(
        &self,
        project: &str,
        function: &NewFunction,
    ) -> Result<InsertOutcome<Function>> {
        validate_project_ref(project)?;
        function.validate()?;

        let body = serde_json::to_value(function)
            .map_err(|e| Error::InvalidInput(format!("Unserializable function: {e}")))?;
        let token = self.tokens.get_token().await?;
        let req = ApiRequest::post(functions_path(project))
            .with_body(body)
            .with_auth(AuthMode::Bearer(token));

        let data: InsertData = api::decode_data(self.client.request(&req).await?)?;
        let outcome = InsertOutcome {
            state: data.state,
            item: data.function,
        };

        if outcome.is_success() {
            info!(project, slug = %function.slug, "Function registered");
        } else {
            warn!(project, slug = %function.slug, state = %outcome.state, "Platform rejected function");
        }
        Ok(outcome)
    }
}
