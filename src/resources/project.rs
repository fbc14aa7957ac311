//! Project registration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{InsertOutcome, deserialize_id, require, validate_slug};
use crate::api::{self, ApiClient, ApiRequest, AuthMode};
use crate::auth::TokenProvider;
use crate::error::{Error, Result};

pub const PROJECTS_PATH: &str = "/projects";

/// Fields sent when registering a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProject {
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewProject {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn validate(&self) -> Result<()> {
        validate_slug(&self.slug)?;
        require("Project name", &self.name)
    }
}

/// A project as known to the platform.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Project {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct InsertData {
    #[serde(default)]
    state: Value,
    #[serde(default)]
    project: Option<Project>,
}

/// Calls against `/projects`, authenticated with the current access token.
pub struct ProjectApi {
    client: Arc<ApiClient>,
    tokens: Arc<dyn TokenProvider>,
}

impl ProjectApi {
    pub fn new(client: Arc<ApiClient>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { client, tokens }
    }

    /// Register a project. The outcome carries the new project's id when the
    /// platform accepted it.
    pub async fn insert(&self, project: &NewProject) -> Result<InsertOutcome<Project>> {
        project.validate()?;

        let body = serde_json::to_value(project)
            .map_err(|e| Error::InvalidInput(format!("Unserializable project: {e}")))?;
        let token = self.tokens.get_token().await?;
        let req = ApiRequest::post(PROJECTS_PATH)
            .with_body(body)
            .with_auth(AuthMode::Bearer(token));

        let data: InsertData = api::decode_data(self.client.request(&req).await?)?;
        let outcome = InsertOutcome {
            state: data.state,
            item: data.project,
        };

        if outcome.is_success() {
            let id = outcome.item.as_ref().and_then(|p| p.id.as_deref());
            info!(slug = %project.slug, id = ?id, "Project registered");
        } else {
            warn!(slug = %project.slug, state = %outcome.state, "Platform rejected project");
        }
        Ok(outcome)
    }
}
