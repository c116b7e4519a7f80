// ABOUTME: GitHub steps configuring repositories and organizations through the REST API
// ABOUTME: Implements topics, repository edits, pull requests, repository creation and organization edits

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{parse_options, prepare_options};
use crate::engine::{
    EnableFlags, Result, ScaffoldContext, ScaffoldError, ScaffoldPlugin, ScaffoldRuntime,
    ScaffoldStep, StepRegistry,
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const REPOSITORY_STEP: &str = "github_repository";
const ORGANIZATION_STEP: &str = "github_organization";
const CLIENT_AGENT: &str = concat!("xscaffold/", env!("CARGO_PKG_VERSION"));

/// Options for `github_repository`
///
/// ```yaml
/// steps:
///   - github_repository:
///       name: acme/{{context.name}}
///       create:
///         private: true
///       steps:
///         - add_topics: [rust, service]
///         - set:
///             description: "{{context.description}}"
///         - create_pull:
///             title: Initial scaffold
///             head: scaffold
///             base: main
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryOptions {
    /// `owner/repo`
    pub name: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    /// `true` or a mapping of creation fields; the repository is created in the owner organization
    #[serde(default)]
    pub create: Value,
    #[serde(default)]
    pub steps: Vec<Map<String, Value>>,
    #[serde(flatten)]
    pub enable: EnableFlags,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationOptions {
    pub name: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub steps: Vec<Map<String, Value>>,
    #[serde(flatten)]
    pub enable: EnableFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RepositoryOperation {
    SetTopics(Vec<String>),
    AddTopics(Vec<String>),
    Set(Map<String, Value>),
    CreatePull(Map<String, Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrganizationOperation {
    Set(Map<String, Value>),
    CreateRepository(Map<String, Value>),
}

fn single_entry<'a>(step: &str, entry: &'a Map<String, Value>) -> Result<(&'a str, &'a Value)> {
    let mut iter = entry.iter();
    match (iter.next(), iter.next()) {
        (Some((key, value)), None) => Ok((key.as_str(), value)),
        _ => Err(ScaffoldError::invalid_options(
            step,
            "each operation must be a single-key mapping",
        )),
    }
}

fn fields(step: &str, operation: &str, value: &Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        _ => Err(ScaffoldError::invalid_options(
            step,
            format!("'{}' expects a mapping", operation),
        )),
    }
}

fn topics(step: &str, value: &Value) -> Result<Vec<String>> {
    parse_options(step, value)
}

impl RepositoryOperation {
    pub fn parse(entry: &Map<String, Value>) -> Result<Self> {
        let (name, value) = single_entry(REPOSITORY_STEP, entry)?;
        match name {
            "set_topics" => Ok(Self::SetTopics(topics(REPOSITORY_STEP, value)?)),
            "add_topics" => Ok(Self::AddTopics(topics(REPOSITORY_STEP, value)?)),
            "set" => Ok(Self::Set(fields(REPOSITORY_STEP, name, value)?)),
            "create_pull" => Ok(Self::CreatePull(fields(REPOSITORY_STEP, name, value)?)),
            other => Err(ScaffoldError::invalid_options(
                REPOSITORY_STEP,
                format!("unsupported repository operation '{}'", other),
            )),
        }
    }
}

impl OrganizationOperation {
    pub fn parse(entry: &Map<String, Value>) -> Result<Self> {
        let (name, value) = single_entry(ORGANIZATION_STEP, entry)?;
        match name {
            "set" => Ok(Self::Set(fields(ORGANIZATION_STEP, name, value)?)),
            "create_repo" => Ok(Self::CreateRepository(fields(ORGANIZATION_STEP, name, value)?)),
            other => Err(ScaffoldError::invalid_options(
                ORGANIZATION_STEP,
                format!("unsupported organization operation '{}'", other),
            )),
        }
    }
}

/// A created pull request
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}

#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn call(&self, step: &str, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = format!("{}{}", self.api_url, path);
        debug!("GitHub {} {}", method, url);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, CLIENT_AGENT);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ScaffoldError::step_failed(
                step,
                format!("{} {} failed with status {}: {}", method, path, status, text),
            ));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn get_topics(&self, repo: &str) -> Result<Vec<String>> {
        let response = self
            .call(REPOSITORY_STEP, Method::GET, &format!("/repos/{}/topics", repo), None)
            .await?;
        let names = response.get("names").cloned().unwrap_or(Value::Array(Vec::new()));
        topics(REPOSITORY_STEP, &names)
    }

    pub async fn replace_topics(&self, repo: &str, names: &[String]) -> Result<()> {
        self.call(
            REPOSITORY_STEP,
            Method::PUT,
            &format!("/repos/{}/topics", repo),
            Some(&json!({ "names": names })),
        )
        .await?;
        Ok(())
    }

    pub async fn edit_repository(&self, repo: &str, fields: &Map<String, Value>) -> Result<Value> {
        self.call(
            REPOSITORY_STEP,
            Method::PATCH,
            &format!("/repos/{}", repo),
            Some(&Value::Object(fields.clone())),
        )
        .await
    }

    pub async fn create_pull(&self, repo: &str, fields: &Map<String, Value>) -> Result<PullRequest> {
        let response = self
            .call(
                REPOSITORY_STEP,
                Method::POST,
                &format!("/repos/{}/pulls", repo),
                Some(&Value::Object(fields.clone())),
            )
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    pub async fn create_repository(
        &self,
        step: &str,
        organization: &str,
        name: &str,
        fields: &Map<String, Value>,
    ) -> Result<Value> {
        let mut body = fields.clone();
        body.insert("name".to_string(), Value::String(name.to_string()));
        self.call(
            step,
            Method::POST,
            &format!("/orgs/{}/repos", organization),
            Some(&Value::Object(body)),
        )
        .await
    }

    pub async fn edit_organization(&self, organization: &str, fields: &Map<String, Value>) -> Result<Value> {
        self.call(
            ORGANIZATION_STEP,
            Method::PATCH,
            &format!("/orgs/{}", organization),
            Some(&Value::Object(fields.clone())),
        )
        .await
    }
}

fn client_for(
    step: &str,
    api_url: Option<&str>,
    token: Option<&str>,
    context: &ScaffoldContext,
) -> GithubClient {
    let token = token
        .filter(|t| !t.is_empty())
        .or_else(|| context.env_var("GITHUB_TOKEN"))
        .map(str::to_string);
    if token.is_none() {
        warn!("{}: no token configured, requests are unauthenticated", step);
    }
    GithubClient::new(api_url.unwrap_or(DEFAULT_API_URL), token)
}

fn creation_fields(value: &Value) -> Result<Option<Map<String, Value>>> {
    match value {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::Bool(true) => Ok(Some(Map::new())),
        Value::Object(map) => Ok(Some(map.clone())),
        _ => Err(ScaffoldError::invalid_options(
            REPOSITORY_STEP,
            "'create' expects true or a mapping",
        )),
    }
}

pub struct GithubRepositoryStep;

#[async_trait]
impl ScaffoldStep for GithubRepositoryStep {
    async fn run(
        &self,
        context: &mut ScaffoldContext,
        options: &Value,
        _runtime: &dyn ScaffoldRuntime,
    ) -> Result<()> {
        let Some(rendered) = prepare_options(REPOSITORY_STEP, options, context)? else {
            return Ok(());
        };
        let options: RepositoryOptions = parse_options(REPOSITORY_STEP, &rendered)?;
        let operations = options
            .steps
            .iter()
            .map(RepositoryOperation::parse)
            .collect::<Result<Vec<_>>>()?;

        let client = client_for(
            REPOSITORY_STEP,
            options.api_url.as_deref(),
            options.token.as_deref(),
            context,
        );
        let repo = options.name.as_str();

        if let Some(fields) = creation_fields(&options.create)? {
            let Some((organization, name)) = repo.split_once('/') else {
                return Err(ScaffoldError::invalid_options(
                    REPOSITORY_STEP,
                    format!("'{}' is not of the form owner/repo", repo),
                ));
            };
            client
                .create_repository(REPOSITORY_STEP, organization, name, &fields)
                .await?;
            info!("Created repository {}", repo);
        }

        for operation in operations {
            match operation {
                RepositoryOperation::SetTopics(names) => {
                    client.replace_topics(repo, &names).await?;
                }
                RepositoryOperation::AddTopics(names) => {
                    let mut current = client.get_topics(repo).await?;
                    for name in names {
                        if !current.contains(&name) {
                            current.push(name);
                        }
                    }
                    client.replace_topics(repo, &current).await?;
                }
                RepositoryOperation::Set(fields) => {
                    client.edit_repository(repo, &fields).await?;
                }
                RepositoryOperation::CreatePull(fields) => {
                    let pull = client.create_pull(repo, &fields).await?;
                    info!("Opened pull request #{} on {}", pull.number, repo);
                    context.set("pr", json!({"number": pull.number, "url": pull.html_url}));
                }
            }
        }

        Ok(())
    }
}

pub struct GithubOrganizationStep;

#[async_trait]
impl ScaffoldStep for GithubOrganizationStep {
    async fn run(
        &self,
        context: &mut ScaffoldContext,
        options: &Value,
        _runtime: &dyn ScaffoldRuntime,
    ) -> Result<()> {
        let Some(rendered) = prepare_options(ORGANIZATION_STEP, options, context)? else {
            return Ok(());
        };
        let options: OrganizationOptions = parse_options(ORGANIZATION_STEP, &rendered)?;
        let operations = options
            .steps
            .iter()
            .map(OrganizationOperation::parse)
            .collect::<Result<Vec<_>>>()?;

        let client = client_for(
            ORGANIZATION_STEP,
            options.api_url.as_deref(),
            options.token.as_deref(),
            context,
        );

        for operation in operations {
            match operation {
                OrganizationOperation::Set(fields) => {
                    client.edit_organization(&options.name, &fields).await?;
                }
                OrganizationOperation::CreateRepository(mut fields) => {
                    let name = match fields.remove("name") {
                        Some(Value::String(name)) => name,
                        _ => {
                            return Err(ScaffoldError::invalid_options(
                                ORGANIZATION_STEP,
                                "'create_repo' requires a 'name'",
                            ))
                        }
                    };
                    client
                        .create_repository(ORGANIZATION_STEP, &options.name, &name, &fields)
                        .await?;
                    info!("Created repository {}/{}", options.name, name);
                }
            }
        }

        Ok(())
    }
}

pub struct GithubPlugin;

impl ScaffoldPlugin for GithubPlugin {
    fn name(&self) -> &'static str {
        "github"
    }

    fn init(&self, registry: &mut StepRegistry) {
        registry.add_step(REPOSITORY_STEP, Arc::new(GithubRepositoryStep));
        registry.add_step(ORGANIZATION_STEP, Arc::new(GithubOrganizationStep));
    }
}
