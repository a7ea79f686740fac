//! REST client for the booking backend.
//!
//! Every request carries the [`RequestContext`]: the API base URL plus the
//! identity headers the backend expects (`x-test-user` in development, a
//! bearer token otherwise). Non-2xx answers surface as
//! [`ClientError::Status`] with the response body kept for display.
//!
//! The console talks to the backend only through the [`Backend`] trait so
//! handlers can be exercised against an in-memory stand-in.

pub mod models;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub use models::{ActivityDraft, Building, Space, SpaceDraft, User};

use crate::errors::ClientError;
use crate::fields::editor::TemplateDraft;
use crate::fields::{Template, TemplateKind};

const TRACING_TARGET: &str = "backoffice::client";

pub const TEST_USER_HEADER: &str = "x-test-user";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Where requests go and who they are made as.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    base_url: Url,
    pub test_user: Option<String>,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl RequestContext {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        Ok(Self {
            base_url: parsed,
            test_user: None,
            token: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_test_user(mut self, user: impl Into<String>) -> Self {
        self.test_user = Some(user.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Absolute URL for an API path such as `/activities/types`.
    ///
    /// The path is appended to the base, so a base of `https://host/api`
    /// keeps its `/api` prefix.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = match &self.test_user {
            Some(user) => builder.header(TEST_USER_HEADER, user),
            None => builder,
        };
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Operations the console needs from the backend.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_templates(&self, kind: TemplateKind) -> Result<Vec<Template>, ClientError>;
    async fn list_spaces(&self) -> Result<Vec<Space>, ClientError>;
    async fn list_buildings(&self) -> Result<Vec<Building>, ClientError>;
    async fn list_users(&self) -> Result<Vec<User>, ClientError>;
    async fn create_activity(&self, draft: &ActivityDraft) -> Result<(), ClientError>;
    async fn create_space(&self, draft: &SpaceDraft) -> Result<(), ClientError>;
    async fn update_space(&self, id: i64, draft: &SpaceDraft) -> Result<(), ClientError>;
    /// Create (`id == None`) or update a template.
    async fn save_template(&self, id: Option<i64>, draft: &TemplateDraft)
    -> Result<(), ClientError>;
    async fn delete_template(&self, kind: TemplateKind, id: i64) -> Result<(), ClientError>;

    /// A space by id, looked up in the collection listing.
    async fn find_space(&self, id: i64) -> Result<Option<Space>, ClientError> {
        Ok(self.list_spaces().await?.into_iter().find(|s| s.id == id))
    }
}

/// reqwest-backed [`Backend`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    ctx: RequestContext,
}

impl ApiClient {
    pub fn new(ctx: RequestContext) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(ctx.timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                path: ctx.base_url().to_string(),
                source,
            })?;
        Ok(Self { http, ctx })
    }

    async fn send<B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ClientError> {
        let builder = self.http.request(method.clone(), self.ctx.url(path));
        let builder = match body {
            Some(body) => builder.json(body),
            None => builder,
        };
        debug!(target: TRACING_TARGET, %method, path, "request");
        let resp = self
            .ctx
            .authorize(builder)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        warn!(target: TRACING_TARGET, %method, path, status = status.as_u16(), "request failed");
        Err(ClientError::Status {
            status: status.as_u16(),
            path: path.to_string(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send::<()>(Method::GET, path, None)
            .await?
            .json::<T>()
            .await
            .map_err(|source| ClientError::Decode {
                path: path.to_string(),
                source,
            })
    }

    async fn write_json<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<(), ClientError> {
        self.send(method, path, Some(body)).await.map(|_| ())
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn list_templates(&self, kind: TemplateKind) -> Result<Vec<Template>, ClientError> {
        self.get_json(kind.collection_path()).await
    }

    async fn list_spaces(&self) -> Result<Vec<Space>, ClientError> {
        self.get_json("/logistics/spaces").await
    }

    async fn list_buildings(&self) -> Result<Vec<Building>, ClientError> {
        self.get_json("/logistics/buildings").await
    }

    async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        self.get_json("/admin/users").await
    }

    async fn create_activity(&self, draft: &ActivityDraft) -> Result<(), ClientError> {
        self.write_json(Method::POST, "/activities/", draft).await
    }

    async fn create_space(&self, draft: &SpaceDraft) -> Result<(), ClientError> {
        self.write_json(Method::POST, "/logistics/spaces", draft).await
    }

    async fn update_space(&self, id: i64, draft: &SpaceDraft) -> Result<(), ClientError> {
        self.write_json(Method::PATCH, &format!("/logistics/spaces/{}", id), draft)
            .await
    }

    async fn save_template(
        &self,
        id: Option<i64>,
        draft: &TemplateDraft,
    ) -> Result<(), ClientError> {
        let collection = draft.kind.collection_path();
        let body = draft.to_json();
        match id {
            None => self.write_json(Method::POST, collection, &body).await,
            Some(id) => {
                self.write_json(Method::PATCH, &format!("{}/{}", collection, id), &body)
                    .await
            }
        }
    }

    async fn delete_template(&self, kind: TemplateKind, id: i64) -> Result<(), ClientError> {
        self.send::<()>(
            Method::DELETE,
            &format!("{}/{}", kind.collection_path(), id),
            None,
        )
        .await
        .map(|_| ())
    }
}
