use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};

use crate::models::{AuthResponse, Credentials, NewTask, Task, TaskId, TaskPatch};

/// Thin client for the remote task API. Every call carries the bearer
/// token it is given; an absent token is sent as an empty credential and
/// left for the server to reject.
#[derive(Clone)]
pub struct TaskApi {
    client: Client,
    base_url: String,
}

impl TaskApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn todos_url(&self) -> String {
        format!("{}/api/todos", self.base_url)
    }

    fn todo_url(&self, id: &TaskId) -> String {
        format!("{}/api/todos/{}", self.base_url, urlencoding::encode(id.as_str()))
    }

    fn authorized(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        request.bearer_auth(token.unwrap_or_default())
    }

    pub async fn list(&self, token: Option<&str>) -> Result<Vec<Task>> {
        log::debug!("GET {}", self.todos_url());
        let tasks = self
            .authorized(self.client.get(self.todos_url()), token)
            .send()
            .await
            .context("Failed to send list request")?
            .error_for_status()
            .context("List request rejected")?
            .json()
            .await
            .context("Failed to parse task list")?;
        Ok(tasks)
    }

    pub async fn create(&self, token: Option<&str>, task: &NewTask) -> Result<Task> {
        log::debug!("POST {}", self.todos_url());
        let created = self
            .authorized(self.client.post(self.todos_url()), token)
            .json(task)
            .send()
            .await
            .context("Failed to send create request")?
            .error_for_status()
            .context("Create request rejected")?
            .json()
            .await
            .context("Failed to parse created task")?;
        Ok(created)
    }

    pub async fn update(&self, token: Option<&str>, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        log::debug!("PUT {}", self.todo_url(id));
        let updated = self
            .authorized(self.client.put(self.todo_url(id)), token)
            .json(patch)
            .send()
            .await
            .context("Failed to send update request")?
            .error_for_status()
            .context("Update request rejected")?
            .json()
            .await
            .context("Failed to parse updated task")?;
        Ok(updated)
    }

    pub async fn delete(&self, token: Option<&str>, id: &TaskId) -> Result<()> {
        log::debug!("DELETE {}", self.todo_url(id));
        // The confirmation body is not used.
        self.authorized(self.client.delete(self.todo_url(id)), token)
            .send()
            .await
            .context("Failed to send delete request")?
            .error_for_status()
            .context("Delete request rejected")?;
        Ok(())
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<String> {
        self.authenticate("login", credentials).await
    }

    pub async fn signup(&self, credentials: &Credentials) -> Result<String> {
        self.authenticate("signup", credentials).await
    }

    async fn authenticate(&self, action: &str, credentials: &Credentials) -> Result<String> {
        let url = format!("{}/api/auth/{}", self.base_url, action);
        log::debug!("POST {}", url);
        let response: AuthResponse = self
            .client
            .post(&url)
            .json(credentials)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", action))?
            .error_for_status()
            .with_context(|| format!("{} rejected", action))?
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", action))?;
        Ok(response.token)
    }
}
