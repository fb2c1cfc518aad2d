//! HTTP transport and the cache-mediated API client.
//!
//! Reads go through [`TaskdeckClient::query`]: a fresh cache entry is served
//! as-is, otherwise the key is fetched and the result stored unless a newer
//! fetch or write superseded it.
//!
//! Mutations go through [`TaskdeckClient::mutate`]:
//!
//! 1. every affected entry is rewritten to the intended state (and marked
//!    stale), keeping a snapshot;
//! 2. on success the affected entries are invalidated so the next read
//!    refetches server truth;
//! 3. on failure the snapshots are restored in reverse order and the error
//!    is returned unchanged.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use taskdeck_core::activity::entity_types;
use taskdeck_core::task::TaskStatus;
use taskdeck_core::types::DbId;
use taskdeck_events::ChangeEvent;

use crate::cache::{QueryCache, QueryKey};
use crate::config::ClientConfig;
use crate::debounce::Debouncer;
use crate::error::ClientError;

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// One API call, with `path` relative to `/api/v1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::PATCH,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            body: None,
        }
    }
}

/// Sends API requests and returns the decoded JSON body (`Null` for 204).
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: ApiRequest) -> Result<Value, ClientError>;

    /// Replace the bearer token used for subsequent requests.
    fn set_token(&self, _token: &str) {}
}

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
    token: RwLock<Option<String>>,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Self {
        let token = RwLock::new(config.token.clone());
        Self {
            client: reqwest::Client::new(),
            config,
            token,
        }
    }

    fn bearer(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ClientError> {
        let url = self.config.api_url(&request.path);
        tracing::debug!(method = %request.method, url = %url, "API request");

        let mut builder = self.client.request(request.method, &url);
        if let Some(token) = self.bearer() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &bytes));
        }
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn set_token(&self, token: &str) {
        *self
            .token
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(token.to_string());
    }
}

/// Server error body: `{ "error": "...", "code": "..." }`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    code: String,
}

fn api_error(status: u16, body: &[u8]) -> ClientError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => ClientError::Api {
            status,
            code: parsed.code,
            message: parsed.error,
        },
        Err(_) => ClientError::Api {
            status,
            code: String::new(),
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

/// Strip the `{ "data": ... }` envelope when present.
fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Optimistic updates
// ---------------------------------------------------------------------------

type Update = Box<dyn FnOnce(Option<&Value>) -> Option<Value> + Send>;

/// An optimistic rewrite of one cache entry.
pub struct Optimistic {
    key: QueryKey,
    update: Update,
}

impl Optimistic {
    pub fn new<F>(key: QueryKey, update: F) -> Self
    where
        F: FnOnce(Option<&Value>) -> Option<Value> + Send + 'static,
    {
        Self {
            key,
            update: Box::new(update),
        }
    }
}

/// Shallow-merge `patch` into an object value.
fn merge_object(current: Option<&Value>, patch: &Map<String, Value>) -> Option<Value> {
    let mut object = current?.as_object()?.clone();
    for (field, value) in patch {
        object.insert(field.clone(), value.clone());
    }
    Some(Value::Object(object))
}

/// Fold a later autosave patch into the pending one. Object patches merge
/// key by key; anything else replaces the pending patch.
fn merge_patch(pending: &mut Value, patch: Value) {
    match (pending, patch) {
        (Value::Object(pending), Value::Object(patch)) => pending.extend(patch),
        (pending, patch) => *pending = patch,
    }
}

/// Apply `f` to the element with `id` in an array value.
fn map_list_item<F>(current: Option<&Value>, id: DbId, f: F) -> Option<Value>
where
    F: FnOnce(&Value) -> Option<Value>,
{
    let mut items = current?.as_array()?.clone();
    let slot = items.iter_mut().find(|item| item["id"].as_i64() == Some(id))?;
    *slot = f(&*slot)?;
    Some(Value::Array(items))
}

fn remove_list_item(current: Option<&Value>, id: DbId) -> Option<Value> {
    let items = current?.as_array()?;
    Some(Value::Array(
        items
            .iter()
            .filter(|item| item["id"].as_i64() != Some(id))
            .cloned()
            .collect(),
    ))
}

fn add_time_spent(current: Option<&Value>, delta: i64) -> Option<Value> {
    let mut object = current?.as_object()?.clone();
    let spent = object.get("timeSpent").and_then(Value::as_i64).unwrap_or(0);
    object.insert("timeSpent".into(), json!((spent + delta).max(0)));
    Some(Value::Object(object))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// API client that mediates every read and write through a [`QueryCache`].
#[derive(Clone)]
pub struct TaskdeckClient {
    transport: Arc<dyn Transport>,
    cache: QueryCache,
    config: ClientConfig,
}

impl TaskdeckClient {
    pub fn new(config: ClientConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(config.clone()));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cache: QueryCache::new(),
            config,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Read `key`, fetching `path` unless a fresh value is cached.
    pub async fn query(&self, key: QueryKey, path: String) -> Result<Value, ClientError> {
        if let Some(value) = self.cache.peek(&key).and_then(|e| e.fresh_value().cloned()) {
            return Ok(value);
        }

        let ticket = self.cache.begin_fetch(&key);
        let value = unwrap_data(self.transport.send(ApiRequest::get(path)).await?);
        self.cache.complete_fetch(ticket, value.clone());
        Ok(value)
    }

    /// Run a mutation with optimistic cache updates.
    ///
    /// `optimistic` entries are rewritten before the request; they and every
    /// key in `invalidate` are marked stale on success. On failure the
    /// optimistic entries are restored and the error is returned.
    pub async fn mutate(
        &self,
        request: ApiRequest,
        optimistic: Vec<Optimistic>,
        invalidate: &[QueryKey],
    ) -> Result<Value, ClientError> {
        let snapshots: Vec<_> = optimistic
            .into_iter()
            .map(|o| self.cache.set_optimistic(&o.key, o.update))
            .collect();

        match self.transport.send(request.clone()).await {
            Ok(body) => {
                for snapshot in &snapshots {
                    self.cache.invalidate(snapshot.key());
                }
                for key in invalidate {
                    self.cache.invalidate(key);
                }
                Ok(unwrap_data(body))
            }
            Err(e) => {
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    error = %e,
                    rolled_back = snapshots.len(),
                    "Mutation failed; optimistic state rolled back"
                );
                for snapshot in snapshots.into_iter().rev() {
                    self.cache.rollback(snapshot);
                }
                Err(e)
            }
        }
    }

    /// Project the cached task belongs to, if known.
    fn cached_project_of(&self, task_id: DbId) -> Option<DbId> {
        self.cache
            .peek(&QueryKey::task(task_id))?
            .value?
            .get("projectId")?
            .as_i64()
    }

    fn cached_parent_of(&self, task_id: DbId) -> Option<DbId> {
        self.cache
            .peek(&QueryKey::task(task_id))?
            .value?
            .get("parentId")?
            .as_i64()
    }

    /// Keys whose derived numbers change when any task in `workspace_id`
    /// changes.
    fn task_rollups(&self, workspace_id: DbId, project_id: Option<DbId>) -> Vec<QueryKey> {
        let mut keys = vec![
            QueryKey::dashboard(workspace_id),
            QueryKey::activity(workspace_id),
        ];
        if let Some(project_id) = project_id {
            keys.push(QueryKey::tasks(project_id));
            keys.push(QueryKey::project_stats(project_id));
        }
        keys
    }

    // -- auth ---------------------------------------------------------------

    /// Log in and use the returned token for later requests.
    pub async fn login(&self, email: &str, password: &str) -> Result<Value, ClientError> {
        let body = self
            .transport
            .send(ApiRequest::post(
                "/auth/login",
                json!({ "email": email, "password": password }),
            ))
            .await?;
        if let Some(token) = body.get("accessToken").and_then(Value::as_str) {
            self.transport.set_token(token);
        }
        Ok(body)
    }

    // -- reads --------------------------------------------------------------

    pub async fn get_task(&self, workspace_id: DbId, task_id: DbId) -> Result<Value, ClientError> {
        self.query(
            QueryKey::task(task_id),
            format!("/workspaces/{workspace_id}/tasks/{task_id}"),
        )
        .await
    }

    /// Board listing for a project.
    pub async fn list_tasks(
        &self,
        workspace_id: DbId,
        project_id: DbId,
    ) -> Result<Value, ClientError> {
        self.query(
            QueryKey::tasks(project_id),
            format!("/workspaces/{workspace_id}/projects/{project_id}/tasks"),
        )
        .await
    }

    pub async fn list_subtasks(
        &self,
        workspace_id: DbId,
        parent_id: DbId,
    ) -> Result<Value, ClientError> {
        self.query(
            QueryKey::subtasks(parent_id),
            format!("/workspaces/{workspace_id}/tasks/{parent_id}/subtasks"),
        )
        .await
    }

    pub async fn time_entries(
        &self,
        workspace_id: DbId,
        task_id: DbId,
    ) -> Result<Value, ClientError> {
        self.query(
            QueryKey::time_entries(task_id),
            format!("/workspaces/{workspace_id}/tasks/{task_id}/time-entries"),
        )
        .await
    }

    pub async fn project_stats(
        &self,
        workspace_id: DbId,
        project_id: DbId,
    ) -> Result<Value, ClientError> {
        self.query(
            QueryKey::project_stats(project_id),
            format!("/workspaces/{workspace_id}/projects/{project_id}/stats"),
        )
        .await
    }

    pub async fn dashboard(&self, workspace_id: DbId) -> Result<Value, ClientError> {
        self.query(
            QueryKey::dashboard(workspace_id),
            format!("/workspaces/{workspace_id}/dashboard"),
        )
        .await
    }

    // -- task mutations -----------------------------------------------------

    pub async fn create_task(
        &self,
        workspace_id: DbId,
        project_id: DbId,
        body: Value,
    ) -> Result<Value, ClientError> {
        let parent = body.get("parentId").and_then(Value::as_i64);
        let mut invalidate = self.task_rollups(workspace_id, Some(project_id));
        if let Some(parent_id) = parent {
            invalidate.push(QueryKey::subtasks(parent_id));
            invalidate.push(QueryKey::task(parent_id));
        }
        self.mutate(
            ApiRequest::post(
                format!("/workspaces/{workspace_id}/projects/{project_id}/tasks"),
                body,
            ),
            Vec::new(),
            &invalidate,
        )
        .await
    }

    /// Partial update. The cached task (and its board row, when the project
    /// is known) shows the patched fields until the server answers.
    pub async fn update_task(
        &self,
        workspace_id: DbId,
        task_id: DbId,
        patch: Value,
    ) -> Result<Value, ClientError> {
        let fields = patch.as_object().cloned().unwrap_or_default();
        let project_id = self.cached_project_of(task_id);

        let mut optimistic = vec![Optimistic::new(QueryKey::task(task_id), {
            let fields = fields.clone();
            move |current| merge_object(current, &fields)
        })];
        if let Some(project_id) = project_id {
            optimistic.push(Optimistic::new(QueryKey::tasks(project_id), move |current| {
                map_list_item(current, task_id, |row| merge_object(Some(row), &fields))
            }));
        }

        let mut invalidate = self.task_rollups(workspace_id, project_id);
        if let Some(parent_id) = self.cached_parent_of(task_id) {
            invalidate.push(QueryKey::subtasks(parent_id));
        }

        self.mutate(
            ApiRequest::patch(format!("/workspaces/{workspace_id}/tasks/{task_id}"), patch),
            optimistic,
            &invalidate,
        )
        .await
    }

    /// Board drag-and-drop.
    pub async fn move_task(
        &self,
        workspace_id: DbId,
        task_id: DbId,
        status: TaskStatus,
        position: i32,
    ) -> Result<Value, ClientError> {
        let fields: Map<String, Value> = [
            ("status".to_string(), json!(status.as_str())),
            ("position".to_string(), json!(position)),
        ]
        .into_iter()
        .collect();
        let project_id = self.cached_project_of(task_id);

        let mut optimistic = vec![Optimistic::new(QueryKey::task(task_id), {
            let fields = fields.clone();
            move |current| merge_object(current, &fields)
        })];
        if let Some(project_id) = project_id {
            optimistic.push(Optimistic::new(QueryKey::tasks(project_id), move |current| {
                map_list_item(current, task_id, |row| merge_object(Some(row), &fields))
            }));
        }

        self.mutate(
            ApiRequest::post(
                format!("/workspaces/{workspace_id}/tasks/{task_id}/move"),
                json!({ "status": status.as_str(), "position": position }),
            ),
            optimistic,
            &self.task_rollups(workspace_id, project_id),
        )
        .await
    }

    /// Flip a task (usually a subtask) between `done` and `todo`.
    pub async fn toggle_task(&self, workspace_id: DbId, task_id: DbId) -> Result<Value, ClientError> {
        let flip = |row: &Value| {
            let done = row["status"].as_str() == Some(TaskStatus::Done.as_str());
            let next = TaskStatus::for_completion(!done);
            merge_object(
                Some(row),
                &[("status".to_string(), json!(next.as_str()))]
                    .into_iter()
                    .collect(),
            )
        };

        let mut optimistic = vec![Optimistic::new(QueryKey::task(task_id), move |current| {
            current.and_then(flip)
        })];
        let parent_id = self.cached_parent_of(task_id);
        let mut invalidate = self.task_rollups(workspace_id, self.cached_project_of(task_id));
        if let Some(parent_id) = parent_id {
            optimistic.push(Optimistic::new(QueryKey::subtasks(parent_id), move |current| {
                let mut list = current?.as_object()?.clone();
                let subtasks = map_list_item(list.get("subtasks"), task_id, flip)?;
                list.insert("subtasks".into(), subtasks);
                Some(Value::Object(list))
            }));
            invalidate.push(QueryKey::task(parent_id));
        }

        self.mutate(
            ApiRequest::post(
                format!("/workspaces/{workspace_id}/tasks/{task_id}/toggle"),
                json!({}),
            ),
            optimistic,
            &invalidate,
        )
        .await
    }

    pub async fn delete_task(&self, workspace_id: DbId, task_id: DbId) -> Result<Value, ClientError> {
        let project_id = self.cached_project_of(task_id);
        let mut optimistic = Vec::new();
        if let Some(project_id) = project_id {
            optimistic.push(Optimistic::new(QueryKey::tasks(project_id), move |current| {
                remove_list_item(current, task_id)
            }));
        }
        let mut invalidate = self.task_rollups(workspace_id, project_id);
        invalidate.push(QueryKey::task(task_id));
        if let Some(parent_id) = self.cached_parent_of(task_id) {
            invalidate.push(QueryKey::subtasks(parent_id));
        }

        self.mutate(
            ApiRequest::delete(format!("/workspaces/{workspace_id}/tasks/{task_id}")),
            optimistic,
            &invalidate,
        )
        .await
    }

    /// Bulk status/priority/assignee/milestone update for one project.
    pub async fn bulk_update(
        &self,
        workspace_id: DbId,
        project_id: DbId,
        task_ids: &[DbId],
        fields: Value,
    ) -> Result<Value, ClientError> {
        let patch = fields.as_object().cloned().unwrap_or_default();
        let mut body = patch.clone();
        body.insert("projectId".into(), json!(project_id));
        body.insert("taskIds".into(), json!(task_ids));

        let mut optimistic: Vec<Optimistic> = task_ids
            .iter()
            .map(|&id| {
                let patch = patch.clone();
                Optimistic::new(QueryKey::task(id), move |current| merge_object(current, &patch))
            })
            .collect();
        let ids = task_ids.to_vec();
        optimistic.push(Optimistic::new(QueryKey::tasks(project_id), move |current| {
            let mut items = current?.as_array()?.clone();
            for item in items.iter_mut() {
                if item["id"].as_i64().is_some_and(|id| ids.contains(&id)) {
                    if let Some(next) = merge_object(Some(&*item), &patch) {
                        *item = next;
                    }
                }
            }
            Some(Value::Array(items))
        }));

        self.mutate(
            ApiRequest::patch(
                format!("/workspaces/{workspace_id}/tasks/bulk"),
                Value::Object(body),
            ),
            optimistic,
            &self.task_rollups(workspace_id, Some(project_id)),
        )
        .await
    }

    /// Starts a debounced autosave of task fields. Each push is a partial
    /// patch; patches pushed within one burst are merged key by key (later
    /// keys win) and saved as a single update once edits settle.
    pub fn task_autosave(&self, workspace_id: DbId, task_id: DbId) -> Debouncer<Value> {
        let client = self.clone();
        Debouncer::spawn_merging(self.config.autosave_delay, merge_patch, move |patch: Value| {
            let client = client.clone();
            async move {
                client
                    .update_task(workspace_id, task_id, patch)
                    .await
                    .map(|_| ())
            }
        })
    }

    // -- time tracking ------------------------------------------------------

    /// Log time against a task. `body` carries `duration` (minutes) and the
    /// optional `description`, `date`, `startTime`, `endTime`.
    pub async fn log_time(
        &self,
        workspace_id: DbId,
        task_id: DbId,
        body: Value,
    ) -> Result<Value, ClientError> {
        let duration = body.get("duration").and_then(Value::as_i64).unwrap_or(0);
        let optimistic = vec![Optimistic::new(QueryKey::task(task_id), move |current| {
            add_time_spent(current, duration)
        })];
        let mut invalidate = vec![
            QueryKey::time_entries(task_id),
            QueryKey::activity(workspace_id),
        ];
        if let Some(project_id) = self.cached_project_of(task_id) {
            invalidate.push(QueryKey::tasks(project_id));
        }

        self.mutate(
            ApiRequest::post(
                format!("/workspaces/{workspace_id}/tasks/{task_id}/time-entries"),
                body,
            ),
            optimistic,
            &invalidate,
        )
        .await
    }

    pub async fn delete_time_entry(
        &self,
        workspace_id: DbId,
        task_id: DbId,
        entry_id: DbId,
    ) -> Result<Value, ClientError> {
        let duration = self
            .cache
            .peek(&QueryKey::time_entries(task_id))
            .and_then(|entry| entry.value)
            .and_then(|list| {
                list["timeEntries"]
                    .as_array()?
                    .iter()
                    .find(|e| e["id"].as_i64() == Some(entry_id))?["duration"]
                    .as_i64()
            });

        let mut optimistic = vec![Optimistic::new(
            QueryKey::time_entries(task_id),
            move |current| {
                let mut list = current?.as_object()?.clone();
                let entries = remove_list_item(list.get("timeEntries"), entry_id)?;
                list.insert("timeEntries".into(), entries);
                Some(Value::Object(list))
            },
        )];
        if let Some(duration) = duration {
            optimistic.push(Optimistic::new(QueryKey::task(task_id), move |current| {
                add_time_spent(current, -duration)
            }));
        }
        let mut invalidate = vec![QueryKey::task(task_id), QueryKey::activity(workspace_id)];
        if let Some(project_id) = self.cached_project_of(task_id) {
            invalidate.push(QueryKey::tasks(project_id));
        }

        self.mutate(
            ApiRequest::delete(format!(
                "/workspaces/{workspace_id}/tasks/{task_id}/time-entries?entryId={entry_id}"
            )),
            optimistic,
            &invalidate,
        )
        .await
    }

    // -- change events ------------------------------------------------------

    /// Invalidate entries touched by a change another client made.
    pub fn apply_event(&self, event: &ChangeEvent) {
        let ws = event.workspace_id;
        self.cache.invalidate(&QueryKey::activity(ws));
        self.cache.invalidate(&QueryKey::dashboard(ws));

        match event.entity_type.as_str() {
            entity_types::TASK => {
                let task_id = event
                    .payload
                    .get("taskId")
                    .and_then(Value::as_i64)
                    .unwrap_or(event.entity_id);
                self.cache.invalidate(&QueryKey::task(task_id));
                self.cache.invalidate(&QueryKey::time_entries(task_id));
                self.cache.invalidate(&QueryKey::subtasks(task_id));
                match event.payload.get("projectId").and_then(Value::as_i64) {
                    Some(project_id) => {
                        self.cache.invalidate(&QueryKey::tasks(project_id));
                        self.cache.invalidate(&QueryKey::project_stats(project_id));
                    }
                    None => {
                        self.cache.invalidate_prefix(&["tasks"]);
                        self.cache.invalidate_prefix(&["project-stats"]);
                    }
                }
                if let Some(parent_id) = event.payload.get("parentId").and_then(Value::as_i64) {
                    self.cache.invalidate(&QueryKey::subtasks(parent_id));
                    self.cache.invalidate(&QueryKey::task(parent_id));
                }
            }
            entity_types::PROJECT | entity_types::LABEL => {
                self.cache.invalidate(&QueryKey::project(event.entity_id));
                self.cache.invalidate(&QueryKey::project_stats(event.entity_id));
                self.cache.invalidate(&QueryKey::tasks(event.entity_id));
            }
            entity_types::MILESTONE => {
                self.cache.invalidate(&QueryKey::milestone(event.entity_id));
            }
            entity_types::MEMBER | entity_types::WORKSPACE => {
                self.cache.invalidate(&QueryKey::members(ws));
            }
            other => {
                tracing::debug!(entity_type = other, "No cache keys for change event");
            }
        }
    }
}
