use anyhow::Result;
use std::future::Future;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::api::TaskApi;
use crate::location::Location;
use crate::models::{Credentials, NewTask, Task, TaskId, TaskPatch};
use crate::session::{SessionStore, TOKEN_KEY};

/// Completion of a request issued by the controller. Events are applied
/// in the order they arrive, whatever order the requests went out in.
#[derive(Debug)]
pub enum ApiEvent {
    Listed(Vec<Task>),
    Created,
    Updated { id: TaskId, saved_edit: bool },
    Deleted,
    LoggedIn(String),
    Failed { action: &'static str, error: anyhow::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthView {
    Login,
    Signup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
    Viewing,
    Editing { id: TaskId, scratch: String },
}

impl EditState {
    pub fn editing_id(&self) -> Option<&TaskId> {
        match self {
            EditState::Editing { id, .. } => Some(id),
            EditState::Viewing => None,
        }
    }
}

/// Inputs of the add-task row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub due_date: String,
    pub due_time: String,
}

impl Draft {
    fn clear(&mut self) {
        self.text.clear();
        self.due_date.clear();
        self.due_time.clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub tasks: Vec<Task>,
    pub draft: Draft,
    pub edit: EditState,
}

impl Default for Board {
    fn default() -> Self {
        Board {
            tasks: Vec::new(),
            draft: Draft::default(),
            edit: EditState::Viewing,
        }
    }
}

impl Board {
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    Unauthenticated(AuthView),
    Authenticated(Board),
}

/// Owns all client-side state and drives the task API.
///
/// Every mutation is followed by a full list fetch; the local list is only
/// ever replaced by a server response, never patched in place.
pub struct App<S: SessionStore> {
    store: S,
    api: TaskApi,
    runtime: Handle,
    events_tx: UnboundedSender<ApiEvent>,
    events_rx: UnboundedReceiver<ApiEvent>,
    session: Session,
    bootstrapped: bool,
    pub status: Option<String>,
}

impl<S: SessionStore> App<S> {
    pub fn new(store: S, api: TaskApi, runtime: Handle) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        App {
            store,
            api,
            runtime,
            events_tx,
            events_rx,
            session: Session::Unauthenticated(AuthView::Login),
            bootstrapped: false,
            status: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.session, Session::Authenticated(_))
    }

    pub fn board(&self) -> Option<&Board> {
        match &self.session {
            Session::Authenticated(board) => Some(board),
            Session::Unauthenticated(_) => None,
        }
    }

    pub fn board_mut(&mut self) -> Option<&mut Board> {
        match &mut self.session {
            Session::Authenticated(board) => Some(board),
            Session::Unauthenticated(_) => None,
        }
    }

    /// Decides the initial session from the launch URL and stored token.
    /// Only the first call has any effect.
    pub fn bootstrap(&mut self, location: &mut Location) -> Result<()> {
        if self.bootstrapped {
            return Ok(());
        }
        self.bootstrapped = true;

        if let Some(token) = location.take_query_param(TOKEN_KEY) {
            self.store.set(TOKEN_KEY, &token)?;
            log::info!("token taken from launch URL, now {}", location.href());
            self.set_authenticated()?;
        } else if self.store.token()?.is_some() {
            log::info!("resuming stored session");
            self.set_authenticated()?;
        } else {
            log::debug!("no session, showing login");
        }
        Ok(())
    }

    /// Moves to the authenticated state. On the transition, and only then,
    /// the task list is fetched if a token is present.
    fn set_authenticated(&mut self) -> Result<()> {
        if self.is_authenticated() {
            return Ok(());
        }
        self.session = Session::Authenticated(Board::default());
        if self.store.token()?.is_some() {
            self.fetch_tasks()?;
        }
        Ok(())
    }

    pub fn on_login(&mut self, token: &str) -> Result<()> {
        self.store.set(TOKEN_KEY, token)?;
        self.status = None;
        self.set_authenticated()
    }

    pub fn switch_auth_view(&mut self) {
        if let Session::Unauthenticated(view) = &mut self.session {
            *view = match view {
                AuthView::Login => AuthView::Signup,
                AuthView::Signup => AuthView::Login,
            };
        }
    }

    /// Sends credentials through whichever auth view is showing.
    pub fn submit_auth(&mut self, credentials: Credentials) {
        let Session::Unauthenticated(view) = &self.session else {
            return;
        };
        let view = *view;
        let api = self.api.clone();
        self.spawn(async move {
            let (action, result) = match view {
                AuthView::Login => ("login", api.login(&credentials).await),
                AuthView::Signup => ("signup", api.signup(&credentials).await),
            };
            match result {
                Ok(token) => ApiEvent::LoggedIn(token),
                Err(error) => ApiEvent::Failed { action, error },
            }
        });
    }

    pub fn fetch_tasks(&mut self) -> Result<()> {
        let token = self.store.token()?;
        let api = self.api.clone();
        self.spawn(async move {
            match api.list(token.as_deref()).await {
                Ok(tasks) => ApiEvent::Listed(tasks),
                Err(error) => ApiEvent::Failed { action: "list", error },
            }
        });
        Ok(())
    }

    /// Creates a task from the draft. Blank text sends nothing and keeps
    /// the draft as it is.
    pub fn add_task(&mut self) -> Result<()> {
        let Some(board) = self.board() else {
            return Ok(());
        };
        if board.draft.text.trim().is_empty() {
            return Ok(());
        }
        let new_task = NewTask {
            text: board.draft.text.clone(),
            due_date: non_empty(&board.draft.due_date),
            due_time: non_empty(&board.draft.due_time),
        };

        let token = self.store.token()?;
        let api = self.api.clone();
        self.spawn(async move {
            match api.create(token.as_deref(), &new_task).await {
                Ok(_) => ApiEvent::Created,
                Err(error) => ApiEvent::Failed { action: "create", error },
            }
        });
        Ok(())
    }

    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<()> {
        self.send_update(id, patch, false)
    }

    fn send_update(&mut self, id: TaskId, patch: TaskPatch, saved_edit: bool) -> Result<()> {
        let token = self.store.token()?;
        let api = self.api.clone();
        self.spawn(async move {
            match api.update(token.as_deref(), &id, &patch).await {
                Ok(_) => ApiEvent::Updated { id, saved_edit },
                Err(error) => ApiEvent::Failed { action: "update", error },
            }
        });
        Ok(())
    }

    pub fn toggle_completed(&mut self, id: &TaskId) -> Result<()> {
        let Some(completed) = self.board().and_then(|b| b.task(id)).map(|t| t.completed) else {
            return Ok(());
        };
        self.update_task(id.clone(), TaskPatch::completed(!completed))
    }

    pub fn delete_task(&mut self, id: &TaskId) -> Result<()> {
        let token = self.store.token()?;
        let api = self.api.clone();
        let id = id.clone();
        self.spawn(async move {
            match api.delete(token.as_deref(), &id).await {
                Ok(()) => ApiEvent::Deleted,
                Err(error) => ApiEvent::Failed { action: "delete", error },
            }
        });
        Ok(())
    }

    /// Puts `id` into edit mode, seeding the scratch text from the task.
    /// An unsaved edit on another task is dropped.
    pub fn start_edit(&mut self, id: &TaskId) {
        let Some(board) = self.board_mut() else {
            return;
        };
        let Some(text) = board.task(id).map(|t| t.text.clone()) else {
            return;
        };
        board.edit = EditState::Editing {
            id: id.clone(),
            scratch: text,
        };
    }

    pub fn scratch_mut(&mut self) -> Option<&mut String> {
        match self.board_mut().map(|b| &mut b.edit) {
            Some(EditState::Editing { scratch, .. }) => Some(scratch),
            _ => None,
        }
    }

    /// Saves the edit in progress. Blank scratch text is ignored and the
    /// task stays in edit mode; otherwise edit mode ends once the update
    /// succeeds.
    pub fn save_edit(&mut self) -> Result<()> {
        let Some(EditState::Editing { id, scratch }) = self.board().map(|b| &b.edit) else {
            return Ok(());
        };
        if scratch.trim().is_empty() {
            return Ok(());
        }
        let (id, patch) = (id.clone(), TaskPatch::text(scratch.clone()));
        self.send_update(id, patch, true)
    }

    /// Drops the stored token and local list without telling the server.
    pub fn logout(&mut self) -> Result<()> {
        self.store.remove(TOKEN_KEY)?;
        self.session = Session::Unauthenticated(AuthView::Login);
        self.status = None;
        log::info!("logged out");
        Ok(())
    }

    pub fn apply(&mut self, event: ApiEvent) -> Result<()> {
        if let ApiEvent::Failed { action, error } = event {
            log::warn!("{} failed: {:#}", action, error);
            // Task requests still in flight at logout have nothing to report on the auth form.
            let auth_action = matches!(action, "login" | "signup");
            if self.is_authenticated() != auth_action {
                self.status = Some(format!("{} failed: {}", action, error));
            }
            return Ok(());
        }
        if let ApiEvent::LoggedIn(token) = event {
            return self.on_login(&token);
        }

        let Some(board) = self.board_mut() else {
            log::debug!("dropping {:?} received while logged out", event);
            return Ok(());
        };
        match event {
            ApiEvent::Listed(tasks) => {
                log::debug!("list replaced with {} tasks", tasks.len());
                board.tasks = tasks;
                self.status = None;
            }
            ApiEvent::Created => {
                board.draft.clear();
                self.fetch_tasks()?;
            }
            ApiEvent::Updated { id, saved_edit } => {
                if saved_edit && board.edit.editing_id() == Some(&id) {
                    board.edit = EditState::Viewing;
                }
                self.fetch_tasks()?;
            }
            ApiEvent::Deleted => self.fetch_tasks()?,
            ApiEvent::LoggedIn(_) | ApiEvent::Failed { .. } => {}
        }
        Ok(())
    }

    /// Applies every completion that has already arrived.
    pub fn pump(&mut self) -> Result<()> {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event)?;
        }
        Ok(())
    }

    pub async fn next_event(&mut self) -> Option<ApiEvent> {
        self.events_rx.recv().await
    }

    fn spawn<F>(&self, request: F)
    where
        F: Future<Output = ApiEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            // The receiver only goes away when the app shuts down.
            let _ = tx.send(request.await);
        });
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_for(server: &MockServer, token: Option<&str>) -> App<Database> {
        let db = Database::in_memory().unwrap();
        if let Some(token) = token {
            db.set(TOKEN_KEY, token).unwrap();
        }
        App::new(db, TaskApi::new(server.uri()), Handle::current())
    }

    async fn settle(app: &mut App<Database>, events: usize) {
        for _ in 0..events {
            let event = app.next_event().await.unwrap();
            app.apply(event).unwrap();
        }
    }

    async fn mount_list(server: &MockServer, body: serde_json::Value, times: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path("/api/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body));
        match times {
            Some(n) => mock.up_to_n_times(n).mount(server).await,
            None => mock.mount(server).await,
        }
    }

    /// Gives spawned requests time to reach the server, then lists the
    /// methods it saw.
    async fn methods_received(server: &MockServer) -> Vec<String> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.method.to_string())
            .collect()
    }

    fn texts(app: &App<Database>) -> Vec<String> {
        app.board().unwrap().tasks.iter().map(|t| t.text.clone()).collect()
    }

    #[tokio::test]
    async fn launch_token_is_persisted_and_stripped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_for(&server, None);
        let mut location = Location::parse("taskpad://callback?token=fresh").unwrap();
        app.bootstrap(&mut location).unwrap();
        settle(&mut app, 1).await;

        assert_eq!(app.store().token().unwrap().as_deref(), Some("fresh"));
        assert_eq!(location.href(), "taskpad://callback");
        assert!(app.is_authenticated());
    }

    #[tokio::test]
    async fn stored_token_resumes_session_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "text": "Buy milk"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        app.bootstrap(&mut Location::parse("x://y?token=other").unwrap()).unwrap();
        settle(&mut app, 1).await;

        assert_eq!(texts(&app), vec!["Buy milk"]);
        assert_eq!(app.store().token().unwrap().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn no_token_shows_login_and_toggles_to_signup() {
        let server = MockServer::start().await;
        let mut app = app_for(&server, None);
        app.bootstrap(&mut Location::blank()).unwrap();
        assert_eq!(app.session(), &Session::Unauthenticated(AuthView::Login));

        app.switch_auth_view();
        assert_eq!(app.session(), &Session::Unauthenticated(AuthView::Signup));
        app.switch_auth_view();
        assert_eq!(app.session(), &Session::Unauthenticated(AuthView::Login));
    }

    #[tokio::test]
    async fn signup_stores_token_and_loads_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "new"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .and(header("authorization", "Bearer new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_for(&server, None);
        app.bootstrap(&mut Location::blank()).unwrap();
        app.switch_auth_view();
        app.submit_auth(Credentials {
            email: "a@b.c".into(),
            password: "pw".into(),
        });
        settle(&mut app, 2).await;

        assert!(app.is_authenticated());
        assert_eq!(app.store().token().unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn toggle_updates_then_refetches() {
        let server = MockServer::start().await;
        mount_list(&server, json!([{"id": 1, "text": "Buy milk", "completed": false}]), Some(1)).await;
        mount_list(&server, json!([{"id": 1, "text": "Buy milk", "completed": true}]), None).await;
        Mock::given(method("PUT"))
            .and(path("/api/todos/1"))
            .and(header("authorization", "Bearer abc"))
            .and(body_json(json!({"completed": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": 1, "text": "Buy milk", "completed": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        settle(&mut app, 1).await;
        assert!(!app.board().unwrap().tasks[0].completed);

        app.toggle_completed(&TaskId::new("1")).unwrap();
        settle(&mut app, 2).await;
        assert!(app.board().unwrap().tasks[0].completed);
    }

    #[tokio::test]
    async fn double_toggle_restores_original_value() {
        let server = MockServer::start().await;
        mount_list(&server, json!([{"id": 1, "text": "a", "completed": false}]), Some(1)).await;
        mount_list(&server, json!([{"id": 1, "text": "a", "completed": true}]), Some(1)).await;
        mount_list(&server, json!([{"id": 1, "text": "a", "completed": false}]), None).await;
        for completed in [true, false] {
            Mock::given(method("PUT"))
                .and(path("/api/todos/1"))
                .and(body_json(json!({"completed": completed})))
                .respond_with(ResponseTemplate::new(200).set_body_json(
                    json!({"id": 1, "text": "a", "completed": completed}),
                ))
                .expect(1)
                .mount(&server)
                .await;
        }

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        settle(&mut app, 1).await;

        let id = TaskId::new("1");
        app.toggle_completed(&id).unwrap();
        settle(&mut app, 2).await;
        app.toggle_completed(&id).unwrap();
        settle(&mut app, 2).await;
        assert!(!app.board().unwrap().tasks[0].completed);
    }

    #[tokio::test]
    async fn blank_draft_is_never_sent() {
        let server = MockServer::start().await;
        mount_list(&server, json!([]), None).await;
        Mock::given(method("POST"))
            .and(path("/api/todos"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        settle(&mut app, 1).await;

        for text in ["", "   "] {
            let draft = &mut app.board_mut().unwrap().draft;
            draft.text = text.into();
            draft.due_date = "2024-05-01".into();
            app.add_task().unwrap();
            let draft = &app.board().unwrap().draft;
            assert_eq!(draft.text, text);
            assert_eq!(draft.due_date, "2024-05-01");
        }

        assert_eq!(methods_received(&server).await, vec!["GET"]);
        assert!(app.events_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn add_clears_draft_and_refetches() {
        let server = MockServer::start().await;
        mount_list(&server, json!([]), Some(1)).await;
        mount_list(&server, json!([{"_id": "x", "text": "Call mom", "dueTime": "09:00"}]), None)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/todos"))
            .and(body_json(json!({"text": "Call mom", "dueDate": null, "dueTime": "09:00"})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"_id": "x", "text": "Call mom"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        settle(&mut app, 1).await;

        let draft = &mut app.board_mut().unwrap().draft;
        draft.text = "Call mom".into();
        draft.due_time = "09:00".into();
        app.add_task().unwrap();
        settle(&mut app, 2).await;

        assert_eq!(app.board().unwrap().draft, Draft::default());
        assert_eq!(texts(&app), vec!["Call mom"]);
    }

    #[tokio::test]
    async fn draft_clears_even_if_refetch_fails() {
        let server = MockServer::start().await;
        mount_list(&server, json!([]), Some(1)).await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/todos"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"_id": "x", "text": "t"})),
            )
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        settle(&mut app, 1).await;

        app.board_mut().unwrap().draft.text = "t".into();
        app.add_task().unwrap();
        settle(&mut app, 2).await;

        assert_eq!(app.board().unwrap().draft.text, "");
        assert!(app.board().unwrap().tasks.is_empty());
        assert!(app.status.as_deref().unwrap().starts_with("list failed"));
    }

    #[tokio::test]
    async fn switching_edit_discards_previous_scratch() {
        let server = MockServer::start().await;
        mount_list(&server, json!([{"id": 1, "text": "A"}, {"id": 2, "text": "B"}]), None).await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        settle(&mut app, 1).await;

        app.start_edit(&TaskId::new("1"));
        app.scratch_mut().unwrap().push_str(" changed");
        app.start_edit(&TaskId::new("2"));

        assert_eq!(
            app.board().unwrap().edit,
            EditState::Editing {
                id: TaskId::new("2"),
                scratch: "B".into()
            }
        );
        assert_eq!(texts(&app), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn save_edit_sends_text_and_returns_to_viewing() {
        let server = MockServer::start().await;
        mount_list(&server, json!([{"id": 1, "text": "old"}]), Some(1)).await;
        mount_list(&server, json!([{"id": 1, "text": "new"}]), None).await;
        Mock::given(method("PUT"))
            .and(path("/api/todos/1"))
            .and(body_json(json!({"text": "new"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "text": "new"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        settle(&mut app, 1).await;

        app.start_edit(&TaskId::new("1"));
        *app.scratch_mut().unwrap() = "new".into();
        app.save_edit().unwrap();
        settle(&mut app, 2).await;

        assert_eq!(app.board().unwrap().edit, EditState::Viewing);
        assert_eq!(texts(&app), vec!["new"]);
    }

    // Saving blank text leaves the field open with nothing sent, which is
    // also what happens when the field loses focus while blank.
    #[tokio::test]
    async fn blank_save_stays_in_edit_mode() {
        let server = MockServer::start().await;
        mount_list(&server, json!([{"id": 1, "text": "old"}]), None).await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        settle(&mut app, 1).await;

        app.start_edit(&TaskId::new("1"));
        *app.scratch_mut().unwrap() = "  ".into();
        app.save_edit().unwrap();

        assert_eq!(methods_received(&server).await, vec!["GET"]);
        assert!(app.events_rx.try_recv().is_err());
        assert_eq!(app.board().unwrap().edit.editing_id(), Some(&TaskId::new("1")));
    }

    #[tokio::test]
    async fn delete_refetches() {
        let server = MockServer::start().await;
        mount_list(&server, json!([{"id": 1, "text": "a"}, {"id": 2, "text": "b"}]), Some(1)).await;
        mount_list(&server, json!([{"id": 2, "text": "b"}]), None).await;
        Mock::given(method("DELETE"))
            .and(path("/api/todos/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        settle(&mut app, 1).await;

        app.delete_task(&TaskId::new("1")).unwrap();
        settle(&mut app, 2).await;
        assert_eq!(texts(&app), vec!["b"]);
    }

    #[tokio::test]
    async fn logout_clears_token_and_list() {
        let server = MockServer::start().await;
        mount_list(&server, json!([{"id": 1, "text": "a"}]), None).await;

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        settle(&mut app, 1).await;
        assert_eq!(texts(&app).len(), 1);

        // a list response landing after logout is ignored
        app.fetch_tasks().unwrap();
        app.logout().unwrap();
        settle(&mut app, 1).await;

        assert_eq!(app.session(), &Session::Unauthenticated(AuthView::Login));
        assert!(app.board().is_none());
        assert_eq!(app.store().token().unwrap(), None);
    }

    #[tokio::test]
    async fn logout_without_tasks_is_fine() {
        let server = MockServer::start().await;
        mount_list(&server, json!([]), None).await;

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        app.logout().unwrap();
        assert!(app.board().is_none());
        assert_eq!(app.store().token().unwrap(), None);
    }

    #[tokio::test]
    async fn failed_list_keeps_previous_tasks() {
        let server = MockServer::start().await;
        mount_list(&server, json!([{"id": 1, "text": "kept"}]), Some(1)).await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        settle(&mut app, 1).await;
        app.fetch_tasks().unwrap();
        settle(&mut app, 1).await;

        assert_eq!(texts(&app), vec!["kept"]);
        assert!(app.status.is_some());
    }

    #[tokio::test]
    async fn successful_list_clears_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_list(&server, json!([{"id": 1, "text": "back"}]), None).await;

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        settle(&mut app, 1).await;
        assert!(app.status.as_deref().unwrap().starts_with("list failed"));

        app.fetch_tasks().unwrap();
        settle(&mut app, 1).await;
        assert_eq!(texts(&app), vec!["back"]);
        assert_eq!(app.status, None);
    }

    #[tokio::test]
    async fn task_failure_after_logout_stays_off_login_screen() {
        let server = MockServer::start().await;
        mount_list(&server, json!([{"id": 1, "text": "a"}]), None).await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some("abc"));
        app.bootstrap(&mut Location::blank()).unwrap();
        settle(&mut app, 1).await;

        app.delete_task(&TaskId::new("1")).unwrap();
        app.logout().unwrap();
        settle(&mut app, 1).await;

        assert_eq!(app.session(), &Session::Unauthenticated(AuthView::Login));
        assert_eq!(app.status, None);
    }

    #[tokio::test]
    async fn login_failure_is_reported_on_login_screen() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let mut app = app_for(&server, None);
        app.bootstrap(&mut Location::blank()).unwrap();
        app.submit_auth(Credentials {
            email: "a@b.c".into(),
            password: "wrong".into(),
        });
        settle(&mut app, 1).await;

        assert!(app.status.as_deref().unwrap().starts_with("login failed"));
    }

    // Responses are applied as they arrive, so a slow early request
    // overwrites a quick later one.
    #[tokio::test]
    async fn later_arriving_list_wins() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .and(header("authorization", "Bearer first"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": 1, "text": "old"}]))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .and(header("authorization", "Bearer second"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "text": "new"}])))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_for(&server, Some("first"));
        app.bootstrap(&mut Location::blank()).unwrap();
        app.store().set(TOKEN_KEY, "second").unwrap();
        app.fetch_tasks().unwrap();

        settle(&mut app, 1).await;
        assert_eq!(texts(&app), vec!["new"]);
        settle(&mut app, 1).await;
        assert_eq!(texts(&app), vec!["old"]);
    }
}
