use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use async_trait::async_trait;
use shared::{
    domain::{UserDraft, UserId, UserRecord},
    protocol::UserPayload,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub mod config;
pub mod error;
pub mod polling;
pub mod store;
pub mod transport;

pub use config::{load_settings, Settings};
pub use error::ApiFailure;
pub use polling::PollHandle;
pub use store::{
    DraftFields, FormState, ListView, OperationStatus, RequestToken, ViewModel, ViewState,
};
pub use transport::{classify_response, ApiRequest, ApiResult, HttpTransport, Transport};

/// How a user intent ended. Failures are also left in the view state for
/// the error banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed(ApiFailure),
    /// Not carried out: the user declined, or there was no open form.
    Declined,
    /// The directory was torn down before the result could be applied.
    Disposed,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEvent {
    SnapshotReplaced { count: usize },
    StatusChanged(OperationStatus),
    FormChanged(FormState),
}

#[async_trait]
pub trait DeleteConfirmation: Send + Sync {
    async fn confirm_delete(&self, id: &UserId) -> bool;
}

pub struct AlwaysConfirm;

#[async_trait]
impl DeleteConfirmation for AlwaysConfirm {
    async fn confirm_delete(&self, _id: &UserId) -> bool {
        true
    }
}

pub struct NeverConfirm;

#[async_trait]
impl DeleteConfirmation for NeverConfirm {
    async fn confirm_delete(&self, _id: &UserId) -> bool {
        false
    }
}

/// Keeps the local user list in sync with `<base>/api/users` and runs
/// create/edit/delete intents against it.
pub struct UserDirectory {
    settings: Settings,
    transport: Arc<dyn Transport>,
    confirmation: Arc<dyn DeleteConfirmation>,
    state: Mutex<ViewState>,
    disposed: AtomicBool,
    poller: Mutex<Option<PollHandle>>,
    events: broadcast::Sender<DirectoryEvent>,
}

/// Ends one attempt on every exit path, including a dropped future.
struct AttemptGuard<'a> {
    directory: &'a UserDirectory,
    token: RequestToken,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        let token = self.token;
        if let Some(status) = self.directory.with_state(|state| {
            state.end_attempt(token);
            state.status()
        }) {
            self.directory
                .publish(DirectoryEvent::StatusChanged(status));
        }
    }
}

impl UserDirectory {
    pub fn new(
        settings: Settings,
        confirmation: Arc<dyn DeleteConfirmation>,
    ) -> anyhow::Result<Arc<Self>> {
        let transport = HttpTransport::new(&settings)?;
        Ok(Self::new_with_dependencies(
            settings,
            Arc::new(transport),
            confirmation,
        ))
    }

    pub fn new_with_dependencies(
        settings: Settings,
        transport: Arc<dyn Transport>,
        confirmation: Arc<dyn DeleteConfirmation>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            settings,
            transport,
            confirmation,
            state: Mutex::new(ViewState::default()),
            disposed: AtomicBool::new(false),
            poller: Mutex::new(None),
            events,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DirectoryEvent> {
        self.events.subscribe()
    }

    pub fn view(&self) -> ViewModel {
        self.lock_state().view()
    }

    pub fn snapshot(&self) -> Vec<UserRecord> {
        self.lock_state().users().to_vec()
    }

    pub fn status(&self) -> OperationStatus {
        self.lock_state().status()
    }

    pub fn form(&self) -> FormState {
        self.lock_state().form().clone()
    }

    /// Finds the snapshot row whose id displays exactly as `typed`.
    pub fn find_user(&self, typed: &str) -> Option<UserRecord> {
        self.lock_state()
            .users()
            .iter()
            .find(|user| user.id.matches_text(typed))
            .cloned()
    }

    /// Maps a hand-typed id onto the server's own id. Text with no match in
    /// the snapshot is passed through unchanged.
    pub fn resolve_id(&self, typed: &str) -> UserId {
        self.find_user(typed)
            .map(|user| user.id)
            .unwrap_or_else(|| UserId::Text(typed.to_string()))
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `f` unless the directory has been disposed. The disposed flag
    /// is read under the state lock, so no write lands after `dispose()`
    /// returns.
    fn with_state<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> Option<R> {
        let mut state = self.lock_state();
        if self.is_disposed() {
            return None;
        }
        Some(f(&mut *state))
    }

    fn publish(&self, event: DirectoryEvent) {
        let _ = self.events.send(event);
    }

    fn publish_form(&self) {
        let form = self.form();
        self.publish(DirectoryEvent::FormChanged(form));
    }

    /// Records a failure that never reached the network.
    fn reject(&self, failure: ApiFailure) -> Outcome {
        warn!(error = %failure, "users request rejected");
        match self.with_state(|state| {
            state.set_error(failure.clone());
            state.status()
        }) {
            Some(status) => {
                self.publish(DirectoryEvent::StatusChanged(status));
                Outcome::Failed(failure)
            }
            None => Outcome::Disposed,
        }
    }

    /// Runs one request with the shared status bookkeeping: clear error and
    /// mark loading before, record any failure after, always end the attempt.
    /// `None` means the directory was disposed.
    async fn api_call(&self, request: ApiRequest) -> Option<ApiResult> {
        let (token, status) = self.with_state(|state| {
            let token = state.begin_attempt();
            (token, state.status())
        })?;
        self.publish(DirectoryEvent::StatusChanged(status));
        let _attempt = AttemptGuard {
            directory: self,
            token,
        };

        let method = request.method.clone();
        let result = self.transport.send(request).await;
        if self.is_disposed() {
            debug!(%method, "users response arrived after dispose; dropping it");
            return None;
        }

        if let Err(failure) = &result {
            warn!(%method, error = %failure, "users request failed");
            self.with_state(|state| state.set_error(failure.clone()))?;
        }
        Some(result)
    }

    /// Fetches the whole collection and replaces the snapshot with it. This is
    /// the only path that writes the snapshot; polling and every successful
    /// mutation go through here.
    pub async fn refresh(&self) -> Outcome {
        let request = ApiRequest::get(self.settings.users_endpoint());
        let payload = match self.api_call(request).await {
            None => return Outcome::Disposed,
            Some(Err(failure)) => return Outcome::Failed(failure),
            Some(Ok(None)) => {
                debug!("users refresh returned no content; keeping snapshot");
                return Outcome::Completed;
            }
            Some(Ok(Some(payload))) => payload,
        };

        let users = match serde_json::from_value::<Vec<UserRecord>>(payload) {
            Ok(users) => users,
            Err(err) => {
                return self.reject(ApiFailure::UnexpectedPayload(format!(
                    "expected a list of users: {err}"
                )))
            }
        };

        let count = users.len();
        if self
            .with_state(|state| state.replace_snapshot(users))
            .is_none()
        {
            return Outcome::Disposed;
        }
        debug!(count, "users snapshot replaced");
        self.publish(DirectoryEvent::SnapshotReplaced { count });
        Outcome::Completed
    }

    /// Refresh after a mutation. The mutation already succeeded, so a failed
    /// refresh only shows up in the error banner.
    async fn refresh_after_mutation(&self) -> Outcome {
        match self.refresh().await {
            Outcome::Disposed => Outcome::Disposed,
            _ => Outcome::Completed,
        }
    }

    pub async fn create(&self, draft: UserDraft) -> Outcome {
        if let Err(err) = draft.validate() {
            return self.reject(err.into());
        }
        let request =
            match ApiRequest::post_json(self.settings.users_endpoint(), &UserPayload::from(&draft))
            {
                Ok(request) => request,
                Err(failure) => return self.reject(failure),
            };

        match self.api_call(request).await {
            None => Outcome::Disposed,
            Some(Err(failure)) => Outcome::Failed(failure),
            Some(Ok(_)) => {
                if self.with_state(ViewState::finish_create).is_none() {
                    return Outcome::Disposed;
                }
                info!(username = %draft.username, "user created");
                self.publish_form();
                self.refresh_after_mutation().await
            }
        }
    }

    /// Replaces every field of `record` on the server. Only username and
    /// phone travel in the body; the id addresses the resource.
    pub async fn update(&self, record: UserRecord) -> Outcome {
        if let Err(err) = record.fields().validate() {
            return self.reject(err.into());
        }
        let request = match ApiRequest::put_json(
            self.settings.user_endpoint(&record.id),
            &UserPayload::from(&record),
        ) {
            Ok(request) => request,
            Err(failure) => return self.reject(failure),
        };

        match self.api_call(request).await {
            None => Outcome::Disposed,
            Some(Err(failure)) => Outcome::Failed(failure),
            Some(Ok(_)) => {
                if self
                    .with_state(|state| state.finish_edit(&record.id))
                    .is_none()
                {
                    return Outcome::Disposed;
                }
                info!(id = %record.id, "user updated");
                self.publish_form();
                self.refresh_after_mutation().await
            }
        }
    }

    /// Deletes after confirmation. Any successful result counts; the
    /// payload, normally absent, is not inspected.
    pub async fn delete(&self, id: UserId) -> Outcome {
        if self.is_disposed() {
            return Outcome::Disposed;
        }
        if !self.confirmation.confirm_delete(&id).await {
            debug!(%id, "user delete declined");
            return Outcome::Declined;
        }

        match self.api_call(ApiRequest::delete(self.settings.user_endpoint(&id))).await {
            None => Outcome::Disposed,
            Some(Err(failure)) => Outcome::Failed(failure),
            Some(Ok(_)) => {
                info!(%id, "user deleted");
                self.refresh_after_mutation().await
            }
        }
    }

    pub fn open_create_form(&self) {
        if self.with_state(ViewState::open_create_form).is_some() {
            self.publish_form();
        }
    }

    pub fn begin_edit(&self, record: UserRecord) {
        if self.with_state(|state| state.begin_edit(record)).is_some() {
            self.publish_form();
        }
    }

    /// Closes whichever form is open, discarding its draft.
    pub fn cancel_form(&self) {
        if self.with_state(ViewState::close_form).is_some() {
            self.publish_form();
        }
    }

    /// Edits the open form's fields. Returns false when no form is open.
    ///
    /// `edit` works on a copy taken outside the state lock, so it may read
    /// the directory. The copy is written back only if the form did not
    /// change while `edit` ran.
    pub fn edit_draft(&self, edit: impl FnOnce(DraftFields<'_>)) -> bool {
        let original = self.form();
        let mut edited = original.clone();
        let Some(fields) = edited.fields_mut() else {
            return false;
        };
        edit(fields);

        let applied = self
            .with_state(|state| state.replace_form_if(&original, edited))
            .unwrap_or(false);
        if applied {
            self.publish_form();
        } else {
            debug!("form changed during edit; dropping draft edits");
        }
        applied
    }

    /// Submits whichever form is open.
    pub async fn submit_form(&self) -> Outcome {
        match self.form() {
            FormState::Closed => Outcome::Declined,
            FormState::Creating(draft) => self.create(draft).await,
            FormState::Editing(record) => self.update(record).await,
        }
    }

    /// Starts the refresh poller, replacing any poller already running.
    pub fn start_polling(self: &Arc<Self>) {
        if self.is_disposed() {
            return;
        }
        let directory = Arc::downgrade(self);
        let handle = polling::start(
            move || {
                let directory = directory.clone();
                async move {
                    if let Some(directory) = directory.upgrade() {
                        directory.refresh().await;
                    }
                }
            },
            self.settings.poll_interval(),
        );

        let previous = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.stop();
        }
    }

    pub fn stop_polling(&self) {
        let handle = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.stop();
        }
    }

    /// Tears the directory down: stops polling, and every response still in
    /// flight is discarded instead of applied.
    pub fn dispose(&self) {
        {
            let _state = self.lock_state();
            if self.disposed.swap(true, Ordering::SeqCst) {
                return;
            }
        }
        self.stop_polling();
        info!("user directory disposed");
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
