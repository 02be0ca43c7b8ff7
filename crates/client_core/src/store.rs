//! View state: the collection snapshot, request status and form buffers.

use std::collections::BTreeSet;

use shared::domain::{UserDraft, UserId, UserRecord};

use crate::error::ApiFailure;

/// Identifies one request attempt. Tokens only ever increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(pub u64);

/// The single open form. Creating and editing can never both be active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FormState {
    #[default]
    Closed,
    Creating(UserDraft),
    Editing(UserRecord),
}

impl FormState {
    pub fn is_creating(&self) -> bool {
        matches!(self, Self::Creating(_))
    }

    pub fn editing_id(&self) -> Option<&UserId> {
        match self {
            Self::Editing(record) => Some(&record.id),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<String> {
        match self {
            Self::Closed => None,
            Self::Creating(_) => Some("Create New User".to_string()),
            Self::Editing(record) => Some(format!("Edit User: {}", record.username)),
        }
    }

    pub fn fields_mut(&mut self) -> Option<DraftFields<'_>> {
        match self {
            Self::Closed => None,
            Self::Creating(draft) => Some(DraftFields {
                username: &mut draft.username,
                phone: &mut draft.phone,
            }),
            Self::Editing(record) => Some(DraftFields {
                username: &mut record.username,
                phone: &mut record.phone,
            }),
        }
    }
}

/// Mutable field view over whichever form is open.
#[derive(Debug)]
pub struct DraftFields<'a> {
    pub username: &'a mut String,
    pub phone: &'a mut String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationStatus {
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListView {
    LoadingInitial,
    Empty,
    Rows(Vec<UserRecord>),
}

/// Everything a front end needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub heading: String,
    pub list: ListView,
    pub status: OperationStatus,
    pub form: FormState,
    pub form_title: Option<String>,
}

#[derive(Debug, Default)]
pub struct ViewState {
    users: Vec<UserRecord>,
    error: Option<ApiFailure>,
    in_flight: BTreeSet<RequestToken>,
    next_token: u64,
    form: FormState,
}

impl ViewState {
    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn status(&self) -> OperationStatus {
        OperationStatus {
            loading: self.is_loading(),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }

    /// Clears the previous error and marks a new attempt as in flight.
    pub fn begin_attempt(&mut self) -> RequestToken {
        self.next_token += 1;
        let token = RequestToken(self.next_token);
        self.error = None;
        self.in_flight.insert(token);
        token
    }

    /// Ends only `token`'s attempt. A stale attempt finishing late leaves a
    /// newer attempt's loading flag alone.
    pub fn end_attempt(&mut self, token: RequestToken) -> bool {
        self.in_flight.remove(&token)
    }

    pub fn set_error(&mut self, failure: ApiFailure) {
        self.error = Some(failure);
    }

    pub fn replace_snapshot(&mut self, users: Vec<UserRecord>) {
        self.users = users;
    }

    pub fn open_create_form(&mut self) {
        if !self.form.is_creating() {
            self.form = FormState::Creating(UserDraft::default());
        }
    }

    pub fn begin_edit(&mut self, record: UserRecord) {
        self.form = FormState::Editing(record);
    }

    pub fn close_form(&mut self) {
        self.form = FormState::Closed;
    }

    /// Closes the create form after a successful create. A form the user
    /// switched to in the meantime stays open.
    pub fn finish_create(&mut self) {
        if self.form.is_creating() {
            self.form = FormState::Closed;
        }
    }

    pub fn finish_edit(&mut self, id: &UserId) {
        if self.form.editing_id() == Some(id) {
            self.form = FormState::Closed;
        }
    }

    pub fn draft_fields(&mut self) -> Option<DraftFields<'_>> {
        self.form.fields_mut()
    }

    /// Swaps in `form` only while the open form still equals `expected`.
    pub fn replace_form_if(&mut self, expected: &FormState, form: FormState) -> bool {
        if &self.form != expected {
            return false;
        }
        self.form = form;
        true
    }

    pub fn view(&self) -> ViewModel {
        let list = if self.users.is_empty() {
            if self.is_loading() {
                ListView::LoadingInitial
            } else {
                ListView::Empty
            }
        } else {
            ListView::Rows(self.users.clone())
        };

        ViewModel {
            heading: format!("Current Users ({})", self.users.len()),
            list,
            status: self.status(),
            form: self.form.clone(),
            form_title: self.form.title(),
        }
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
