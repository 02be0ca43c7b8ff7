use super::*;
use shared::error::DraftError;

fn jane() -> UserRecord {
    UserRecord {
        id: UserId::from(1),
        username: "Jane".into(),
        phone: "555-0001".into(),
    }
}

#[test]
fn empty_snapshot_without_load_is_empty_state() {
    let state = ViewState::default();
    let view = state.view();
    assert_eq!(view.list, ListView::Empty);
    assert_eq!(view.heading, "Current Users (0)");
    assert_eq!(view.status, OperationStatus::default());
}

#[test]
fn empty_snapshot_while_loading_is_initial_load() {
    let mut state = ViewState::default();
    state.begin_attempt();
    assert_eq!(state.view().list, ListView::LoadingInitial);
}

#[test]
fn populated_snapshot_renders_rows_even_while_loading() {
    let mut state = ViewState::default();
    state.replace_snapshot(vec![jane()]);
    state.begin_attempt();
    let view = state.view();
    assert_eq!(view.list, ListView::Rows(vec![jane()]));
    assert!(view.status.loading);
    assert_eq!(view.heading, "Current Users (1)");
}

#[test]
fn begin_attempt_clears_previous_error() {
    let mut state = ViewState::default();
    state.set_error(ApiFailure::from(DraftError::MissingRequiredFields));
    assert!(state.status().error.is_some());
    let token = state.begin_attempt();
    assert_eq!(state.status().error, None);
    assert!(state.end_attempt(token));
}

#[test]
fn stale_attempt_does_not_clear_newer_loading_flag() {
    let mut state = ViewState::default();
    let first = state.begin_attempt();
    let second = state.begin_attempt();
    assert!(second > first);

    state.end_attempt(first);
    assert!(state.is_loading(), "newer attempt still in flight");

    state.end_attempt(second);
    assert!(!state.is_loading());
    assert!(!state.end_attempt(second), "ending twice is a no-op");
}

#[test]
fn opening_one_form_closes_the_other() {
    let mut state = ViewState::default();
    state.open_create_form();
    assert!(state.form().is_creating());

    state.begin_edit(jane());
    assert_eq!(state.form().editing_id(), Some(&UserId::from(1)));
    assert!(!state.form().is_creating());

    state.open_create_form();
    assert_eq!(state.form(), &FormState::Creating(UserDraft::default()));
    assert_eq!(state.form().editing_id(), None);
}

#[test]
fn reopening_create_form_keeps_draft() {
    let mut state = ViewState::default();
    state.open_create_form();
    if let Some(fields) = state.draft_fields() {
        fields.username.push_str("Bob");
    }
    state.open_create_form();
    assert_eq!(
        state.form(),
        &FormState::Creating(UserDraft::new("Bob", ""))
    );
}

#[test]
fn draft_fields_edit_the_open_form() {
    let mut state = ViewState::default();
    assert!(state.draft_fields().is_none());

    state.begin_edit(jane());
    if let Some(fields) = state.draft_fields() {
        *fields.username = "Jane2".into();
    }
    assert_eq!(state.view().form_title.as_deref(), Some("Edit User: Jane2"));
    // The snapshot is untouched until a refresh replaces it.
    assert!(state.users().is_empty());
}

#[test]
fn form_replacement_requires_unchanged_form() {
    let mut state = ViewState::default();
    state.begin_edit(jane());
    let original = state.form().clone();
    let mut edited = original.clone();
    if let Some(fields) = edited.fields_mut() {
        *fields.phone = "555-0100".into();
    }

    state.open_create_form();
    assert!(!state.replace_form_if(&original, edited.clone()));
    assert!(state.form().is_creating());

    state.begin_edit(jane());
    assert!(state.replace_form_if(&original, edited.clone()));
    assert_eq!(state.form(), &edited);
}

#[test]
fn finish_edit_only_closes_matching_form() {
    let mut state = ViewState::default();
    state.begin_edit(jane());
    state.finish_edit(&UserId::from(2));
    assert!(state.form().editing_id().is_some());
    state.finish_edit(&UserId::from(1));
    assert_eq!(state.form(), &FormState::Closed);

    state.begin_edit(jane());
    state.finish_create();
    assert!(state.form().editing_id().is_some());
}
