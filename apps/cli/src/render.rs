//! Plain-text rendering of the directory view model.

use client_core::{ListView, ViewModel};

pub fn render(view: &ViewModel) -> String {
    let mut out = String::new();

    if let Some(error) = &view.status.error {
        out.push_str("API Connection Error:\n  ");
        out.push_str(error);
        out.push_str("\n\n");
    }

    out.push_str(&view.heading);
    out.push('\n');

    match &view.list {
        ListView::LoadingInitial => out.push_str("Loading users...\n"),
        ListView::Empty => {
            out.push_str("No users found. Run `users create` to get started.\n")
        }
        ListView::Rows(users) => {
            let id_width = users
                .iter()
                .map(|user| user.id.to_string().len())
                .max()
                .unwrap_or(0)
                .max(2);
            let name_width = users
                .iter()
                .map(|user| user.username.chars().count())
                .max()
                .unwrap_or(0)
                .max("Username".len());
            out.push_str(&format!(
                "{:<id_width$}  {:<name_width$}  Phone Number\n",
                "ID", "Username"
            ));
            for user in users {
                out.push_str(&format!(
                    "{:<id_width$}  {:<name_width$}  {}\n",
                    user.id.to_string(),
                    user.username,
                    user.phone
                ));
            }
        }
    }

    if let Some(title) = &view.form_title {
        out.push_str(&format!("\n[{title}]\n"));
    }

    out
}
