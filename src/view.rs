//! Headless text rendering of the profile page.

use crate::controller::ProfileForm;
use crate::session::PageState;

pub const LOADING_TEXT: &str = "Loading...";
pub const LOGIN_PROMPT_TEXT: &str = "Please log in to view your profile.";

/// Render the page for `state`. The form is only shown when authenticated.
#[must_use]
pub fn render(state: &PageState, form: &ProfileForm) -> String {
    match state {
        PageState::Loading => LOADING_TEXT.to_string(),
        PageState::Unauthenticated => LOGIN_PROMPT_TEXT.to_string(),
        PageState::Authenticated(_) => render_form(form),
    }
}

fn render_form(form: &ProfileForm) -> String {
    [
        "User Profile".to_string(),
        "Edit Profile: update your personal information and LabNose device settings.".to_string(),
        format!("  Name:              {}", placeholder(&form.name, "Your name")),
        format!("  Email (read-only): {}", placeholder(&form.email, "Your email")),
        format!("  LabNose Device ID: {}", placeholder(&form.device_id, "Enter your LabNose device ID")),
        "[Save Changes]".to_string(),
    ]
    .join("\n")
}

fn placeholder<'a>(value: &'a str, hint: &'a str) -> std::borrow::Cow<'a, str> {
    if value.is_empty() { format!("<{hint}>").into() } else { value.into() }
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
