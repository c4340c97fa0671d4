//! Username form: one text field echoed into a greeting.

use crate::{
    error::AppError,
    screen::{escape_html, page},
};
use axum::{
    extract::{Form, Query},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use serde::Deserialize;
use tracing::debug;

pub const EMPTY_USERNAME_PROMPT: &str = "Please enter a username.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsernameForm {
    #[serde(default)]
    pub username: String,
}

impl UsernameForm {
    pub fn greeting(&self) -> String {
        format!("Thank you {}", self.username)
    }

    pub fn validate(&self) -> Result<&str, AppError> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(AppError::Validation(EMPTY_USERNAME_PROMPT.to_string()));
        }
        Ok(username)
    }
}

pub fn render_form(form: &UsernameForm, prompt: Option<&str>) -> String {
    let username = escape_html(&form.username);
    let greeting = escape_html(&form.greeting());
    let prompt = prompt
        .map(|message| format!("        <div class=\"error\">{}</div>\n", escape_html(message)))
        .unwrap_or_default();

    let body = format!(
        r#"        <h1>Username</h1>
{prompt}        <form method="post" action="/username" class="card">
            <input type="text" id="username" name="username" placeholder="Username"
                   value="{username}" autocapitalize="none" autocorrect="off" autofocus>
            <p id="greeting">{greeting}</p>
            <button class="sign-in" type="submit">Submit</button>
        </form>
        <p class="hint"><a href="/">Back to sign-in</a></p>
        <script>
            const input = document.getElementById('username');
            const greeting = document.getElementById('greeting');
            input.addEventListener('input', () => {{
                greeting.textContent = 'Thank you ' + input.value;
            }});
        </script>"#
    );

    page("Username", &body)
}

pub async fn show(Query(form): Query<UsernameForm>) -> impl IntoResponse {
    Html(render_form(&form, None))
}

pub async fn submit(Form(form): Form<UsernameForm>) -> impl IntoResponse {
    match form.validate() {
        Ok(username) => {
            debug!("Username submitted: {}", username);
            (StatusCode::OK, Html(render_form(&form, None)))
        }
        Err(e) => {
            debug!("Rejected username submission: {}", e);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(render_form(&form, Some(&e.to_string()))),
            )
        }
    }
}
