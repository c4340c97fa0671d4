use crate::{
    auth::{NOTICE_COOKIE_NAME, SIGNED_OUT_NOTICE},
    state::{AuthPhase, SessionState},
    AppState,
};
use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

const STYLE: &str = r#"
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            min-height: 100vh;
            margin: 0;
            background-color: #f0f4f8;
        }
        .container {
            text-align: center;
            padding: 2rem;
            max-width: 420px;
        }
        h1 {
            color: #2c3e50;
            margin-bottom: 2rem;
        }
        .card {
            background: white;
            padding: 1.5rem;
            border-radius: 10px;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1);
        }
        .avatar {
            width: 100px;
            height: 100px;
            border-radius: 50%;
            margin-bottom: 1rem;
        }
        .name {
            font-size: 1.25rem;
            font-weight: bold;
            color: #333;
        }
        .email {
            color: #777;
            margin-bottom: 1.25rem;
        }
        button {
            color: white;
            border: none;
            padding: 0.75rem 1.5rem;
            border-radius: 8px;
            font-size: 1.1rem;
            cursor: pointer;
        }
        button:disabled {
            opacity: 0.5;
            cursor: not-allowed;
        }
        .sign-in { background: #4285F4; }
        .sign-out { background: #dc3545; }
        .link { background: none; color: #4a5568; font-size: 0.9rem; padding: 0.25rem; }
        .error { color: red; margin: 1rem 0; }
        .notice {
            background: #c6f6d5;
            padding: 0.75rem;
            border-radius: 4px;
            margin-bottom: 1rem;
        }
        .loading { color: #0000ff; margin: 1rem 0; }
        .hint { color: #718096; font-size: 0.9rem; }
        input[type="text"] {
            width: 90%;
            padding: 0.75rem;
            border: 1px solid #b0c4de;
            border-radius: 10px;
            font-size: 1rem;
        }
    </style>"#;

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Wraps a screen body in the shared page shell.
pub fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>{STYLE}
</head>
<body>
    <div class="container">
{body}
    </div>
</body>
</html>
"#,
        title = escape_html(title),
    )
}

pub fn render_sign_in_screen(
    state: &SessionState,
    request_ready: bool,
    notice: Option<&str>,
) -> String {
    let mut body = String::from("        <h1>Google Sign-In</h1>\n");

    if notice == Some(SIGNED_OUT_NOTICE) {
        body.push_str(
            r#"        <div class="notice">
            <strong>Signed Out</strong> You have been successfully signed out.
            <a href="/">Dismiss</a>
        </div>
"#,
        );
    }

    if state.is_busy() {
        body.push_str(
            "        <p class=\"loading\">Waiting for Google to finish sign-in...</p>\n",
        );
    }

    if let Some(error) = &state.error {
        body.push_str(&format!(
            r#"        <div class="error">{}
            <form method="post" action="/auth/error/dismiss"><button class="link" type="submit">Dismiss</button></form>
        </div>
"#,
            escape_html(error)
        ));
    }

    match &state.phase {
        AuthPhase::Authenticated(profile) => {
            body.push_str("        <div class=\"card\">\n");
            body.push_str("            <p>You are signed in as:</p>\n");
            if let Some(picture) = &profile.picture {
                body.push_str(&format!(
                    "            <img class=\"avatar\" src=\"{}\" alt=\"Profile picture\">\n",
                    escape_html(picture)
                ));
            }
            body.push_str(&format!(
                "            <div class=\"name\">{}</div>\n            <div class=\"email\">{}</div>\n",
                escape_html(&profile.name),
                escape_html(&profile.email)
            ));
            body.push_str(
                r#"            <form method="post" action="/auth/signout">
                <button class="sign-out" type="submit">Sign Out</button>
            </form>
        </div>
"#,
            );
        }
        AuthPhase::SignedOut | AuthPhase::Authenticating => {
            let disabled = if !request_ready || state.is_busy() {
                " disabled"
            } else {
                ""
            };
            body.push_str(&format!(
                r#"        <form method="post" action="/auth/signin">
            <button class="sign-in" type="submit"{}>Sign In with Google</button>
        </form>
"#,
                disabled
            ));
            if !request_ready {
                body.push_str(
                    "        <p class=\"hint\">Set GOOGLE_CLIENT_ID to enable sign-in.</p>\n",
                );
            }
        }
    }

    body.push_str("        <p class=\"hint\"><a href=\"/username\">Username form</a></p>");

    page("Google Sign-In", &body)
}

// Sign-in screen; consumes the one-shot notice cookie
pub async fn index(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let notice = jar
        .get(NOTICE_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string());
    let jar = if notice.is_some() {
        jar.remove(Cookie::build(NOTICE_COOKIE_NAME).path("/"))
    } else {
        jar
    };

    let snapshot = state.session.snapshot().await;
    let html = render_sign_in_screen(
        &snapshot,
        state.config.is_request_ready(),
        notice.as_deref(),
    );

    (jar, Html(html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Profile;
    use std::collections::HashMap;

    fn signed_in(picture: Option<&str>) -> SessionState {
        SessionState {
            phase: AuthPhase::Authenticated(Profile {
                name: "Ada <Lovelace>".into(),
                email: "ada@example.com".into(),
                picture: picture.map(str::to_string),
                extra: HashMap::new(),
            }),
            error: None,
        }
    }

    #[test]
    fn signed_out_shows_sign_in_button() {
        let html = render_sign_in_screen(&SessionState::default(), true, None);
        assert!(html.contains("Sign In with Google"));
        assert!(!html.contains("Sign Out"));
        assert!(!html.contains("disabled>"));
    }

    #[test]
    fn button_is_disabled_without_request_or_while_busy() {
        let html = render_sign_in_screen(&SessionState::default(), false, None);
        assert!(html.contains("type=\"submit\" disabled>Sign In with Google"));
        assert!(html.contains("GOOGLE_CLIENT_ID"));

        let busy = SessionState {
            phase: AuthPhase::Authenticating,
            error: None,
        };
        let html = render_sign_in_screen(&busy, true, None);
        assert!(html.contains("type=\"submit\" disabled>Sign In with Google"));
        assert!(html.contains("Waiting for Google to finish sign-in..."));
    }

    #[test]
    fn signed_in_shows_escaped_profile() {
        let html = render_sign_in_screen(&signed_in(Some("https://example.com/a.png")), true, None);
        assert!(html.contains("You are signed in as:"));
        assert!(html.contains("Ada &lt;Lovelace&gt;"));
        assert!(html.contains("ada@example.com"));
        assert!(html.contains("src=\"https://example.com/a.png\""));
        assert!(html.contains("Sign Out"));
        assert!(!html.contains("Sign In with Google"));
    }

    #[test]
    fn picture_is_optional() {
        let html = render_sign_in_screen(&signed_in(None), true, None);
        assert!(!html.contains("<img"));
    }

    #[test]
    fn error_slot_and_notice_are_rendered() {
        let state = SessionState {
            phase: AuthPhase::SignedOut,
            error: Some("Sign-in error: \"denied\"".into()),
        };
        let html = render_sign_in_screen(&state, true, Some(SIGNED_OUT_NOTICE));
        assert!(html.contains("Sign-in error: &quot;denied&quot;"));
        assert!(html.contains("/auth/error/dismiss"));
        assert!(html.contains("You have been successfully signed out."));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }
}
