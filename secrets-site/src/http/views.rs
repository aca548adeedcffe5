//! Server-rendered HTML pages.
//!
//! Every value that came from a user (names, flash text, the `next` path) is
//! escaped with `html_escape` before it is interpolated.

use axum::http::{StatusCode, Uri};
use html_escape::{encode_double_quoted_attribute, encode_text};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

pub const GATED_PATH: &str = "/secrets";
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to access this page.";

fn base_style() -> &'static str {
    r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        background: #f5f5f5; color: #333; min-height: 100vh;
    }
    nav { background: #1a1a2e; padding: 14px 24px; display: flex; gap: 18px; }
    nav a { color: #fff; text-decoration: none; font-size: 15px; }
    nav a:hover { text-decoration: underline; }
    main { display: flex; justify-content: center; padding: 48px 20px; }
    .card {
        background: #fff; border-radius: 16px; padding: 32px;
        max-width: 440px; width: 100%; box-shadow: 0 4px 24px rgba(0,0,0,0.08);
    }
    h1 { font-size: 26px; color: #1a1a2e; margin-bottom: 16px; }
    p { font-size: 15px; line-height: 1.5; margin-bottom: 12px; }
    .form-group { margin-bottom: 16px; }
    .form-group label { display: block; font-size: 14px; font-weight: 500; margin-bottom: 6px; }
    .form-group input {
        width: 100%; padding: 12px 14px; border: 1.5px solid #ddd;
        border-radius: 10px; font-size: 16px;
    }
    .btn {
        display: inline-block; padding: 12px 20px; border: none; border-radius: 10px;
        font-size: 16px; font-weight: 600; cursor: pointer;
        background: #4a6cf7; color: #fff; text-decoration: none;
    }
    .flash {
        background: #fff0f0; color: #d32f2f; padding: 10px 14px;
        border-radius: 8px; font-size: 14px; margin-bottom: 16px;
    }
    "#
}

/// `/login`, optionally carrying the page to return to after signing in.
pub fn login_url(next: Option<&str>) -> String {
    match next {
        Some(next) => format!(
            "/login?next={}",
            utf8_percent_encode(next, NON_ALPHANUMERIC)
        ),
        None => String::from("/login"),
    }
}

/// Only same-site absolute paths are followed after login. Browsers drop tabs
/// and newlines from `Location`, so any control character or whitespace
/// disqualifies the path.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if is_local_path(path) => path,
        _ => GATED_PATH,
    }
}

fn is_local_path(path: &str) -> bool {
    if !path.starts_with('/') || path.starts_with("//") || path.contains('\\') {
        return false;
    }
    if path.chars().any(|ch| ch.is_control() || ch.is_whitespace()) {
        return false;
    }
    match path.parse::<Uri>() {
        Ok(uri) => uri.scheme().is_none() && uri.authority().is_none(),
        Err(_) => false,
    }
}

fn layout(title: &str, signed_in: bool, flash: Option<&str>, body: &str) -> String {
    let nav_links = if signed_in {
        r#"<a href="/">Home</a><a href="/secrets">Secrets</a><a href="/logout">Log Out</a>"#
    } else {
        r#"<a href="/">Home</a><a href="/login">Login</a><a href="/register">Register</a>"#
    };
    let flash_html = flash
        .map(|message| format!(r#"<div class="flash">{}</div>"#, encode_text(message)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title}</title>
<style>{style}</style>
</head><body>
<nav>{nav_links}</nav>
<main><div class="card">
{flash_html}
{body}
</div></main>
</body></html>"#,
        title = encode_text(title),
        style = base_style(),
    )
}

pub fn render_home(signed_in: bool, flash: Option<&str>) -> String {
    let actions = if signed_in {
        r#"<p><a class="btn" href="/secrets">Go to the secrets</a></p>"#
    } else {
        r#"<p><a class="btn" href="/register">Register</a> <a class="btn" href="/login">Login</a></p>"#
    };
    let body = format!(
        r#"<h1>Welcome to the secret club</h1>
<p>Members get to see the secret page and download the cheat sheet.</p>
{actions}"#
    );
    layout("Secrets", signed_in, flash, &body)
}

pub fn render_register(flash: Option<&str>) -> String {
    layout(
        "Register",
        false,
        flash,
        r#"<h1>Register</h1>
<form method="POST" action="/register">
  <div class="form-group">
    <label for="name">Name</label>
    <input type="text" id="name" name="name" required autocomplete="name">
  </div>
  <div class="form-group">
    <label for="email">Email</label>
    <input type="email" id="email" name="email" required autocomplete="email">
  </div>
  <div class="form-group">
    <label for="password">Password</label>
    <input type="password" id="password" name="password" required autocomplete="new-password">
  </div>
  <button type="submit" class="btn">Sign me up</button>
</form>"#,
    )
}

pub fn render_login(flash: Option<&str>, next: Option<&str>) -> String {
    let flash = flash.or(next.map(|_| LOGIN_REQUIRED_MESSAGE));
    let action = encode_double_quoted_attribute(&login_url(next)).into_owned();
    let body = format!(
        r#"<h1>Login</h1>
<form method="POST" action="{action}">
  <div class="form-group">
    <label for="email">Email</label>
    <input type="email" id="email" name="email" required autocomplete="email">
  </div>
  <div class="form-group">
    <label for="password">Password</label>
    <input type="password" id="password" name="password" required autocomplete="current-password">
  </div>
  <button type="submit" class="btn">Let me in</button>
</form>"#
    );
    layout("Login", false, flash, &body)
}

/// The gated page. Also used as the registration confirmation, in which case
/// the visitor is not signed in yet.
pub fn render_secrets(name: &str, signed_in: bool) -> String {
    let download = if signed_in {
        r#"<p><a class="btn" href="/download">Download Your File</a></p>"#
    } else {
        r#"<p><a class="btn" href="/login">Log in to download your file</a></p>"#
    };
    let body = format!(
        r#"<h1>Welcome, {name}</h1>
<p>Here is the secret you have been waiting for.</p>
{download}"#,
        name = encode_text(name),
    );
    layout("Secrets", signed_in, None, &body)
}

pub fn render_error(status: StatusCode, message: &str) -> String {
    let body = format!(
        r#"<h1>{code}</h1>
<p>{message}</p>
<p><a href="/">Back to the home page</a></p>"#,
        code = status.as_u16(),
        message = encode_text(message),
    );
    layout(status.canonical_reason().unwrap_or("Error"), false, None, &body)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::{login_url, render_error, render_login, render_secrets, safe_next};

    #[test]
    fn error_page_escapes_message() {
        let page = render_error(StatusCode::BAD_REQUEST, "<script>alert(1)</script> & co");
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; co"));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn login_url_encodes_next() {
        assert_eq!(login_url(None), "/login");
        assert_eq!(login_url(Some("/secrets")), "/login?next=%2Fsecrets");
    }

    #[test]
    fn safe_next_only_follows_local_paths() {
        assert_eq!(safe_next(Some("/download")), "/download");
        assert_eq!(safe_next(None), "/secrets");
        assert_eq!(safe_next(Some("https://evil.example")), "/secrets");
        assert_eq!(safe_next(Some("//evil.example")), "/secrets");
        assert_eq!(safe_next(Some("/\\evil.example")), "/secrets");
        assert_eq!(safe_next(Some("/\t/evil.example")), "/secrets");
        assert_eq!(safe_next(Some("/\n")), "/secrets");
        assert_eq!(safe_next(Some("/\r\nSet-Cookie: x=1")), "/secrets");
        assert_eq!(safe_next(Some("/secrets page")), "/secrets");
        assert_eq!(safe_next(Some("")), "/secrets");
    }

    #[test]
    fn login_page_prompts_when_redirected_from_gate() {
        let page = render_login(None, Some("/secrets"));
        assert!(page.contains("Please log in to access this page."));
        assert!(page.contains(r#"action="/login?next=%2Fsecrets""#));
    }

    #[test]
    fn secrets_page_escapes_name() {
        let page = render_secrets("<b>Mallory</b>", true);
        assert!(page.contains("Welcome, &lt;b&gt;Mallory&lt;/b&gt;"));
        assert!(page.contains(r#"href="/download""#));
    }
}
