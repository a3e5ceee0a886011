//! Server-rendered HTML for browsers: the create form and the view page.

use axum::extract::{Path, State};
use axum::http::header::CACHE_CONTROL;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use pastebin_lite_common::{iso_millis, PasteView, PASTES_ENDPOINT};
use tracing::instrument;

use crate::error::AppError;
use crate::service;
use crate::state::AppState;
use crate::time::Now;

const STYLE: &str = r"
body { font-family: system-ui, sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; color: #111827; }
textarea, input { width: 100%; box-sizing: border-box; font: inherit; padding: .5rem; }
textarea, pre { font-family: ui-monospace, monospace; }
pre { background: #111827; color: #f3f4f6; padding: 1rem; white-space: pre-wrap; overflow-wrap: anywhere; }
label { display: block; margin-top: 1rem; font-weight: 600; }
button { margin-top: 1rem; padding: .5rem 1.5rem; }
.meta { color: #4b5563; }
";

fn layout(title: &str, body: &str) -> String {
    let title = html_escape::encode_text(title);
    format!(
        r#"<!doctype html>
<html lang="en"><head><meta charset="utf-8"><title>{title} · Pastebin Lite</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<style>{STYLE}</style></head>
<body><header><h1><a href="/">Pastebin Lite</a></h1></header>
<main>{body}</main></body></html>"#
    )
}

pub async fn index() -> Html<String> {
    let body = format!(
        r#"<h2>Create a Paste</h2>
<form id="create">
  <label for="content">Paste content</label>
  <textarea id="content" rows="12" required></textarea>
  <label for="ttl">Time to live (seconds, optional)</label>
  <input id="ttl" type="number" min="1" step="1">
  <label for="max_views">Maximum views (optional)</label>
  <input id="max_views" type="number" min="1" step="1">
  <button type="submit">Create Paste</button>
</form>
<p id="result" class="meta"></p>
<script>
document.getElementById("create").addEventListener("submit", async (event) => {{
  event.preventDefault();
  const result = document.getElementById("result");
  const body = {{ content: document.getElementById("content").value }};
  const ttl = document.getElementById("ttl").value;
  const maxViews = document.getElementById("max_views").value;
  if (ttl) body.ttl_seconds = Number(ttl);
  if (maxViews) body.max_views = Number(maxViews);
  const res = await fetch("{PASTES_ENDPOINT}", {{
    method: "POST",
    headers: {{ "Content-Type": "application/json" }},
    body: JSON.stringify(body),
  }});
  const data = await res.json();
  result.textContent = "";
  if (!res.ok) {{
    result.textContent = data.error || "Failed to create paste";
    return;
  }}
  const link = document.createElement("a");
  link.href = data.url;
  link.textContent = data.url;
  result.append("Paste created: ", link);
  event.target.reset();
}});
</script>"#
    );
    Html(layout("Create a Paste", &body))
}

/// Browser view of a paste. Counts a view exactly like the JSON endpoint.
#[instrument(skip(state))]
pub async fn view(State(state): State<AppState>, Path(id): Path<String>, now: Now) -> Response {
    match service::consume_paste(state.store.as_ref(), &id, now.0).await {
        Ok(paste) => (
            [(CACHE_CONTROL, "no-store")],
            Html(layout("Shared Paste", &render_paste(&paste))),
        )
            .into_response(),
        Err(AppError::NotFound) => not_found().into_response(),
        Err(e) => {
            e.report();
            (
                e.status(),
                Html(layout(
                    "Error",
                    "<h2>Something went wrong</h2><p>Please try again later.</p>",
                )),
            )
                .into_response()
        }
    }
}

fn render_paste(paste: &PasteView) -> String {
    let content = html_escape::encode_text(&paste.content);
    let mut meta = Vec::new();

    if let Some(remaining) = paste.remaining_views {
        let plural = if remaining == 1 { "" } else { "s" };
        meta.push(format!("{remaining} view{plural} remaining"));
    }

    if let Some(expires_at) = &paste.expires_at {
        let iso = iso_millis::format(expires_at);
        meta.push(format!(
            r#"Expires: <time datetime="{iso}">{}</time>"#,
            expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    let meta = if meta.is_empty() {
        String::new()
    } else {
        format!(r#"<p class="meta">{}</p>"#, meta.join(" · "))
    };

    format!("<h2>Shared Paste</h2><pre>{content}</pre>{meta}")
}

fn not_found() -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        Html(layout(
            "Paste Not Found",
            r#"<h2>404 · Paste Not Found</h2>
<p>This paste doesn't exist, has expired, or has reached its maximum view limit.</p>
<p><a href="/">Create New Paste</a></p>"#,
        )),
    )
}
