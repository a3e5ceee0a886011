#![warn(clippy::nursery, clippy::pedantic)]
#![deny(unsafe_code)]

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use atty::Stream;
use clap::{Parser, Subcommand};
use pastebin_lite_common::{
    CreatePaste, CreatedPaste, Deleted, ErrorBody, PasteView, Url, PASTES_ENDPOINT,
};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;

#[derive(Parser)]
#[command(version, about = "Share short-lived pastes")]
struct Opts {
    /// The Pastebin Lite instance to talk to.
    #[arg(long, env = "PASTEBIN_URL", default_value = "http://localhost:8080")]
    server: Url,
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Upload a paste and print its share link.
    Create {
        /// Seconds until the paste expires.
        #[arg(long)]
        ttl: Option<u64>,
        /// Number of times the paste may be viewed.
        #[arg(long)]
        max_views: Option<u64>,
        /// File to upload; reads stdin when absent or `-`.
        path: Option<PathBuf>,
    },
    /// Print a paste. This counts as a view.
    View {
        /// A paste id or share link.
        paste: String,
    },
    /// Remove a paste.
    Delete {
        /// A paste id or share link.
        paste: String,
    },
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let client = Client::new();

    match opts.action {
        Action::Create {
            ttl,
            max_views,
            path,
        } => handle_create(&client, &opts.server, ttl, max_views, path),
        Action::View { paste } => handle_view(&client, &opts.server, &paste),
        Action::Delete { paste } => handle_delete(&client, &opts.server, &paste),
    }
}

fn handle_create(
    client: &Client,
    server: &Url,
    ttl: Option<u64>,
    max_views: Option<u64>,
    path: Option<PathBuf>,
) -> Result<()> {
    let content = match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let request = CreatePaste {
        content,
        ttl_seconds: ttl,
        max_views,
    };
    request.validate()?;

    let res = client
        .post(endpoint(server, None)?)
        .json(&request)
        .send()
        .context("Request to server failed")?;
    let created: CreatedPaste = check(res)?.json()?;

    println!("{}", created.url);
    Ok(())
}

fn handle_view(client: &Client, server: &Url, paste: &str) -> Result<()> {
    let id = paste_id(paste)?;
    let res = client
        .get(endpoint(server, Some(&id))?)
        .send()
        .context("Failed to get data")?;

    if res.status() == StatusCode::NOT_FOUND {
        bail!("This paste doesn't exist, has expired, or has reached its maximum view limit.");
    }

    let view: PasteView = check(res)?.json()?;

    let mut stdout = std::io::stdout();
    stdout.write_all(view.content.as_bytes())?;
    if atty::is(Stream::Stdout) && !view.content.ends_with('\n') {
        writeln!(stdout)?;
    }

    eprintln!("{view}");
    Ok(())
}

fn handle_delete(client: &Client, server: &Url, paste: &str) -> Result<()> {
    let id = paste_id(paste)?;
    let res = client
        .delete(endpoint(server, Some(&id))?)
        .send()
        .context("Request to server failed")?;
    let deleted: Deleted = check(res)?.json()?;

    if !deleted.success {
        bail!("Server refused to delete {id}");
    }
    eprintln!("Deleted {id}");
    Ok(())
}

/// `{server}/pastes` or `{server}/pastes/{id}`.
fn endpoint(server: &Url, id: Option<&str>) -> Result<Url> {
    let mut url = server.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| anyhow!("{server} cannot be used as a base URL"))?;
        segments
            .pop_if_empty()
            .extend(PASTES_ENDPOINT.trim_start_matches('/').split('/'));
        if let Some(id) = id {
            segments.push(id);
        }
    }
    Ok(url)
}

/// Accepts either a bare id or a share link, whose last path segment is the
/// id.
fn paste_id(paste: &str) -> Result<String> {
    let paste = paste.trim();
    if !paste.contains('/') {
        return Ok(paste.to_owned());
    }

    let url = Url::parse(paste).context("The provided url was bad")?;
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(ToOwned::to_owned)
        .ok_or_else(|| anyhow!("No paste id in {url}"))
}

fn check(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    match res.json::<ErrorBody>() {
        Ok(ErrorBody { error }) => bail!("Server returned {status}: {error}"),
        Err(_) => bail!("Got bad response from server: {status}"),
    }
}
