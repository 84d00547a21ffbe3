//! One-shot subcommands: thin orchestration over the API client, with the
//! same secret/PIN handling rules as the live view.

use std::io::{self, Write};
use std::path::Path;

use crate::api::ApiClient;
use crate::cli::AuthArgs;
use crate::client::{print_items, prompt_pin, validate_pin};
use crate::error::CliError;

/// Resolve the secret a command should present: an explicit `--secret`
/// wins; `--pin` prompts and exchanges the PIN for a session secret.
async fn resolve_secret(
    api: &ApiClient,
    feed: &str,
    auth: &AuthArgs,
) -> Result<Option<String>, CliError> {
    if let Some(secret) = &auth.secret {
        return Ok(Some(secret.clone()));
    }
    if auth.pin {
        let pin = prompt_pin().await?;
        let secret = api.authenticate_feed(feed, &pin).await?;
        return Ok(Some(secret));
    }
    Ok(None)
}

pub async fn get(api: &ApiClient, feed: &str, auth: &AuthArgs) -> Result<(), CliError> {
    let secret = resolve_secret(api, feed, auth).await?;
    let snapshot = api.get_feed(feed, secret.as_deref()).await?;
    print_items(&snapshot.items);
    Ok(())
}

pub async fn item(api: &ApiClient, feed: &str, name: &str, auth: &AuthArgs) -> Result<(), CliError> {
    let secret = resolve_secret(api, feed, auth).await?;
    let content = api.get_item(feed, name, secret.as_deref()).await?;
    let mut stdout = io::stdout();
    stdout.write_all(&content)?;
    stdout.flush()?;
    Ok(())
}

pub async fn post(
    api: &ApiClient,
    feed: &str,
    text: Option<&str>,
    file: Option<&Path>,
    auth: &AuthArgs,
) -> Result<(), CliError> {
    let (content_type, body) = match (text, file) {
        (Some(text), None) => ("text/plain".to_owned(), text.as_bytes().to_vec()),
        (None, Some(path)) => {
            let body = std::fs::read(path)?;
            let content_type = mime_guess::from_path(path).first_or_octet_stream().to_string();
            (content_type, body)
        }
        _ => return Err(CliError::MissingContent),
    };

    let secret = resolve_secret(api, feed, auth).await?;
    api.post_item(feed, &content_type, body, secret.as_deref())
        .await?;
    println!("posted to '{feed}'");
    Ok(())
}

pub async fn delete(
    api: &ApiClient,
    feed: &str,
    name: &str,
    auth: &AuthArgs,
) -> Result<(), CliError> {
    let secret = resolve_secret(api, feed, auth).await?;
    api.delete_item(feed, name, secret.as_deref()).await?;
    println!("deleted '{name}' from '{feed}'");
    Ok(())
}

pub async fn empty(api: &ApiClient, feed: &str, auth: &AuthArgs) -> Result<(), CliError> {
    let secret = resolve_secret(api, feed, auth).await?;
    api.empty_feed(feed, secret.as_deref()).await?;
    println!("emptied '{feed}'");
    Ok(())
}

pub async fn set_pin(
    api: &ApiClient,
    feed: &str,
    pin: Option<&str>,
    auth: &AuthArgs,
) -> Result<(), CliError> {
    let pin = match pin {
        Some(pin) => {
            validate_pin(pin)?;
            pin.to_owned()
        }
        None => prompt_pin().await?,
    };
    let secret = resolve_secret(api, feed, auth).await?;
    api.set_pin(feed, &pin, secret.as_deref()).await?;
    println!("PIN set on '{feed}', it expires after 2 minutes");
    Ok(())
}

/// Print a link that lets someone else open the feed directly: the feed URL
/// with the session secret attached, which their client exchanges on load.
pub async fn link(api: &ApiClient, feed: &str, auth: &AuthArgs) -> Result<(), CliError> {
    let secret = match resolve_secret(api, feed, auth).await? {
        Some(secret) => secret,
        // No credentials given: a plain fetch still yields the secret when
        // the feed is newly created (or the server trusts us already).
        None => {
            let snapshot = api.get_feed(feed, None).await?;
            snapshot
                .session_secret()
                .map(str::to_owned)
                .ok_or(crate::session::SessionError::MissingSecret)?
        }
    };

    let mut url = api.base_url().clone();
    url.path_segments_mut()
        .expect("base URL is hierarchical")
        .pop_if_empty()
        .push(feed);
    url.query_pairs_mut().append_pair("secret", &secret);
    println!("{url}");
    Ok(())
}

pub async fn ping(api: &ApiClient) -> Result<(), CliError> {
    match api.ping().await? {
        Some(version) => println!("server is up, version {version}"),
        None => println!("server is up"),
    }
    Ok(())
}
