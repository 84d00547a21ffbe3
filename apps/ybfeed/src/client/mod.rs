//! Interactive front end: the live watch loop and the prompts/printing the
//! one-shot commands share. This is the stand-in for the browser's rendering
//! layer; everything here consumes the session's event stream and never
//! reaches into its internals.

use std::io;

use time::format_description::well_known::Rfc3339;
use tracing::debug;

use crate::api::{ApiClient, ApiError};
use crate::error::CliError;
use crate::protocol::FeedItem;
use crate::session::{AuthStatus, FeedSession, SessionError, SessionEvent};

/// Prompt for a feed PIN without echoing it. Runs on a blocking thread so
/// the runtime keeps servicing the session while the user types.
pub async fn prompt_pin() -> Result<String, CliError> {
    let pin = tokio::task::spawn_blocking(|| rpassword::prompt_password("Feed PIN: "))
        .await
        .map_err(io::Error::other)??;
    validate_pin(&pin)?;
    Ok(pin)
}

pub fn validate_pin(pin: &str) -> Result<(), CliError> {
    if pin.len() == 4 && pin.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(CliError::InvalidPin)
    }
}

pub fn format_date(date: time::OffsetDateTime) -> String {
    date.format(&Rfc3339).unwrap_or_else(|_| date.to_string())
}

pub fn print_items(items: &[FeedItem]) {
    if items.is_empty() {
        println!("(feed is empty)");
        return;
    }
    for item in items {
        println!(
            "{}  {:<6}  {}",
            format_date(item.date),
            item.kind.as_str(),
            item.name
        );
    }
}

/// Follow a feed live until the session ends.
///
/// Bootstraps authentication (shared-link secret first, then the plain
/// fetch, then a PIN prompt loop on 401), renders the reconciled list on
/// every change, reports reconnects, and returns once the server closes the
/// session for good.
pub async fn run_watch(
    api: ApiClient,
    feed: &str,
    link_secret: Option<&str>,
) -> Result<(), CliError> {
    let (mut session, mut events) = FeedSession::new(api, feed);

    println!("connecting to feed '{feed}'...");
    let status = session.start(link_secret).await?;

    if status == AuthStatus::Unauthenticated {
        println!("This feed is protected by a PIN.");
        loop {
            let pin = match prompt_pin().await {
                Ok(pin) => pin,
                Err(CliError::InvalidPin) => {
                    eprintln!("A PIN is four digits, try again.");
                    continue;
                }
                Err(err) => {
                    session.stop().await;
                    return Err(err);
                }
            };
            match session.submit_pin(&pin).await {
                Ok(()) => break,
                Err(SessionError::Api(ApiError::Unauthorized)) => {
                    eprintln!("PIN rejected, try again.");
                }
                Err(err) => {
                    session.stop().await;
                    return Err(err.into());
                }
            }
        }
    }

    let mut rendered_once = false;
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Auth(status) => debug!(?status, "session status"),
            SessionEvent::Items(items) => {
                if rendered_once {
                    println!();
                }
                print_items(&items);
                rendered_once = true;
            }
            SessionEvent::Connected => {
                eprintln!("watching '{feed}' (press Ctrl-C to stop)");
            }
            SessionEvent::Disconnected => {
                eprintln!("connection lost, retrying...");
            }
            SessionEvent::Ended => {
                println!("the feed session was ended by the server");
                break;
            }
        }
    }

    session.stop().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_must_be_four_digits() {
        assert!(validate_pin("1234").is_ok());
        assert!(validate_pin("0000").is_ok());
        assert!(validate_pin("123").is_err());
        assert!(validate_pin("12345").is_err());
        assert!(validate_pin("12a4").is_err());
        assert!(validate_pin("").is_err());
    }
}
