use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::telemetry::{LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "ybfeed",
    about = "Share clipboard text and files through a ybFeed server",
    version
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "YBFEED_SERVER",
        help = "Base URL of the feed server"
    )]
    pub server: Option<String>,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        env = "YBFEED_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "YBFEED_LOG_FILE",
        help = "Write logs to the specified file instead of stderr"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

/// How a one-shot command proves access to a feed.
#[derive(Args, Debug, Clone, Default)]
pub struct AuthArgs {
    #[arg(
        long,
        env = "YBFEED_SECRET",
        help = "Session secret granting access to the feed"
    )]
    pub secret: Option<String>,

    #[arg(
        long,
        help = "Prompt for the feed PIN and exchange it for a session secret"
    )]
    pub pin: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Follow a feed live, printing items as they change
    Watch {
        feed: String,
        #[arg(
            long,
            env = "YBFEED_SECRET",
            help = "Secret from a shared link; exchanged for a session secret on startup"
        )]
        secret: Option<String>,
    },
    /// Print the feed's current items
    Get {
        feed: String,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Print one item's raw content
    Item {
        feed: String,
        name: String,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Post text or a file to the feed
    Post {
        feed: String,
        #[arg(long, conflicts_with = "file", help = "Post this text instead of a file")]
        text: Option<String>,
        file: Option<PathBuf>,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Delete one item from the feed
    Delete {
        feed: String,
        name: String,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Remove every item from the feed
    Empty {
        feed: String,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Set a temporary 4-digit PIN on the feed (expires after 2 minutes)
    SetPin {
        feed: String,
        #[arg(help = "The PIN; prompted for when omitted")]
        pin: Option<String>,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Print a shareable link carrying the feed secret
    Link {
        feed: String,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Check the server and print its version
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_parses_with_link_secret() {
        let cli = Cli::parse_from(["ybfeed", "watch", "demo", "--secret", "abc123"]);
        match cli.command {
            Command::Watch { feed, secret } => {
                assert_eq!(feed, "demo");
                assert_eq!(secret.as_deref(), Some("abc123"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn post_refuses_text_and_file_together() {
        let result = Cli::try_parse_from([
            "ybfeed", "post", "demo", "--text", "hi", "notes.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn server_flag_is_global() {
        let cli = Cli::parse_from(["ybfeed", "ping", "--server", "https://feed.example.com"]);
        assert_eq!(cli.server.as_deref(), Some("https://feed.example.com"));
    }
}
