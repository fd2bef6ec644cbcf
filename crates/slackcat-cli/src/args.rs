use std::path::PathBuf;

use clap::Parser;

/// redirect a file to slack
#[derive(Debug, Parser)]
#[command(name = "slackcat", version, about)]
pub struct Args {
    /// Print stdin to screen before posting
    #[arg(short, long)]
    pub tee: bool,

    /// Stream messages to Slack continuously instead of uploading a single snippet
    #[arg(short, long)]
    pub stream: bool,

    /// Skip posting to Slack. Useful for testing
    #[arg(long)]
    pub noop: bool,

    /// Configure slackcat via oauth
    #[arg(long)]
    pub configure: bool,

    /// Slack channel, group, or user to post to (`name` or `team:name`)
    #[arg(short, long)]
    pub channel: Option<String>,

    /// Filename for upload. Defaults to the file's name, or the current timestamp for stdin
    #[arg(short = 'n', long)]
    pub filename: Option<String>,

    /// Post streamed lines as plain text instead of a code block
    #[arg(short, long)]
    pub plain: bool,

    /// Config file (default: ~/.config/slackcat/config.toml, then ~/.slackcat)
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// File to upload. Reads stdin when omitted
    pub file: Option<PathBuf>,
}
