use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use slackcat_channels::Channel;
use slackcat_core::config::CONFIGURE_URL;
use slackcat_core::{BatchFormat, SlackcatConfig, SlackcatError, StreamConfig};
use slackcat_slack::{SlackAdapter, SlackClient};
use slackcat_stream::{
    spawn_interrupt_listener, ReaderSource, StreamController, StreamError, StreamOptions,
    StreamOutcome,
};
use tracing::{error, info, warn};

mod args;
mod upload;

use args::Args;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,slackcat=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let code = match run(Args::parse()).await {
        Ok(code) => code,
        Err(e) => {
            let code = e
                .downcast_ref::<SlackcatError>()
                .map(SlackcatError::code)
                .unwrap_or("ERROR");
            error!(code, "{e:#}");
            1
        }
    };

    // Exit explicitly: a blocked stdin read would otherwise hold the runtime open.
    std::process::exit(code);
}

async fn run(args: Args) -> anyhow::Result<i32> {
    if args.configure {
        configure(|url| open::that(url));
        return Ok(0);
    }

    let config = SlackcatConfig::load(args.config.as_deref())?;
    let target = config.resolve_channel(args.channel.as_deref())?;

    let client = SlackClient::new(
        target.token.clone(),
        config.slack.api_base.clone(),
        Duration::from_secs(config.slack.timeout_secs),
    )?;
    let adapter = SlackAdapter::new(client);
    adapter.connect().await?;
    let destination = adapter.resolve(&target.channel).await?;
    info!(team = %target.team, id = %destination.id, "posting to {destination}");

    if let Some(ref path) = args.file {
        if args.stream {
            warn!("filepath provided, ignoring stream option");
        }
        let (name, bytes) = upload::from_path(path, args.filename.clone()).await?;
        upload::share(&adapter, &destination, name, bytes, args.noop).await?;
        return Ok(0);
    }

    let source = ReaderSource::stdin(args.tee);

    if !args.stream {
        let (name, bytes) = upload::from_source(source, args.filename.clone()).await;
        if bytes.is_empty() {
            warn!("no input received, nothing to upload");
            return Ok(0);
        }
        upload::share(&adapter, &destination, name, bytes, args.noop).await?;
        return Ok(0);
    }

    let options = stream_options(&config.stream, &args);
    info!("starting stream");
    let signals = spawn_interrupt_listener();
    let controller = StreamController::new(Arc::new(adapter), destination, options);
    match controller.run(source, signals).await {
        Ok(StreamOutcome::Drained) => Ok(0),
        Ok(StreamOutcome::Aborted) => Ok(0),
        Err(e @ StreamError::Send { .. }) => {
            error!("{e}");
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

/// Flag overrides on top of the `[stream]` config section.
fn stream_options(config: &StreamConfig, args: &Args) -> StreamOptions {
    let mut options = StreamOptions::from_config(config, args.noop);
    if args.plain {
        options.format = BatchFormat::Plain;
    }
    options
}

/// Print the authorization URL and try to open it in a browser.
/// Returns whether the browser was launched.
fn configure<F>(open_url: F) -> bool
where
    F: FnOnce(&str) -> std::io::Result<()>,
{
    info!("Creating token request for slackcat");
    info!("Use the below URL to authorize slackcat and save the token to ~/.slackcat");
    info!("{CONFIGURE_URL}");
    match open_url(CONFIGURE_URL) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "could not open browser, visit the URL above");
            false
        }
    }
}
