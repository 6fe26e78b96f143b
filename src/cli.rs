// Command-line front end
// Runs one upload session: select a file, wait for the verdict, optionally
// override a warning and publish

use crate::services::record_store::default_user;
use crate::services::workflow::{Affordance, View};
use crate::services::{
    drain_notices, notice_channel, ConfigStore, DetectionClient, ModerationSession, NoticeReceiver,
    RecordStore, WorkflowState,
};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const USAGE: &str = "Usage:
  snapbloom <media-file> [--caption <text>] [--continue-anyway] [--publish]
            [--endpoint <url>] [--data-dir <dir>] [--config-dir <dir>] [--json]

Notes:
  - SNAPBLOOM_DETECTION_URL overrides the config file endpoint; --endpoint overrides both.
  - A flagged upload is only published with --continue-anyway.";

#[derive(Debug, Default)]
pub struct CliArgs {
    pub media: PathBuf,
    pub caption: String,
    pub continue_anyway: bool,
    pub publish: bool,
    pub endpoint: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub config_dir: Option<PathBuf>,
    pub json: bool,
}

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

/// `args` excludes the program name. `None` means usage was requested.
pub fn parse_args(args: &[String]) -> Result<Option<CliArgs>> {
    let Some(media) = args.first() else {
        return Ok(None);
    };
    if media == "--help" || media == "-h" {
        return Ok(None);
    }
    if media.starts_with("--") {
        bail!("expected a media file before options, got {}", media);
    }

    Ok(Some(CliArgs {
        media: PathBuf::from(media),
        caption: parse_arg_value(args, "--caption").unwrap_or_default(),
        continue_anyway: has_flag(args, "--continue-anyway"),
        publish: has_flag(args, "--publish"),
        endpoint: parse_arg_value(args, "--endpoint"),
        data_dir: parse_arg_value(args, "--data-dir").map(PathBuf::from),
        config_dir: parse_arg_value(args, "--config-dir").map(PathBuf::from),
        json: has_flag(args, "--json"),
    }))
}

fn print_notices(rx: &mut NoticeReceiver) {
    for notice in drain_notices(rx) {
        let marker = if notice.is_destructive() { "!" } else { "*" };
        println!("[{}] {}: {}", marker, notice.title(), notice.description());
    }
}

fn print_affordance(affordance: &Affordance, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(affordance)?);
        return Ok(());
    }
    match &affordance.view {
        View::MediaSelector => println!("Select an image or video"),
        View::Picker => println!("Choosing media..."),
        View::Progress { label, detail } => {
            println!("{}", label);
            if let Some(d) = detail {
                println!("  {}", d);
            }
        }
        View::Preview { badge, warning } => {
            match &badge.confidence {
                Some(c) => println!("{} ({})", badge.label, c),
                None => println!("{}", badge.label),
            }
            if let Some(w) = warning {
                println!("Warning! {}", w);
            }
        }
        View::BlockingDialog(dialog) => {
            println!("{}", dialog.title);
            println!("  Confidence: {}", dialog.confidence);
            println!("  {}", dialog.message);
            println!("  [{}] / [{}]", dialog.cancel_label, dialog.confirm_label);
        }
        View::Published => println!("Published"),
    }
    Ok(())
}

pub async fn run(args: Vec<String>) -> Result<()> {
    let Some(cli) = parse_args(&args)? else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let config_dir = cli
        .config_dir
        .clone()
        .or_else(ConfigStore::default_config_dir)
        .context("no config directory available")?;
    let config_store = ConfigStore::new(config_dir);
    let mut config = config_store.load().map_err(anyhow::Error::msg)?;
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = Some(dir.clone());
    }

    let (notices, mut notice_rx) = notice_channel();
    let mut client = DetectionClient::from_config(&config)
        .context("failed to build detection client")?
        .with_notices(notices.clone());
    if let Some(endpoint) = &cli.endpoint {
        client = client.with_endpoint(endpoint.clone());
    }
    info!(endpoint = client.endpoint(), "cli.detector");

    let store = RecordStore::new(config.storage.resolved_data_dir());
    if store.ensure_user(default_user())? {
        info!(dir = %store.data_dir().display(), "cli.seeded_default_user");
    }

    let mut session = ModerationSession::new(Arc::new(client), store, notices);

    session.select_path(&cli.media).await?;
    print_affordance(&session.affordance(), cli.json)?;
    print_notices(&mut notice_rx);

    session.settle().await;
    print_notices(&mut notice_rx);
    print_affordance(&session.affordance(), cli.json)?;

    if matches!(session.state(), WorkflowState::Blocked { .. }) {
        if !cli.continue_anyway {
            println!("Not publishing a flagged upload; pass --continue-anyway to override.");
            return Ok(());
        }
        session.continue_anyway()?;
        print_affordance(&session.affordance(), cli.json)?;
    }

    if cli.publish {
        let record = session.publish(&cli.caption)?;
        print_notices(&mut notice_rx);
        if cli.json {
            let mut summary = record.clone();
            // payloads are large; keep the summary readable
            summary.images = summary.images.iter().map(|_| "<data-url>".to_string()).collect();
            summary.videos = summary.videos.iter().map(|_| "<data-url>".to_string()).collect();
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("Post #{} saved (isDeepfake={})", record.id, record.is_deepfake);
        }
    }

    Ok(())
}
