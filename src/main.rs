//! Command-line entry point: capture one URL into an offline replica.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use sitemirror::{
    CancelToken, CaptureConfig, ChromiumSession, FanoutSink, HttpTransport, JobSink, JobStore,
    LogSink, capture,
};

#[derive(Debug, Parser)]
#[command(name = "sitemirror", about = "Capture a live web page as an offline static replica")]
struct Args {
    /// Page to capture; a missing scheme defaults to https.
    url: String,

    /// Directory that receives one capture folder per run.
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Show the browser window instead of running headless.
    #[arg(long)]
    headed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = CaptureConfig::builder()
        .output_root(args.output_dir)
        .headless(!args.headed)
        .build();

    let store = Arc::new(JobStore::new());
    let job_id = store.create(&args.url);
    let sink = FanoutSink::new(vec![
        Arc::new(LogSink),
        Arc::new(JobSink::new(store.clone(), job_id)),
    ]);

    let session = ChromiumSession::launch(&config).await?;
    let transport = HttpTransport::new(config.user_agent())?;
    let cancel = CancelToken::new();

    match capture(&config, &args.url, session, &transport, &sink, &cancel).await {
        Ok(outcome) => {
            store.complete(job_id, outcome.clone());
            println!(
                "captured {} assets -> {}",
                outcome.asset_count,
                config.output_root().join(&outcome.entry_document).display()
            );
            Ok(())
        }
        Err(e) => {
            store.fail(job_id, e.to_string());
            Err(e.into())
        }
    }
}
