use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;
use pan123_upload::{
    ClientConfig, OpenApiClient, ProgressEvent, ReqwestTransport, UploadOptions, UploadOutcome,
    UploadRequest, Uploader,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::utils::tracker::SliceTracker;

#[derive(Args, Clone, Debug)]
pub struct UploadArg {
    #[arg(help = "File to upload")]
    pub path:    PathBuf,
    #[arg(long, default_value_t = 0, help = "Destination directory id, 0 for the root")]
    pub parent:  u64,
    #[arg(long, help = "Name on the server, defaults to the local file name")]
    pub name:    Option<String>,
    #[arg(long, help = "Retries per slice")]
    pub retries: Option<u32>,
    #[arg(long, help = "Wait for asynchronous merges to finish")]
    pub wait:    bool,
}

pub async fn upload(config: ClientConfig, arg: UploadArg) -> Result<()> {
    let filename = match &arg.name {
        Some(name) => name.clone(),
        None => arg
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .with_context(|| format!("cannot derive a file name from {}", arg.path.display()))?,
    };
    ensure_file(&arg.path)?;
    let file = tokio::fs::File::open(&arg.path)
        .await
        .with_context(|| format!("failed to open {}", arg.path.display()))?;

    let tracker = SliceTracker::new();
    let events = tracker.clone();
    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    let mut options = UploadOptions::default()
        .cancel(cancel)
        .on_progress(Arc::new(move |event: &ProgressEvent| events.on_event(event)));
    if let Some(retries) = arg.retries {
        options = options.max_retries(retries);
    }

    let api = OpenApiClient::new(config.clone()).context("failed to build API client")?;
    let transport = ReqwestTransport::new(&config).context("failed to build slice transport")?;
    let uploader = Uploader::new(api, transport).with_options(options);

    let outcome = uploader
        .upload(UploadRequest::new(arg.parent, filename, file))
        .await
        .with_context(|| format!("upload of {} failed", arg.path.display()));
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            tracker.abandon();
            return Err(e);
        }
    };
    if uploader.api().take_token_refreshed() {
        warn!("access token was refreshed during upload, update PAN123_ACCESS_TOKEN");
    }
    info!(path = %arg.path.display(), ?outcome, "upload finished");

    match outcome {
        UploadOutcome::Reused { file_id } => {
            tracker.finish(format!("instant upload, fileID {file_id}"));
        }
        UploadOutcome::Completed { file_id } => {
            tracker.finish(format!("uploaded, fileID {file_id}"));
        }
        UploadOutcome::Pending { preupload_id } if arg.wait => {
            tracker.set_message("waiting for merge");
            let file_id = uploader
                .poller()
                .wait(&preupload_id)
                .await
                .with_context(|| format!("merge of preuploadID {preupload_id} failed"))?;
            tracker.finish(format!("uploaded, fileID {file_id}"));
        }
        UploadOutcome::Pending { preupload_id } => {
            tracker.finish(format!("merge pending, run `pan123 poll {preupload_id}`"));
        }
    }
    Ok(())
}

pub(crate) fn spawn_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("cancelling...");
            token.cancel();
        }
    });
}

fn ensure_file(path: &std::path::Path) -> Result<()> {
    if !path.is_file() {
        bail!("{} is not a regular file", path.display());
    }
    Ok(())
}
