use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use pan123_upload::{ClientConfig, CompletionPoller, OpenApiClient};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::upload::spawn_ctrl_c;

#[derive(Args, Clone, Debug)]
pub struct PollArg {
    #[arg(help = "preuploadID returned by an asynchronous upload")]
    pub preupload_id: String,
    #[arg(long, default_value_t = 1, help = "Seconds between polls, at least 1")]
    pub interval:     u64,
    #[arg(long, default_value_t = 60, help = "Give up after this many polls")]
    pub max_polls:    u32,
    #[arg(long, help = "Query once instead of waiting")]
    pub once:         bool,
}

pub async fn poll(config: ClientConfig, arg: PollArg) -> Result<()> {
    let api = OpenApiClient::new(config).context("failed to build API client")?;
    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    let poller = CompletionPoller::new(&api)
        .interval(Duration::from_secs(arg.interval))
        .max_polls(arg.max_polls)
        .cancel(cancel);

    if arg.once {
        let result = poller
            .query(&arg.preupload_id)
            .await
            .with_context(|| format!("failed to query preuploadID {}", arg.preupload_id))?;
        if result.completed {
            println!("completed, fileID {}", result.file_id);
        } else {
            println!("pending");
        }
        return Ok(());
    }

    let file_id = poller
        .wait(&arg.preupload_id)
        .await
        .with_context(|| format!("merge of preuploadID {} failed", arg.preupload_id))?;
    info!(preupload_id = %arg.preupload_id, file_id, "merge finished");
    println!("completed, fileID {file_id}");
    Ok(())
}
