use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use pan123_upload::ClientConfig;
use pan123_upload::data::options::DEFAULT_BASE_URL;

use super::poll::PollArg;
use super::upload::UploadArg;

#[derive(Clone, Debug, Parser)]
#[command(name = "pan123", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    #[command(flatten)]
    pub conn: Connection,
    #[command(subcommand)]
    pub cmd:  Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "up", name = "upload", about = "Upload a file, reusing server content when possible")]
    Upload(UploadArg),
    #[command(alias = "p", name = "poll", about = "Wait for an asynchronous upload to finish merging")]
    Poll(PollArg),
    #[command(name = "login", about = "Exchange client credentials for an access token")]
    Login,
}

#[derive(Args, Clone, Debug)]
pub struct Connection {
    #[arg(long, global = true, env = "PAN123_ACCESS_TOKEN", hide_env_values = true)]
    access_token:  Option<String>,
    #[arg(long, global = true, env = "PAN123_CLIENT_ID")]
    client_id:     Option<String>,
    #[arg(long, global = true, env = "PAN123_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,
    #[arg(long, global = true, env = "PAN123_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url:      String,
    #[arg(long, global = true, help = "Per-request timeout in seconds")]
    timeout:       Option<u64>,
}

impl Connection {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default().base_url(&self.base_url);
        if let Some(token) = &self.access_token {
            config = config.access_token(token);
        }
        if let (Some(id), Some(secret)) = (&self.client_id, &self.client_secret) {
            config = config.credentials(id, secret);
        }
        if let Some(secs) = self.timeout {
            config = config.timeout(Duration::from_secs(secs));
        }
        config
    }
}
