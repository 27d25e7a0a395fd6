use anyhow::{Context, Result};
use pan123_upload::{ClientConfig, OpenApiClient};

/// Prints a fresh access token, suitable for `PAN123_ACCESS_TOKEN`.
pub async fn login(config: ClientConfig) -> Result<()> {
    let api = OpenApiClient::new(config).context("failed to build API client")?;
    let token = api.login().await.context("login failed")?;
    eprintln!("expires at {}", token.expired_at);
    println!("{}", token.access_token);
    Ok(())
}
