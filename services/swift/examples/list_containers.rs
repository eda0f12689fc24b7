use reqstore_core::{Context, OsEnv, Result};
use reqstore_http_send_reqwest::ReqwestHttpSend;
use reqstore_swift::{Catalog, Config, Session};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = env_logger::builder().try_init();

    // Reads REQSTORE_USERNAME, REQSTORE_API_KEY, REQSTORE_CLUSTER and,
    // optionally, REQSTORE_ACCOUNT.
    let ctx = Context::new()
        .with_http_send(ReqwestHttpSend::with_timeout(Some(Duration::from_secs(10)))?)
        .with_env(OsEnv);
    let config = Config::default().from_env(&ctx);
    let session = Session::from_config(ctx, config)?;

    println!("storage url: {}", session.storage_url().await?);
    for container in Catalog::containers(session).list(None).await? {
        println!(
            "{:<32} {:>8} objects {:>12} bytes",
            container.name, container.count, container.bytes
        );
    }
    Ok(())
}
