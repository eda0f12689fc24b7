use log::warn;
use reqstore_core::{Context, OsEnv};
use reqstore_http_send_reqwest::ReqwestHttpSend;
use reqstore_swift::{Catalog, Config, Session};
use std::env;

fn init_live_session() -> Option<Session> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("REQSTORE_SWIFT_TEST").ok().as_deref() != Some("on") {
        warn!("REQSTORE_SWIFT_TEST is not set, skipped");
        return None;
    }

    let ctx = Context::new()
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);
    let config = Config::default().from_env(&ctx);
    Some(Session::from_config(ctx, config).expect("REQSTORE_* env must be valid"))
}

#[tokio::test]
async fn test_live_list_containers() -> anyhow::Result<()> {
    let Some(session) = init_live_session() else {
        return Ok(());
    };

    let containers = Catalog::containers(session.clone()).list(None).await?;
    warn!("listed {} containers", containers.len());

    let url = session.storage_url().await?;
    assert!(url.contains("/v1/"));
    Ok(())
}
