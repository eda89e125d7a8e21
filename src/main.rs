use std::env;

use tracing_subscriber::EnvFilter;
use zeroize::Zeroize;

use civicpoll::db::dbclient::DBClient;
use civicpoll::identity::VotePepper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let db_url = env::var("CIVICPOLL_DATABASE_URL").expect("expected CIVICPOLL_DATABASE_URL");
    let mut secret = env::var("CIVICPOLL_VOTE_SECRET").expect("expected CIVICPOLL_VOTE_SECRET");

    // Derive once at startup so a misconfigured secret fails here instead of
    // on the first anonymous vote.
    let _pepper = VotePepper::derive(secret.as_bytes());
    secret.zeroize();

    let db = DBClient::new(&db_url).await?;
    db.migrate().await?;

    tracing::info!("schema applied");

    Ok(())
}
