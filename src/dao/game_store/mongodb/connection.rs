use std::time::Duration;

use mongodb::{Client, Database, bson::doc};
use tokio::time::sleep;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

const PING_BACKOFF: Duration = Duration::from_millis(250);

/// Open a client on the configured database and make sure it answers.
///
/// Only a short burst of pings is tried here; longer outages are left to
/// the storage supervisor's reconnect loop.
pub async fn open_database(config: &MongoConfig) -> MongoResult<Database> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);
    ping(&database, config.ping_attempts).await?;
    Ok(database)
}

async fn ping(database: &Database, attempts: u32) -> MongoResult<()> {
    let mut attempt = 1;
    loop {
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => return Ok(()),
            Err(source) if attempt >= attempts => {
                return Err(MongoDaoError::InitialPing {
                    attempts: attempt,
                    source,
                });
            }
            Err(_) => {
                sleep(PING_BACKOFF * attempt).await;
                attempt += 1;
            }
        }
    }
}
