use std::{error::Error, net::SocketAddr};

use foodgram::{
    config::Config,
    routes::{api, State},
};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    log::info!("Connected to database");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = State::new(pool, config);

    log::info!("Listening on {addr}");
    warp::serve(api(state)).run(addr).await;

    Ok(())
}
