use actix_web::{web, App, HttpServer, middleware::Logger};
use actix_web::main;
use actix_cors::Cors;
use anyhow::Context;
use env_logger::Env;
use log::{info, error};
use std::sync::Arc;

mod ai;
mod auth;
mod config;
mod db;
mod errors;
mod extractor;
mod handlers;
mod models;

use crate::ai::{OpenAiClient, TextGenerator};
use crate::auth::SessionAuthenticator;
use crate::config::Config;

#[main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // A missing signing key means we never start serving
    let config = Config::from_env().map_err(|err| {
        error!("Invalid configuration: {}", err);
        err
    })?;

    let pool = db::connect(&config.database_url).await?;
    db::init_schema(&pool).await?;

    let authenticator = web::Data::new(SessionAuthenticator::new(config.jwt_secret.as_bytes()));
    let generator: Arc<dyn TextGenerator> = Arc::new(OpenAiClient::new(&config.openai)?);
    let generator = web::Data::from(generator);
    let pool = web::Data::new(pool);

    info!("Listening on {}", config.bind_addr);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(pool.clone())
            .app_data(authenticator.clone())
            .app_data(generator.clone())
            .configure(handlers::configure)
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("Failed to bind {}", config.bind_addr))?
    .run()
    .await
    .context("Server error")
}
