// src/web/mod.rs
//! Sandbox queue server: the three extraction queue endpoints backed by an
//! in-memory store, for local use against the watcher and the CLI

pub mod bearer;
pub mod handlers;
pub mod queue_store;
pub mod simulator;
pub mod types;

pub use queue_store::QueueStore;
pub use types::ServerConfig;

use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};
use tracing::info;

use bearer::BearerAuth;
use handlers::EnqueueRejection;
use types::ErrorBody;

use crate::types::{EnqueueRequest, QueueItem, QueueSnapshot};

// CORS Fairing: the extension calls from its own origin
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Authorization, Content-Type",
        ));
    }
}

#[get("/extraction/queue")]
pub async fn get_queue(auth: BearerAuth, store: &State<QueueStore>) -> Json<QueueSnapshot> {
    handlers::get_queue_handler(auth, store).await
}

#[get("/extraction/queue/watch")]
pub async fn watch_queue(
    auth: BearerAuth,
    store: &State<QueueStore>,
    config: &State<ServerConfig>,
) -> Json<QueueSnapshot> {
    handlers::watch_queue_handler(auth, store, config).await
}

#[post("/extraction/queue", data = "<request>")]
pub async fn enqueue(
    auth: BearerAuth,
    request: Json<EnqueueRequest>,
    store: &State<QueueStore>,
    config: &State<ServerConfig>,
) -> Result<status::Created<Json<QueueItem>>, EnqueueRejection> {
    handlers::enqueue_handler(auth, request, store, config).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

#[rocket::catch(400)]
pub fn bad_request() -> Json<ErrorBody> {
    Json(ErrorBody::new("Invalid request format", "BAD_REQUEST"))
}

#[rocket::catch(401)]
pub fn unauthorized() -> Json<ErrorBody> {
    Json(ErrorBody::new("Authorization required", "UNAUTHORIZED"))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<ErrorBody> {
    Json(ErrorBody::new("Not found", "NOT_FOUND"))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<ErrorBody> {
    Json(ErrorBody::new("Internal server error", "INTERNAL_ERROR"))
}

pub fn build_rocket(config: ServerConfig, store: QueueStore) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("address", config.address.clone()))
        .merge(("port", config.port))
        .merge(("log_level", "off"));

    rocket::custom(figment)
        .attach(Cors)
        .manage(config)
        .manage(store)
        .register(
            "/api",
            catchers![bad_request, unauthorized, not_found, internal_error],
        )
        .mount("/api", routes![get_queue, watch_queue, enqueue, options])
}

pub async fn start_web_server(config: ServerConfig) -> Result<()> {
    info!("Starting sandbox queue server");
    info!("Server: http://{}:{}", config.address, config.port);
    info!(
        "Long-poll timeout: {:?}, simulation: {}",
        config.long_poll_timeout(),
        config.simulate
    );

    build_rocket(config, QueueStore::new())
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Queue server failed: {}", e))?;

    Ok(())
}
