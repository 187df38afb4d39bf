// src/web/handlers.rs
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Responder, State};
use tracing::info;

use super::bearer::BearerAuth;
use super::queue_store::{Enqueued, QueueStore};
use super::simulator;
use super::types::{ErrorBody, ServerConfig};
use crate::core::service_client::QUEUE_ENDPOINT;
use crate::types::{DuplicateInfo, EnqueueRequest, QueueItem, QueueSnapshot};

#[derive(Responder)]
pub enum EnqueueRejection {
    #[response(status = 409)]
    Duplicate(Json<DuplicateInfo>),
    #[response(status = 400)]
    Invalid(Json<ErrorBody>),
}

pub async fn get_queue_handler(_auth: BearerAuth, store: &State<QueueStore>) -> Json<QueueSnapshot> {
    Json(QueueSnapshot {
        queue: store.snapshot(),
    })
}

pub async fn watch_queue_handler(
    auth: BearerAuth,
    store: &State<QueueStore>,
    config: &State<ServerConfig>,
) -> Json<QueueSnapshot> {
    let queue = store
        .wait_for_change(&auth.token, config.long_poll_timeout())
        .await;
    Json(QueueSnapshot { queue })
}

pub async fn enqueue_handler(
    _auth: BearerAuth,
    request: Json<EnqueueRequest>,
    store: &State<QueueStore>,
    config: &State<ServerConfig>,
) -> Result<status::Created<Json<QueueItem>>, EnqueueRejection> {
    let request = request.into_inner();

    if request.url.trim().is_empty() {
        return Err(EnqueueRejection::Invalid(Json(ErrorBody::new(
            "url is required",
            "BAD_REQUEST",
        ))));
    }

    let location = QUEUE_ENDPOINT.to_string();

    match store.enqueue(&request) {
        Enqueued::Created(item) => {
            if config.simulate {
                simulator::spawn(
                    store.inner().clone(),
                    item.url.clone(),
                    config.step_delay(),
                );
            }
            Ok(status::Created::new(location).body(Json(item)))
        }
        Enqueued::InFlight(item) => {
            info!("{} is already being extracted", item.url);
            Ok(status::Created::new(location).body(Json(item)))
        }
        Enqueued::Duplicate(duplicate) => {
            info!("Duplicate submission for {}", request.url);
            Err(EnqueueRejection::Duplicate(Json(duplicate)))
        }
    }
}
