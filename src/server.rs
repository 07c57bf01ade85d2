use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::error::NatureError;
use crate::filter::Query;
use crate::model::{Field, RecordDraft};
use crate::storage::RecordStore;
use crate::{DeleteOutcome, NatureDb};

// Largest accepted request body
const MAX_BODY: u64 = 64 * 1024;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DeleteReply {
    pub id: u64,
    pub outcome: DeleteOutcome,
}

pub struct NatureServer<S: RecordStore> {
    db: Arc<NatureDb<S>>,
}

impl<S: RecordStore + 'static> NatureServer<S> {
    pub fn new(db: Arc<NatureDb<S>>) -> Self {
        Self { db }
    }

    /// Serves until ctrl-c.
    pub async fn run(&self, addr: SocketAddr) -> Result<(), warp::Error> {
        let (bound, server) = warp::serve(routes(self.db.clone()))
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
        })?;

        info!(%bound, "natureseek listening");
        server.await;
        info!("shutting down");
        Ok(())
    }
}

pub fn routes<S: RecordStore + 'static>(
    db: Arc<NatureDb<S>>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    // GET /records?crop=..&pests=..
    let list = warp::get()
    .and(warp::path("records"))
    .and(warp::path::end())
    .and(warp::query::<HashMap<String, String>>())
    .and(with_db(db.clone()))
    .and_then(list_records::<S>);

    // POST /records
    let register = warp::post()
    .and(warp::path("records"))
    .and(warp::path::end())
    .and(warp::body::content_length_limit(MAX_BODY))
    .and(warp::body::json())
    .and(with_db(db.clone()))
    .and_then(register_record::<S>);

    // DELETE /records/{id}
    let delete = warp::delete()
    .and(warp::path!("records" / u64))
    .and(with_db(db.clone()))
    .and_then(delete_record::<S>);

    // --- STATISTICS ---

    let summary = warp::get()
    .and(warp::path!("stats" / "summary"))
    .and(with_db(db.clone()))
    .and_then(|db: Arc<NatureDb<S>>| async move {
        Ok::<_, Rejection>(reply_blocking(move || Ok(db.summary())).await)
    });

    let dashboard = warp::get()
    .and(warp::path!("stats" / "dashboard"))
    .and(with_db(db.clone()))
    .and_then(|db: Arc<NatureDb<S>>| async move {
        Ok::<_, Rejection>(reply_blocking(move || Ok(db.dashboard())).await)
    });

    let frequencies = warp::get()
    .and(warp::path!("stats" / "frequencies" / String))
    .and(with_db(db.clone()))
    .and_then(|field: String, db: Arc<NatureDb<S>>| async move {
        let reply = match field.parse::<Field>() {
            Ok(field) => reply_blocking(move || Ok(db.frequencies(field))).await,
            Err(e) => error_reply(StatusCode::BAD_REQUEST, e.to_string()),
        };
        Ok::<_, Rejection>(reply)
    });

    let crosstab = warp::get()
    .and(warp::path!("stats" / "crosstab" / String / String))
    .and(with_db(db))
    .and_then(|rows: String, columns: String, db: Arc<NatureDb<S>>| async move {
        let reply = match (rows.parse::<Field>(), columns.parse::<Field>()) {
            (Ok(rows), Ok(columns)) => reply_blocking(move || Ok(db.cross_tab(rows, columns))).await,
            (Err(e), _) | (_, Err(e)) => error_reply(StatusCode::BAD_REQUEST, e.to_string()),
        };
        Ok::<_, Rejection>(reply)
    });

    list.or(register)
    .or(delete)
    .or(summary)
    .or(dashboard)
    .or(frequencies)
    .or(crosstab)
    .recover(handle_rejection)
    .with(warp::trace::request())
}

fn with_db<S: RecordStore>(db: Arc<NatureDb<S>>) -> impl Filter<Extract = (Arc<NatureDb<S>>,), Error = Infallible> + Clone {
    warp::any().map(move || db.clone())
}

// --- HANDLERS ---

async fn list_records<S: RecordStore + 'static>(
    params: HashMap<String, String>,
    db: Arc<NatureDb<S>>,
) -> Result<Response, Rejection> {
    let query = match Query::from_params(&params) {
        Ok(q) => q,
        Err(e) => return Ok(error_reply(StatusCode::BAD_REQUEST, e.to_string())),
    };
    Ok(reply_blocking(move || Ok(db.query(&query))).await)
}

async fn register_record<S: RecordStore + 'static>(
    draft: RecordDraft,
    db: Arc<NatureDb<S>>,
) -> Result<Response, Rejection> {
    let result = tokio::task::spawn_blocking(move || db.register(&draft)).await;
    Ok(match result {
        Ok(Ok(record)) => warp::reply::with_status(warp::reply::json(&record), StatusCode::CREATED).into_response(),
        Ok(Err(e)) => nature_error_reply(e),
        Err(e) => {
            error!("register task failed: {}", e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    })
}

async fn delete_record<S: RecordStore + 'static>(id: u64, db: Arc<NatureDb<S>>) -> Result<Response, Rejection> {
    let result = tokio::task::spawn_blocking(move || db.delete(id)).await;
    Ok(match result {
        Ok(Ok(outcome)) => {
            let status = match outcome {
                DeleteOutcome::Deleted => StatusCode::OK,
                DeleteOutcome::NotFound => StatusCode::NOT_FOUND,
            };
            warp::reply::with_status(warp::reply::json(&DeleteReply { id, outcome }), status).into_response()
        }
        Ok(Err(e)) => nature_error_reply(e),
        Err(e) => {
            error!("delete task failed: {}", e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    })
}

/// Runs store work off the async workers and serialises the result.
async fn reply_blocking<T, F>(work: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Result<T, NatureError> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(Ok(value)) => warp::reply::json(&value).into_response(),
        Ok(Err(e)) => nature_error_reply(e),
        Err(e) => {
            error!("blocking task failed: {}", e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

fn nature_error_reply(e: NatureError) -> Response {
    let status = match &e {
        NatureError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        NatureError::CorruptStore(_) | NatureError::IdSpaceExhausted(_) => StatusCode::CONFLICT,
        NatureError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("request failed: {}", e);
    }
    error_reply(status, e.to_string())
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> Response {
    warp::reply::with_status(warp::reply::json(&ErrorBody { error: message.into() }), status).into_response()
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "payload too large".to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "content-length required".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        error!("unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
    };
    Ok(error_reply(status, message))
}
