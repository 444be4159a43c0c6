// Route definitions and handlers

use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use warp::filters::BoxedFilter;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::chat::ChatService;
use crate::error::handle_rejection;
use crate::handlers::{self, QueryParams};
use crate::store::TableService;
use crate::tables::{TableSpec, TABLES};

/// Shared services handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TableService>,
    pub chat: Arc<ChatService>,
}

impl AppState {
    pub fn new(store: Arc<dyn TableService>, chat: ChatService) -> Self {
        Self {
            store,
            chat: Arc::new(chat),
        }
    }
}

type Route = BoxedFilter<(Response,)>;

fn with_store(
    store: Arc<dyn TableService>,
) -> impl Filter<Extract = (Arc<dyn TableService>,), Error = Infallible> + Clone {
    warp::any().map(move || store.clone())
}

fn with_chat(
    chat: Arc<ChatService>,
) -> impl Filter<Extract = (Arc<ChatService>,), Error = Infallible> + Clone {
    warp::any().map(move || chat.clone())
}

pub fn configure_routes(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let api = TABLES
        .iter()
        .map(|spec| table_routes(spec, state.store.clone()))
        .chain(std::iter::once(user_routes(state.store.clone())))
        .fold(chat_routes(state.chat.clone()), |acc, route| {
            acc.or(route).unify().boxed()
        });

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_headers(vec!["content-type", "authorization"]);

    let log = warp::log::custom(|info| {
        tracing::info!(
            method = %info.method(),
            path = info.path(),
            status = info.status().as_u16(),
            elapsed_ms = info.elapsed().as_millis() as u64,
            "request"
        );
    });

    api.recover(handle_rejection).with(cors).with(log)
}

fn chat_routes(chat: Arc<ChatService>) -> Route {
    // POST /gemini-chat
    let send = warp::path("gemini-chat")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_chat(chat.clone()))
        .and(warp::body::json())
        .and_then(handlers::chat_handler);

    // GET /gemini-chat/history?user_id=X
    let history = warp::path!("gemini-chat" / "history")
        .and(warp::get())
        .and(with_chat(chat))
        .and(warp::query::<QueryParams>())
        .and_then(handlers::history_handler);

    send.or(history).unify().boxed()
}

/// Routes for one record table, limited to the operations it supports
fn table_routes(spec: &'static TableSpec, store: Arc<dyn TableService>) -> Route {
    let collection = warp::path(spec.path).and(warp::path::end());
    let item = warp::path(spec.path)
        .and(warp::path::param::<String>())
        .and(warp::path::end());

    let mut routes: Vec<Route> = Vec::new();

    // GET /<path>?user_id=X
    if spec.ops.list {
        routes.push(
            collection
                .clone()
                .and(warp::get())
                .and(with_store(store.clone()))
                .and(warp::query::<QueryParams>())
                .and_then(move |store: Arc<dyn TableService>, query: QueryParams| {
                    handlers::list_records(spec, store, query)
                })
                .boxed(),
        );
    }

    // POST /<path>
    if spec.ops.create {
        routes.push(
            collection
                .and(warp::post())
                .and(with_store(store.clone()))
                .and(warp::body::json())
                .and_then(move |store: Arc<dyn TableService>, body: Value| {
                    handlers::create_record(spec, store, body)
                })
                .boxed(),
        );
    }

    // PUT /<path>/<id>
    if spec.ops.update {
        routes.push(
            item.clone()
                .and(warp::put())
                .and(with_store(store.clone()))
                .and(warp::body::json())
                .and_then(move |id: String, store: Arc<dyn TableService>, body: Value| {
                    handlers::update_record(spec, id, store, body)
                })
                .boxed(),
        );
    }

    // DELETE /<path>/<id>?user_id=X
    if spec.ops.delete {
        routes.push(
            item.and(warp::delete())
                .and(with_store(store))
                .and(warp::query::<QueryParams>())
                .and_then(move |id: String, store: Arc<dyn TableService>, query: QueryParams| {
                    handlers::delete_record(spec, id, store, query)
                })
                .boxed(),
        );
    }

    routes
        .into_iter()
        .reduce(|acc, route| acc.or(route).unify().boxed())
        .unwrap_or_else(|| warp::any().and_then(reject_not_found).boxed())
}

async fn reject_not_found() -> Result<Response, Rejection> {
    Err(warp::reject::not_found())
}

fn user_routes(store: Arc<dyn TableService>) -> Route {
    // GET /users?user_id=X
    let get = warp::path("users")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_store(store.clone()))
        .and(warp::query::<QueryParams>())
        .and_then(handlers::get_user);

    // POST /users
    let create = warp::path("users")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_store(store.clone()))
        .and(warp::body::json())
        .and_then(handlers::create_user);

    // PUT /users/<id>
    let update = warp::path("users")
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::put())
        .and(with_store(store))
        .and(warp::body::json())
        .and_then(handlers::update_user);

    get.or(create).unify().or(update).unify().boxed()
}
