//! A small task-board API exercising the full integration surface:
//! identifier routing, validated bodies, extended-JSON replies, and
//! GridFS file upload/download.
//!
//! Run against a local MongoDB:
//!
//! ```text
//! MONGO_URI=mongodb://localhost:27017/taskboard cargo run --example taskboard
//! ```

use axum::extract::{FromRef, Path};
use axum::routing::{get, post};
use axum::Router;
use http::HeaderMap;
use mangrove::prelude::*;
use mangrove::FileResponse;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
struct AppState {
    mongo: Mongo,
    codec: JsonCodec,
    schema: SchemaConfig,
}

impl FromRef<AppState> for Mongo {
    fn from_ref(state: &AppState) -> Self {
        state.mongo.clone()
    }
}

impl FromRef<AppState> for JsonCodec {
    fn from_ref(state: &AppState) -> Self {
        state.codec
    }
}

impl FromRef<AppState> for SchemaConfig {
    fn from_ref(state: &AppState) -> Self {
        state.schema
    }
}

#[derive(Serialize, Deserialize)]
struct CreateTask {
    title: String,
}

#[derive(Serialize, Deserialize)]
struct TaskReply {
    id: String,
    title: String,
    done: bool,
}

async fn show_task(
    mongo: Mongo,
    codec: JsonCodec,
    IdPath(task_id): IdPath<Oid>,
) -> MangroveResult<axum::response::Response> {
    let task = mongo
        .documents("tasks")?
        .find_one_or_404(doc! {"_id": task_id})
        .await?;
    Ok(codec.respond(&task))
}

async fn create_task(
    mongo: Mongo,
    Validated(task): Validated<CreateTask>,
) -> MangroveResult<ExtJson<TaskReply>> {
    let id = Oid::new();
    mongo
        .documents("tasks")?
        .insert_one(doc! {"_id": id, "title": &task.title, "done": false})
        .await?;
    Ok(ExtJson(TaskReply {
        id: id.to_string(),
        title: task.title,
        done: false,
    }))
}

async fn upload_file(
    mongo: Mongo,
    Path(filename): Path<String>,
    body: axum::body::Bytes,
) -> MangroveResult<String> {
    let id = mongo
        .gridfs()?
        .save_bytes(&filename, &body, SaveOptions::default())
        .await?;
    Ok(id.to_string())
}

async fn download_file(
    mongo: Mongo,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> MangroveResult<FileResponse> {
    mongo
        .gridfs()?
        .send_by_name(&filename, &headers, SendOptions::default())
        .await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let settings = MongoSettings::from_env()?;
    let parts = mangrove::init(&settings).await?;
    let schema = parts.schema.unwrap_or_default();

    let state = AppState {
        mongo: parts.mongo.clone(),
        codec: parts.codec.unwrap_or_default(),
        schema,
    };

    let app = Router::new()
        .route("/tasks/:task_id", get(show_task))
        .route(
            "/tasks",
            post(create_task).layer(ValidateResponse::new(
                ResponseRules::new().status::<TaskReply>(200),
                schema,
            )),
        )
        .route("/files/:filename", get(download_file).post(upload_file))
        .with_state(state);

    // The client connects here, before any request is served.
    parts.mongo.connect()?;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
    axum::serve(listener, app).await?;
    Ok(())
}
