use crate::azure::AzureOcr;
use crate::blocklist::CsvBlocklist;
use crate::db::LogStore;
use crate::recognizer::Recognizer;
use crate::types::{LogRecord, Recognition, Source, ValidationResult};
use bytes::BufMut;
use futures::{pin_mut, StreamExt};
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::multipart::FormData;
use warp::{Filter, Rejection, Reply};

const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_LOG_LIMIT: u32 = 10;

pub type Service = Recognizer<AzureOcr, CsvBlocklist, LogStore>;

#[derive(Debug)]
struct BadRequest(String);

impl warp::reject::Reject for BadRequest {}

fn bad_request(message: String) -> Rejection {
    warp::reject::custom(BadRequest(message))
}

pub async fn run(port: u16, service: Arc<Service>) {
    info!("Listening on port {}", port);
    warp::serve(routes(service)).run(([0, 0, 0, 0], port)).await;
}

pub fn routes(
    service: Arc<Service>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let with_service = warp::any().map(move || service.clone());
    let recognize = warp::path!("recognize" / Source)
        .and(warp::post())
        .and(warp::multipart::form().max_length(MAX_UPLOAD_BYTES))
        .and(with_service.clone())
        .and_then(handle_recognize);
    let validate = warp::path!("validate")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_service.clone())
        .and_then(handle_validate);
    let logs = warp::path!("logs")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_service.clone())
        .and_then(handle_logs);
    let blocked_count = warp::path!("blocklist" / "count")
        .and(warp::get())
        .and(with_service)
        .map(|service: Arc<Service>| {
            warp::reply::json(&json!({ "count": service.blocklist().count() }))
        });
    recognize
        .or(validate)
        .or(logs)
        .or(blocked_count)
        .recover(handle_rejection)
}

async fn handle_recognize(
    source: Source,
    form: FormData,
    service: Arc<Service>,
) -> Result<impl Reply, Rejection> {
    let image = read_image(form).await.map_err(|e| {
        warn!("Rejecting {} request: {}", source.as_str(), e);
        bad_request(e.to_string())
    })?;
    match service.recognize(&image, source).await {
        Ok(recognition) => Ok(warp::reply::json(&recognition_json(&recognition))),
        Err(e) => {
            error!("Error handling {} image: {}", source.as_str(), e);
            Err(bad_request(e.to_string()))
        }
    }
}

async fn read_image(mut form: FormData) -> Result<Vec<u8>, failure::Error> {
    let mut image = None;
    while let Some(part) = form.next().await {
        let part = part?;
        debug!("Got part {}", part.name());
        if part.name() != "image" {
            warn!("Ignoring part {}", part.name());
            continue;
        }
        let mut data = Vec::new();
        let stream = part.stream();
        pin_mut!(stream);
        while let Some(buf) = stream.next().await {
            data.put(buf?);
        }
        image = Some(data);
    }
    image.ok_or_else(|| format_err!("Missing image part"))
}

async fn handle_validate(body: Value, service: Arc<Service>) -> Result<impl Reply, Rejection> {
    let candidates = body["candidates"]
        .as_array()
        .and_then(|values| {
            values
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<String>>>()
        })
        .ok_or_else(|| bad_request("Expected a \"candidates\" array of strings".to_string()))?;
    let result = service.validator().validate(&candidates);
    Ok(warp::reply::json(&validation_json(&result)))
}

async fn handle_logs(
    query: HashMap<String, String>,
    service: Arc<Service>,
) -> Result<impl Reply, Rejection> {
    let limit = match query.get("limit") {
        Some(limit) => limit
            .parse()
            .map_err(|_| bad_request(format!("Invalid limit '{}'", limit)))?,
        None => DEFAULT_LOG_LIMIT,
    };
    let records = service.log().recent(limit).await;
    Ok(warp::reply::json(&Value::Array(
        records.iter().map(record_json).collect(),
    )))
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(BadRequest(message)) = err.find::<BadRequest>() {
        (StatusCode::BAD_REQUEST, message.clone())
    } else {
        (StatusCode::BAD_REQUEST, format!("{:?}", err))
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "error": message })),
        code,
    ))
}

fn recognition_json(recognition: &Recognition) -> Value {
    match recognition {
        Recognition::Identified {
            plate,
            status,
            elapsed,
        } => json!({
            "status": status.as_str(),
            "plate": plate.text,
            "format": plate.format.as_str(),
            "processing_time": elapsed.as_secs_f64(),
        }),
        Recognition::NoMatch {
            diagnostics,
            ranked,
            elapsed,
        } => json!({
            "status": "NO_MATCH",
            "diagnostics": diagnostics,
            "ranked": ranked,
            "processing_time": elapsed.as_secs_f64(),
        }),
    }
}

fn validation_json(result: &ValidationResult) -> Value {
    match result {
        ValidationResult::Matched(plate) => json!({
            "status": "MATCHED",
            "plate": plate.text,
            "format": plate.format.as_str(),
        }),
        ValidationResult::NoMatch { ranked } => json!({
            "status": "NO_MATCH",
            "ranked": ranked,
        }),
    }
}

fn record_json(record: &LogRecord) -> Value {
    json!({
        "plate": record.plate,
        "status": record.status,
        "source": record.source,
        "timestamp": record.timestamp,
        "processing_time": record.processing_time,
    })
}
