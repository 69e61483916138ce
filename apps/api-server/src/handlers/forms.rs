//! Request bodies that may arrive as JSON or as `multipart/form-data`.
//!
//! Multipart text fields use bracket notation (`tags[]`,
//! `social_links[0][url]`) and are folded into a JSON document before being
//! deserialized, so one DTO serves both encodings. File parts are kept aside
//! by field name.

use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::{HttpRequest, http::header, web};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use quill_core::domain::UploadedFile;

use crate::middleware::{AppError, AppResult};

/// Upper bound for a JSON body.
const MAX_JSON_BYTES: usize = 256 * 1024;
/// Upper bound for one multipart part; image size rules are checked later.
const MAX_PART_BYTES: usize = 8 * 1024 * 1024;

/// A decoded body.
#[derive(Debug)]
pub struct Form<T> {
    pub data: T,
    pub files: HashMap<String, UploadedFile>,
}

impl<T> Form<T> {
    pub fn take_file(&mut self, field: &str) -> Option<UploadedFile> {
        self.files.remove(field)
    }
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
}

pub async fn read_form<T: DeserializeOwned>(
    req: &HttpRequest,
    payload: web::Payload,
) -> AppResult<Form<T>> {
    let (document, files) = if is_multipart(req) {
        read_multipart(req, payload).await?
    } else {
        (read_json(payload).await?, HashMap::new())
    };

    let data = serde_json::from_value(document)
        .map_err(|e| AppError::BadRequest(format!("Malformed request body: {e}")))?;
    Ok(Form { data, files })
}

async fn read_json(mut payload: web::Payload) -> AppResult<Value> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
        if body.len() + chunk.len() > MAX_JSON_BYTES {
            return Err(AppError::PayloadTooLarge(MAX_JSON_BYTES));
        }
        body.extend_from_slice(&chunk);
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(format!("Malformed JSON: {e}")))
}

async fn read_multipart(
    req: &HttpRequest,
    payload: web::Payload,
) -> AppResult<(Value, HashMap<String, UploadedFile>)> {
    let mut multipart = Multipart::new(req.headers(), payload);
    let mut fields = Map::new();
    let mut files = HashMap::new();

    while let Some(item) = multipart.next().await {
        let mut field = item.map_err(|e| AppError::BadRequest(e.to_string()))?;
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let file_name = disposition.get_filename().map(str::to_string);
        let content_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
            if bytes.len() + chunk.len() > MAX_PART_BYTES {
                return Err(AppError::PayloadTooLarge(MAX_PART_BYTES));
            }
            bytes.extend_from_slice(&chunk);
        }

        if name.is_empty() {
            continue;
        }
        if file_name.is_some() {
            // Browsers send an empty part for an untouched file input.
            if bytes.is_empty() {
                continue;
            }
            files.insert(
                name,
                UploadedFile {
                    file_name,
                    content_type: content_type.unwrap_or_default(),
                    bytes,
                },
            );
        } else {
            let text = String::from_utf8(bytes)
                .map_err(|_| AppError::BadRequest(format!("Field '{name}' is not UTF-8")))?;
            insert_path(&mut fields, &key_path(&name), text);
        }
    }

    let document = fields
        .into_iter()
        .map(|(k, v)| (k, listify(v)))
        .collect();
    Ok((Value::Object(document), files))
}

/// `social_links[0][url]` → `["social_links", "0", "url"]`, `tags[]` → `["tags", ""]`.
fn key_path(name: &str) -> Vec<String> {
    match name.split_once('[') {
        None => vec![name.to_string()],
        Some((head, rest)) => {
            let mut path = vec![head.to_string()];
            path.extend(rest.trim_end_matches(']').split("][").map(str::to_string));
            path
        }
    }
}

/// An empty segment appends: it takes the next index in its parent.
fn insert_path(target: &mut Map<String, Value>, path: &[String], value: String) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    let key = if head.is_empty() {
        target.len().to_string()
    } else {
        head.clone()
    };

    if rest.is_empty() {
        target.insert(key, Value::String(value));
        return;
    }

    let child = target
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    if let Value::Object(map) = child {
        insert_path(map, rest, value);
    }
}

/// Objects keyed only by indices become arrays in index order.
fn listify(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let indexed = !map.is_empty() && map.keys().all(|k| k.parse::<usize>().is_ok());
            if indexed {
                let mut items: Vec<(usize, Value)> = map
                    .into_iter()
                    .filter_map(|(k, v)| Some((k.parse().ok()?, listify(v))))
                    .collect();
                items.sort_by_key(|(index, _)| *index);
                Value::Array(items.into_iter().map(|(_, v)| v).collect())
            } else {
                Value::Object(map.into_iter().map(|(k, v)| (k, listify(v))).collect())
            }
        }
        other => other,
    }
}
