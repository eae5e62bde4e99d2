//! Parameter extraction from raw request parts.
//!
//! Sources merge in order query string, form body, JSON body; later sources
//! override earlier ones on key collisions. Form bodies may be url-encoded
//! or `multipart/form-data`; file parts of a multipart form are not params.

use crate::domain::error::ParamsError;
use crate::domain::handler::Params;
use bytes::Bytes;
use futures::{future, stream};
use serde_json::Value;
use std::convert::Infallible;
use url::form_urlencoded;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";

/// Merge query string and body into one parameter map
pub fn params_from_parts(
    query: Option<&str>,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<Params, ParamsError> {
    let mut params = Params::new();

    if let Some(query) = query {
        merge_form(&mut params, query.as_bytes());
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(params);
    }

    let content_type = content_type.unwrap_or_default().trim();
    let media_type = content_type.to_ascii_lowercase();

    if media_type.starts_with(FORM_CONTENT_TYPE) {
        merge_form(&mut params, body);
    } else if media_type.starts_with(MULTIPART_CONTENT_TYPE) {
        let boundary = multer::parse_boundary(content_type)?;
        // The body is already in memory, so the multipart reader never waits.
        futures::executor::block_on(merge_multipart(&mut params, body, boundary))?;
    } else {
        match serde_json::from_slice::<Value>(body)? {
            Value::Object(map) => params.extend(map),
            _ => return Err(ParamsError::NotAnObject),
        }
    }

    Ok(params)
}

async fn merge_multipart(
    params: &mut Params,
    body: &[u8],
    boundary: String,
) -> Result<(), ParamsError> {
    let body = Bytes::copy_from_slice(body);
    let chunks = stream::once(future::ready(Ok::<_, Infallible>(body)));
    let mut multipart = multer::Multipart::new(chunks, boundary);

    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field.text().await?;
        params.insert(name, Value::String(value));
    }
    Ok(())
}

fn merge_form(params: &mut Params, raw: &[u8]) {
    for (key, value) in form_urlencoded::parse(raw) {
        params.insert(key.into_owned(), Value::String(value.into_owned()));
    }
}

/// Remove a reserved key and return its value as text.
///
/// A missing or null key yields the empty string.
pub fn take_reserved(params: &mut Params, key: &str) -> String {
    match params.remove(key) {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
