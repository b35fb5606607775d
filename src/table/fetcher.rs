//! Pagination/Streaming Fetcher
//!
//! Drives repeated provider calls by following continuation tokens. Pages are
//! produced lazily: nothing is fetched until the stream is polled, and
//! dropping the stream stops the token chain.

use super::transform::project;
use crate::aws::{Service, Transport};
use crate::error::{Error, Result, TransportError};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde_json::{Map, Value};
use std::sync::Arc;

/// How to pull items out of one response page
#[derive(Debug, Clone, Copy)]
pub enum PageItems {
    /// Dotted path to an array of items
    Path(&'static str),
    /// Dotted path to an array of JSON-encoded strings (Price List entries)
    EncodedPath(&'static str),
    /// Custom page flattening
    Map(fn(&Value) -> Vec<Value>),
}

/// A paginated provider call
#[derive(Debug, Clone)]
pub struct ListCall {
    pub service: Service,
    pub operation: &'static str,
    pub items: PageItems,
    /// Request field the continuation token is written to
    pub request_token: &'static str,
    /// Response path the continuation token is read from
    pub response_token: &'static str,
}

/// Result of one provider call
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

/// Consumer decision after each emitted item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    Continue,
    Stop,
}

impl ListCall {
    /// Split a response into items and the continuation token
    pub fn page(&self, response: &Value) -> Result<Page> {
        let items = match self.items {
            PageItems::Path(path) => array_at(response, path),
            PageItems::EncodedPath(path) => array_at(response, path)
                .into_iter()
                .map(|entry| self.decode_entry(entry))
                .collect::<Result<Vec<_>>>()?,
            PageItems::Map(mapper) => mapper(response),
        };

        let next_token = project(response, self.response_token)
            .as_str()
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string());

        Ok(Page { items, next_token })
    }

    fn decode_entry(&self, entry: Value) -> Result<Value> {
        match entry {
            Value::String(text) => serde_json::from_str(&text).map_err(|e| {
                Error::Transport(TransportError::new(
                    self.service.name(),
                    self.operation,
                    format!("malformed encoded item: {}", e),
                ))
            }),
            other => Ok(other),
        }
    }
}

fn array_at(response: &Value, path: &str) -> Vec<Value> {
    project(response, path).as_array().cloned().unwrap_or_default()
}

fn set_token(params: &mut Value, field: &str, token: &str) {
    if !params.is_object() {
        *params = Value::Object(Map::new());
    }
    if let Value::Object(map) = params {
        map.insert(field.to_string(), Value::String(token.to_string()));
    }
}

/// Fetch one page and prepare the request for the next one
async fn fetch_page(
    transport: &dyn Transport,
    call: &ListCall,
    mut params: Value,
) -> Result<(Page, Option<Value>)> {
    let response = transport.call(call.service, call.operation, &params).await?;
    let page = call.page(&response)?;

    tracing::debug!(
        "{}.{}: {} items, more={}",
        call.service,
        call.operation,
        page.items.len(),
        page.next_token.is_some()
    );

    let next = match &page.next_token {
        Some(token) => {
            set_token(&mut params, call.request_token, token);
            Some(params)
        }
        None => None,
    };

    Ok((page, next))
}

/// Lazy stream of pages.
///
/// Ends after the first page without a continuation token, or after the
/// first error (which is yielded once, unchanged). Empty pages do not end it.
pub fn paginate(
    transport: Arc<dyn Transport>,
    call: ListCall,
    params: Value,
) -> BoxStream<'static, Result<Page>> {
    stream::try_unfold(Some(params), move |state| {
        let transport = Arc::clone(&transport);
        let call = call.clone();
        async move {
            match state {
                None => Ok(None),
                Some(params) => fetch_page(transport.as_ref(), &call, params)
                    .await
                    .map(Some),
            }
        }
    })
    .boxed()
}

/// Lazy stream of items across all pages, in page order
pub fn paginate_items(
    transport: Arc<dyn Transport>,
    call: ListCall,
    params: Value,
) -> BoxStream<'static, Result<Value>> {
    paginate(transport, call, params)
        .map_ok(|page| stream::iter(page.items.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
}

/// Push every item to `emit` until the pages run out or `emit` says stop.
///
/// Returns the number of items emitted, counting the item that returned
/// [`Emit::Stop`]. No further provider call is made after that item.
pub async fn stream_items<F>(
    transport: Arc<dyn Transport>,
    call: ListCall,
    params: Value,
    mut emit: F,
) -> Result<usize>
where
    F: FnMut(Value) -> Emit,
{
    let mut items = paginate_items(transport, call, params);
    let mut emitted = 0;

    while let Some(item) = items.next().await {
        let item = item?;
        emitted += 1;
        if emit(item) == Emit::Stop {
            break;
        }
    }

    Ok(emitted)
}
