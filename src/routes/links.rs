//! `/go` and `/links` route logic.

use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use serde::Deserialize;

use crate::core::{HttpError, Request, Result};
use crate::router::{Reply, RouteHandler};
use crate::store::{Link, LinkStore};

const DB_FAILURE: &str = "Failed to open database.";
const INVALID_PARAMS: &str = "Invalid parameters";

/// `GET /go?key=<k>`: redirect to the stored URL.
pub struct GoRoute {
    store: Arc<dyn LinkStore>,
}

impl GoRoute {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RouteHandler for GoRoute {
    async fn call(&self, req: Request) -> Result<Reply> {
        let key = req.query_param("key").unwrap_or_default();
        if key.is_empty() {
            return Err(HttpError::not_found("requires key"));
        }

        match self.store.find(&key).await {
            Ok(Some(link)) => Ok(Reply::redirect(link.url)),
            Ok(None) => Err(HttpError::not_found("Not found")),
            Err(e) => Err(HttpError::internal(DB_FAILURE).with_cause(e)),
        }
    }
}

/// Body of `POST /links`. Field names match in any letter case (`Key`,
/// `key`, `KEY`); unknown fields are ignored and missing ones stay empty.
#[derive(Debug, Default, Deserialize)]
#[serde(try_from = "serde_json::Map<String, serde_json::Value>")]
struct LinkParams {
    key: String,
    url: String,
}

impl TryFrom<serde_json::Map<String, serde_json::Value>> for LinkParams {
    type Error = String;

    fn try_from(fields: serde_json::Map<String, serde_json::Value>) -> std::result::Result<Self, String> {
        let mut params = LinkParams::default();
        for (name, value) in fields {
            let slot = if name.eq_ignore_ascii_case("key") {
                &mut params.key
            } else if name.eq_ignore_ascii_case("url") {
                &mut params.url
            } else {
                continue;
            };
            match value {
                serde_json::Value::String(s) => *slot = s,
                serde_json::Value::Null => {}
                other => return Err(format!("field {} must be a string, got {}", name, other)),
            }
        }
        Ok(params)
    }
}

/// `GET /links` lists every link, `POST /links` creates one.
pub struct LinksRoute {
    store: Arc<dyn LinkStore>,
}

impl LinksRoute {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }

    async fn list(&self) -> Result<Reply> {
        let links = self
            .store
            .list(None, 0)
            .await
            .map_err(|e| HttpError::internal(DB_FAILURE).with_cause(e))?;
        Ok(Reply::json(&links))
    }

    async fn create(&self, req: Request) -> Result<Reply> {
        let invalid = || HttpError::bad_request(INVALID_PARAMS).with_body(req.body().clone());

        let params: LinkParams = req.json().map_err(|e| invalid().with_cause(e))?;
        if params.key.is_empty() || params.url.is_empty() {
            return Err(invalid());
        }

        self.store
            .insert(Link::new(params.key, params.url))
            .await
            .map_err(|e| invalid().with_cause(e))?;

        Ok(Reply::empty_object())
    }
}

#[async_trait]
impl RouteHandler for LinksRoute {
    async fn call(&self, req: Request) -> Result<Reply> {
        match *req.method() {
            Method::GET => self.list().await,
            Method::POST => self.create(req).await,
            _ => Err(HttpError::method_not_allowed()),
        }
    }
}
