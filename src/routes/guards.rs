//! Pre-processors guarding the link routes.

use async_trait::async_trait;
use http::Method;

use crate::core::{HttpError, Request, Result};
use crate::router::{ConfigKey, PreProcessor};

/// Rejects requests whose method is not listed with 405.
#[derive(Clone, Debug)]
pub struct AllowMethods {
    methods: Vec<Method>,
}

impl AllowMethods {
    pub fn new(methods: impl IntoIterator<Item = Method>) -> Self {
        Self {
            methods: methods.into_iter().collect(),
        }
    }
}

#[async_trait]
impl PreProcessor for AllowMethods {
    fn name(&self) -> &'static str {
        "allow_methods"
    }

    async fn before(&self, req: &mut Request) -> Result<()> {
        if self.methods.contains(req.method()) {
            Ok(())
        } else {
            Err(HttpError::method_not_allowed())
        }
    }
}

/// Requires the configured Basic credentials on the listed methods.
///
/// Other methods pass through untouched.
#[derive(Clone, Debug)]
pub struct BasicAuth {
    methods: Vec<Method>,
}

impl BasicAuth {
    pub fn on(methods: impl IntoIterator<Item = Method>) -> Self {
        Self {
            methods: methods.into_iter().collect(),
        }
    }
}

#[async_trait]
impl PreProcessor for BasicAuth {
    fn name(&self) -> &'static str {
        "basic_auth"
    }

    async fn before(&self, req: &mut Request) -> Result<()> {
        if !self.methods.contains(req.method()) {
            return Ok(());
        }

        let config = req
            .value::<ConfigKey>()
            .ok_or_else(|| HttpError::internal("Failed to fetch config"))?;

        match req.basic_auth() {
            Some((user, pass)) if config.application.credentials_match(&user, &pass) => Ok(()),
            _ => Err(HttpError::forbidden("Wrong credentials")),
        }
    }
}
