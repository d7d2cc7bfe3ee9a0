//! The application handler: one payload for every request.

use std::convert::Infallible;
use std::future::{ready, Ready};

use bytes::Bytes;
use http_body_util::Full;
use hyper::service::Service;
use hyper::{Request, Response};

use crate::observability::metrics;

/// Answers every request with the same bytes.
///
/// Method, path, headers and body are ignored. Cloning shares the payload.
#[derive(Debug, Clone)]
pub struct StaticResponder {
    payload: Bytes,
}

impl StaticResponder {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn respond(&self) -> Response<Full<Bytes>> {
        Response::new(Full::new(self.payload.clone()))
    }
}

impl<B> Service<Request<B>> for StaticResponder {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn call(&self, _request: Request<B>) -> Self::Future {
        metrics::record_request();
        ready(Ok(self.respond()))
    }
}
