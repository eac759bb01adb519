use actix_web::{
    body::{BodySize, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderMap},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    time::Instant,
};
use tracing::info;

use super::capture::CapturedError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Field order of the access log line.
pub const FIELD_NAMES: [&str; 13] = [
    "id",
    "real_ip",
    "method",
    "status",
    "proto",
    "host",
    "uri",
    "path",
    "referer",
    "agent",
    "latency",
    "bytes_in",
    "bytes_out",
];

/// Resolved values for one access log line, one per [`FIELD_NAMES`] entry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    values: [String; 13],
}

impl AccessRecord {
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        if let Some(index) = FIELD_NAMES.iter().position(|field| *field == name) {
            self.values[index] = value.into();
        }
    }

    /// Value of `name`, or `None` when empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        let index = FIELD_NAMES.iter().position(|field| *field == name)?;
        Some(self.values[index].as_str()).filter(|value| !value.is_empty())
    }

    /// Non-empty fields in log order.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        FIELD_NAMES
            .iter()
            .zip(self.values.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| (*name, value.as_str()))
            .collect()
    }

    fn log(&self, error: Option<&str>) {
        info!(
            id = self.get("id"),
            real_ip = self.get("real_ip"),
            method = self.get("method"),
            status = self.get("status"),
            proto = self.get("proto"),
            host = self.get("host"),
            uri = self.get("uri"),
            path = self.get("path"),
            referer = self.get("referer"),
            agent = self.get("agent"),
            latency = self.get("latency"),
            bytes_in = self.get("bytes_in"),
            bytes_out = self.get("bytes_out"),
            error = error,
            "new request"
        );
    }
}

fn header_value(headers: &HeaderMap, name: impl header::AsHeaderName) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// One structured log line per request.
pub struct AccessLog;

impl<S, B> Transform<S, ServiceRequest> for AccessLog
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AccessLogMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AccessLogMiddleware { service }))
    }
}

pub struct AccessLogMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AccessLogMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();

        let mut record = AccessRecord::default();
        {
            let headers = req.headers();
            let info = req.connection_info();
            record.set("id", header_value(headers, REQUEST_ID_HEADER));
            record.set("real_ip", info.realip_remote_addr().unwrap_or_default());
            record.set("method", req.method().as_str());
            record.set("proto", format!("{:?}", req.version()));
            record.set("host", info.host());
            record.set(
                "uri",
                req.uri()
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or_default(),
            );
            let path = req.path();
            record.set("path", if path.is_empty() { "/" } else { path });
            record.set("referer", header_value(headers, header::REFERER));
            record.set("agent", header_value(headers, header::USER_AGENT));
            record.set("bytes_in", header_value(headers, header::CONTENT_LENGTH));
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            record.set("latency", format!("{:?}", start_time.elapsed()));

            match &result {
                Ok(response) => {
                    if record.get("id").is_none() {
                        record.set("id", header_value(response.headers(), REQUEST_ID_HEADER));
                    }
                    record.set("status", response.status().as_u16().to_string());
                    if let BodySize::Sized(size) = response.response().body().size() {
                        record.set("bytes_out", size.to_string());
                    }

                    let error = response
                        .response()
                        .error()
                        .map(|err| err.to_string())
                        .or_else(|| {
                            response
                                .response()
                                .extensions()
                                .get::<CapturedError>()
                                .map(|captured| captured.0.clone())
                        });
                    record.log(error.as_deref());
                }
                Err(err) => {
                    let status = err.as_response_error().status_code();
                    record.set("status", status.as_u16().to_string());
                    record.log(Some(&err.to_string()));
                }
            }

            result
        })
    }
}
