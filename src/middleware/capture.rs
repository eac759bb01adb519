use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    Error, HttpResponse,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::capture::{classify_actix, declined, Capture, Classified, RenderFailure};

/// Text of the error a response was generated from, kept in the response
/// extensions so outer middleware can still see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError(pub String);

/// Routes every error from the wrapped service through [`Capture`].
///
/// Covers errors returned by handlers as well as extractor and inner
/// middleware failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureErrors {
    capture: Capture,
}

impl CaptureErrors {
    pub fn new(capture: Capture) -> Self {
        Self { capture }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CaptureErrors
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = CaptureErrorsMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CaptureErrorsMiddleware {
            service,
            capture: self.capture,
        }))
    }
}

pub struct CaptureErrorsMiddleware<S> {
    service: S,
    capture: Capture,
}

impl<S, B> Service<ServiceRequest> for CaptureErrorsMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let capture = self.capture;
        let fut = self.service.call(req);

        Box::pin(async move {
            match fut.await {
                Ok(res) => {
                    let Some(err) = res.response().error() else {
                        return Ok(res.map_into_left_body());
                    };
                    let cause = err.to_string();

                    // Self-describing errors were rendered by their
                    // `ResponseError` impl already; keep that response.
                    if matches!(classify_actix(err), Classified::Delegate(_)) {
                        if let Some(failure) = res.response().extensions().get::<RenderFailure>() {
                            declined(&cause, &failure.0);
                        }
                        let mut res = res;
                        res.response_mut()
                            .extensions_mut()
                            .insert(CapturedError(cause));
                        return Ok(res.map_into_left_body());
                    }

                    let response = respond(capture, err);
                    Ok(res.into_response(response).map_into_right_body())
                }
                // No request to answer with here; the captured response
                // rides along inside the error instead.
                Err(err) => {
                    let response = respond(capture, &err);
                    Err(InternalError::from_response(err.to_string(), response).into())
                }
            }
        })
    }
}

fn respond(capture: Capture, err: &Error) -> HttpResponse {
    let mut response = capture.response_for(err);
    response
        .extensions_mut()
        .insert(CapturedError(err.to_string()));
    response
}
