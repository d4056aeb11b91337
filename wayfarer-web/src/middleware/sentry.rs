//! Middlewares for using Sentry in Wayfarer.

use crate::errors::HandlerError;
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    error::Error as ActixError,
};
use futures_util::future::LocalBoxFuture;
use sentry::{integrations::backtrace::parse_stacktrace, protocol::Event};
use std::{
    error::Error as StdError,
    fmt,
    future::{ready, Ready},
    task::{Context, Poll},
};

/// Reports handler errors of failed requests to Sentry.
#[derive(Debug, Default)]
pub struct Sentry;

impl<S> Transform<S, ServiceRequest> for Sentry
where
    S: Service<ServiceRequest, Response = ServiceResponse> + 'static,
    S::Future: 'static,
    S::Error: fmt::Debug,
{
    type Response = ServiceResponse;
    type Error = ActixError;
    type InitError = ();
    type Transform = SentryMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SentryMiddleware { service }))
    }
}

/// Middleware to catch events from request handlers and send them to Sentry.
#[derive(Debug)]
pub struct SentryMiddleware<S> {
    /// The wrapped service
    service: S,
}

impl<S> SentryMiddleware<S> {
    /// Build a Sentry event for a `HandlerError`, including its backtrace.
    ///
    /// `sentry::event_from_error` has no access to the backtrace captured in
    /// `HandlerError`, so the chain of exceptions is built here instead.
    pub fn event_from_error(err: &HandlerError) -> Event<'static> {
        let mut exceptions = vec![Self::exception_from_error_with_backtrace(err)];

        let mut source = err.source();
        while let Some(err) = source {
            let exception = match err.downcast_ref() {
                Some(err) => Self::exception_from_error_with_backtrace(err),
                None => Self::exception_from_error(err),
            };
            exceptions.push(exception);
            source = err.source();
        }

        exceptions.reverse();
        Event {
            exception: exceptions.into(),
            level: sentry::protocol::Level::Error,
            ..Default::default()
        }
    }

    /// An exception for a `HandlerError`, with its stack trace.
    fn exception_from_error_with_backtrace(err: &HandlerError) -> sentry::protocol::Exception {
        let mut exception = Self::exception_from_error(err);
        // Alternate debug formatting includes the frame addresses.
        let bt = format!("{:#?}", err.backtrace);
        exception.stacktrace = parse_stacktrace(&bt);
        exception
    }

    /// An exception for any error, typed by its debug representation.
    fn exception_from_error<E: StdError + ?Sized>(err: &E) -> sentry::protocol::Exception {
        let dbg = format!("{:?}", err);
        sentry::protocol::Exception {
            ty: sentry::parse_type_from_debug(&dbg).to_owned(),
            value: Some(err.to_string()),
            ..Default::default()
        }
    }
}

impl<S> Service<ServiceRequest> for SentryMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse>,
    S::Future: 'static,
    S::Error: fmt::Debug,
{
    type Response = ServiceResponse;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx).map_err(|error| {
            tracing::error!(?error, "Error polling service");
            HandlerError::internal().into()
        })
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let hub = sentry::Hub::current();
        let transaction = match req.match_name() {
            Some(name) => Some(name.to_string()),
            None => req.match_pattern(),
        };
        hub.configure_scope(|scope| {
            scope.set_transaction(transaction.as_deref());
        });

        let fut = self.service.call(req);

        Box::pin(async move {
            let response = fut.await.map_err(|error| {
                tracing::error!(?error, "handler error");
                HandlerError::internal()
            })?;

            // Only server errors are reported. Client errors such as a missing
            // document are expected.
            if response.status().is_server_error() {
                if let Some(handler_error) = response
                    .response()
                    .error()
                    .and_then(|error| error.as_error::<HandlerError>())
                {
                    tracing::trace!(?handler_error, "Reporting error to Sentry");
                    hub.capture_event(Self::event_from_error(handler_error));
                }
            }

            Ok(response)
        })
    }
}
