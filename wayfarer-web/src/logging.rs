//! Loggers for the request/response cycle.

use actix_web::{
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
    HttpMessage,
};
use std::borrow::Cow;
use tracing::Span;
use tracing_actix_web::{RequestId, RootSpanBuilder};

/// A root span builder for tracing_actix_web to customize the extra fields we
/// log with requests, and to log an event when requests end.
pub struct WayfarerRootSpanBuilder;

impl RootSpanBuilder for WayfarerRootSpanBuilder {
    fn on_request_start(request: &ServiceRequest) -> Span {
        let http_route: Cow<'static, str> = request
            .match_pattern()
            .map(Into::into)
            .unwrap_or_else(|| "default".into());
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(ToString::to_string)
            .unwrap_or_default();

        tracing::info_span!(
            "HTTP request",
            http.method = %request.method().as_str(),
            http.route = %http_route,
            http.target = %request.uri().path_and_query().map(|p| p.as_str()).unwrap_or(""),
            http.status_code = tracing::field::Empty,
            request_id = %request_id,
            exception.message = tracing::field::Empty,
            exception.details = tracing::field::Empty,
        )
    }

    fn on_request_end<B>(span: Span, outcome: &Result<ServiceResponse<B>, actix_web::Error>) {
        let status = match &outcome {
            Ok(response) => match response.response().error() {
                Some(error) => handle_error(&span, error),
                None => response.status(),
            },
            Err(error) => handle_error(&span, error),
        };
        span.record("http.status_code", status.as_u16());

        match status.as_u16() {
            status_code if (100..400).contains(&status_code) => tracing::info!("Request success"),
            status_code if (400..500).contains(&status_code) => {
                tracing::warn!("Request client error")
            }
            status_code if (500..600).contains(&status_code) => {
                tracing::error!("Request server error")
            }
            status_code => {
                tracing::error!(%status_code, "Request ended with unknown status code {}", status_code);
            }
        };
    }
}

/// Annotate the root request span with information about a request error.
fn handle_error(span: &Span, error: &actix_web::Error) -> StatusCode {
    let response_error = error.as_response_error();
    span.record(
        "exception.message",
        &tracing::field::display(response_error),
    );
    span.record("exception.details", &tracing::field::debug(response_error));
    response_error.status_code()
}

#[cfg(test)]
mod tests {
    use super::WayfarerRootSpanBuilder;
    use crate::errors::HandlerError;
    use actix_web::{test, web, App, HttpResponse};
    use serde_json::Value;
    use std::{
        io,
        sync::{Arc, Mutex},
    };
    use tracing_actix_web::TracingLogger;

    /// Collects the JSON lines written by a test subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn events(&self) -> Vec<Value> {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf)
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| serde_json::from_str(line).expect("bad JSON in log line"))
                .collect()
        }

        fn has(&self, level: &str, message: &str) -> bool {
            self.events()
                .iter()
                .any(|event| event["level"] == level && event["fields"]["message"] == message)
        }
    }

    /// Send a GET for `path` through the request logger, and return what was logged.
    async fn logs_for(path: &str) -> CapturedLogs {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let app = test::init_service(
            App::new()
                .wrap(TracingLogger::<WayfarerRootSpanBuilder>::new())
                .route("/ok", web::get().to(|| async { HttpResponse::Ok().finish() }))
                .route(
                    "/broken",
                    web::get().to(|| async { Err::<HttpResponse, _>(HandlerError::internal()) }),
                ),
        )
        .await;
        test::call_service(&app, test::TestRequest::get().uri(path).to_request()).await;

        logs
    }

    #[actix_web::test]
    async fn successful_requests_are_logged_at_info() {
        let logs = logs_for("/ok").await;
        assert!(logs.has("INFO", "Request success"));
    }

    #[actix_web::test]
    async fn client_errors_are_logged_as_warnings() {
        let logs = logs_for("/missing").await;
        assert!(logs.has("WARN", "Request client error"));
        assert!(!logs.has("INFO", "Request success"));
    }

    #[actix_web::test]
    async fn server_errors_are_logged_as_errors() {
        let logs = logs_for("/broken").await;
        assert!(logs.has("ERROR", "Request server error"));
    }
}
