//! End-to-end correlation tests against the HTTP service.

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use correlog::http::routes;
use correlog::logging::{FieldValue, Level, ROOT};
use correlog::Context;
use tower::{service_fn, Layer, ServiceBuilder, ServiceExt};
use tower_http::catch_panic::CatchPanicLayer;

mod common;

#[tokio::test]
async fn test_log_inside_request_carries_ids() {
    let (telemetry, sink) = common::telemetry(&common::test_config());
    let (addr, shutdown) = common::start_server(&telemetry).await;

    let response = reqwest::get(format!("http://{addr}/logging/info?message=hello"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "null");

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.level, Level::Info);
    assert_eq!(record.message, "hello");
    assert_eq!(&*record.logger, ROOT);
    assert_eq!(record.trace_id.unwrap().to_string().len(), 32);
    assert_eq!(record.span_id.unwrap().to_string().len(), 16);
    assert_eq!(record.service.as_deref(), Some("correlog-samples"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_requests_get_disjoint_traces() {
    let (telemetry, sink) = common::telemetry(&common::test_config());
    let (addr, shutdown) = common::start_server(&telemetry).await;
    let client = reqwest::Client::new();

    let requests = (0..20).map(|i| {
        let client = client.clone();
        async move {
            client
                .get(format!("http://{addr}/logging/debug?message=req-{i}"))
                .send()
                .await
                .unwrap()
                .status()
        }
    });
    for status in futures_util::future::join_all(requests).await {
        assert_eq!(status, 200);
    }

    let records = sink.records();
    assert_eq!(records.len(), 20);
    let traces: HashSet<_> = records.iter().map(|r| r.trace_id.unwrap()).collect();
    let spans: HashSet<_> = records.iter().map(|r| r.span_id.unwrap()).collect();
    assert_eq!(traces.len(), 20);
    assert_eq!(spans.len(), 20);

    shutdown.trigger();
}

#[tokio::test]
async fn test_inbound_traceparent_is_honoured() {
    let (telemetry, sink) = common::telemetry(&common::test_config());
    let (addr, shutdown) = common::start_server(&telemetry).await;

    reqwest::Client::new()
        .get(format!("http://{addr}/logging/error"))
        .header(
            "traceparent",
            "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01",
        )
        .send()
        .await
        .unwrap();

    let record = &sink.records()[0];
    assert_eq!(
        record.trace_id.unwrap().to_string(),
        "0af7651916cd43dd8448eb211c80319c"
    );
    assert_ne!(record.span_id.unwrap().to_string(), "b7ad6b7169203331");

    shutdown.trigger();
}

#[tokio::test]
async fn test_error_route_without_middleware_has_no_ids() {
    let (telemetry, sink) = common::telemetry(&common::test_config());
    let app = routes::router(telemetry.logger(ROOT));

    let response = app
        .oneshot(Request::get("/logging/error").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, Level::Error);
    assert_eq!(records[0].message, "error message");
    assert!(records[0].trace_id.is_none());
    assert!(records[0].span_id.is_none());
}

#[tokio::test]
async fn test_panicking_handler_logged_once_with_ids() {
    let (telemetry, sink) = common::telemetry(&common::test_config());
    let (addr, shutdown) = common::start_server(&telemetry).await;

    let response = reqwest::get(format!("http://{addr}/errors/stacktrace"))
        .await
        .unwrap();
    assert_eq!(response.status(), 500);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, Level::Error);
    assert_eq!(
        records[0].field("exception"),
        Some(&FieldValue::Str("attempt to divide by zero".to_string()))
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_panic_record_carries_the_handlers_span() {
    let (telemetry, sink) = common::telemetry(&common::test_config());
    let seen = Arc::new(Mutex::new(None));
    let handler_seen = seen.clone();
    let service = ServiceBuilder::new()
        .layer(CatchPanicLayer::new())
        .layer(telemetry.request_span_layer())
        .service(service_fn(move |_req: Request<Body>| {
            let seen = handler_seen.clone();
            async move {
                let span = Context::current().active_span();
                *seen.lock().unwrap() = span;
                if span.is_some() {
                    panic!("attempt to divide by zero");
                }
                Ok::<_, Infallible>(Response::new(Body::empty()))
            }
        }));

    let response = service
        .oneshot(Request::get("/errors/stacktrace").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let span = seen.lock().unwrap().expect("handler ran inside a span");
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].trace_id, Some(span.trace_id));
    assert_eq!(records[0].span_id, Some(span.span_id));
    assert_eq!(records[0].service.as_deref(), Some("correlog-samples"));
}

#[tokio::test]
async fn test_handler_error_passes_through_unchanged() {
    #[derive(Debug, PartialEq)]
    struct AppError(&'static str);

    impl std::fmt::Display for AppError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "app failed: {}", self.0)
        }
    }

    let (telemetry, sink) = common::telemetry(&common::test_config());
    let seen = Arc::new(Mutex::new(None));
    let handler_seen = seen.clone();
    let service = telemetry
        .request_span_layer()
        .layer(service_fn(move |_req: Request<Body>| {
            let seen = handler_seen.clone();
            async move {
                *seen.lock().unwrap() = Context::current().active_span();
                Err::<Response<Body>, _>(AppError("db"))
            }
        }));
    let error = service
        .oneshot(Request::get("/orders").body(Body::empty()).unwrap())
        .await
        .unwrap_err();
    assert_eq!(error, AppError("db"));

    let span = seen.lock().unwrap().expect("handler ran inside a span");
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, Level::Error);
    assert_eq!(records[0].trace_id, Some(span.trace_id));
    assert_eq!(records[0].span_id, Some(span.span_id));
    assert_eq!(
        records[0].field("exception"),
        Some(&FieldValue::Str("app failed: db".to_string()))
    );
}

#[tokio::test]
async fn test_healthz_is_not_traced() {
    let (telemetry, sink) = common::telemetry(&common::test_config());
    let service = telemetry
        .request_span_layer()
        .layer(service_fn(|req: Request<Body>| async move {
            assert!(req.extensions().get::<Context>().is_none());
            Ok::<_, Infallible>(Response::new(Body::from("ok")))
        }));

    let response = service
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(sink.is_empty());
}
