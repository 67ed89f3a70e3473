//! HTTP request metrics middleware
//!
//! - `http_requests_total`: counter, labels `method`, `path`, `status`
//! - `http_request_duration_seconds`: histogram, labels `method`, `path`
//! - `http_requests_in_flight`: gauge
//!
//! `path` is the matched route template, so `/parking-slots/{id}` is one
//! series regardless of the id. Requests that match no route share the
//! `unmatched` label to keep cardinality bounded.

use std::time::Instant;

use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response};

const UNMATCHED: &str = "unmatched";

struct RouteLabels {
    method: String,
    path: String,
}

impl RouteLabels {
    fn of(request: &Request<Body>) -> Self {
        Self {
            method: request.method().as_str().to_owned(),
            path: request
                .extensions()
                .get::<MatchedPath>()
                .map_or_else(|| UNMATCHED.to_owned(), |mp| mp.as_str().to_owned()),
        }
    }
}

pub async fn http_metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let labels = RouteLabels::of(&request);
    let in_flight = metrics::gauge!("http_requests_in_flight");

    in_flight.increment(1.0);
    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();
    in_flight.decrement(1.0);

    metrics::counter!(
        "http_requests_total",
        "method" => labels.method.clone(),
        "path" => labels.path.clone(),
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => labels.method,
        "path" => labels.path
    )
    .record(elapsed);

    response
}
