use std::error::Error;
use std::time::Instant;

use billing_core::ErrorResponse;
use chrono::Utc;
use log::{debug, error, info, warn};
use reqwest::{Method, Response, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;

use crate::diagnostics::ExchangeRecord;
use crate::error::{BillingError, ServiceError};

pub const REQUEST_ID_HEADER: &str = "PayPal-Request-Id";
pub const DEBUG_ID_HEADER: &str = "Paypal-Debug-Id";

/// Executes an authenticated API request.
/// Note: Retry logic is handled by reqwest-retry middleware at the client level.
pub async fn execute_request<T: Serialize + ?Sized>(
    client: &ClientWithMiddleware,
    method: Method,
    url: &str,
    access_token: &str,
    query: &[(&str, String)],
    json_body: Option<&T>,
    request_id: Option<&str>,
) -> Result<Response, BillingError> {
    let mut request_builder = client
        .request(method.clone(), url)
        .bearer_auth(access_token)
        .header("Accept", "application/json");

    if !query.is_empty() {
        request_builder = request_builder.query(query);
    }
    if let Some(request_id) = request_id {
        request_builder = request_builder.header(REQUEST_ID_HEADER, request_id);
    }
    if let Some(body) = json_body {
        // .json() also sets Content-Type: application/json
        request_builder = request_builder.json(body);
    }

    info!("Sending {} request to {}", method.as_str(), url);
    if let Some(request_id) = request_id {
        debug!("Request id: {}", request_id);
    }

    let start_time = Instant::now();

    match request_builder.send().await {
        Ok(resp) => {
            info!(
                "Got response from {} after {:?} with status {}",
                url,
                start_time.elapsed(),
                resp.status()
            );
            if let Some(debug_id) = debug_id(&resp) {
                debug!("Response debug id: {}", debug_id);
            }
            Ok(resp)
        }
        Err(e) => {
            error!("Failed HTTP request to {}: {}", url, e);
            log_error_details(&e);
            Err(BillingError::Http(e))
        }
    }
}

fn log_error_details(e: &reqwest_middleware::Error) {
    error!("Error details: {:?}", e);
    if let Some(source) = e.source() {
        error!("Error source: {:?}", source);
    }
    if let reqwest_middleware::Error::Reqwest(e) = e {
        if e.is_timeout() {
            error!("Request timed out");
        }
        if e.is_connect() {
            error!("Connection error");
        }
        if e.is_body() {
            error!("Body error");
        }
        if e.is_decode() {
            error!("Decode error");
        }
    }
}

/// Diagnostics entry for a finished exchange.
pub fn exchange_record(
    method: &Method,
    url: &str,
    started: Instant,
    outcome: &Result<Response, BillingError>,
) -> ExchangeRecord {
    let (status, debug_id, error) = match outcome {
        Ok(resp) => (Some(resp.status().as_u16()), debug_id(resp), None),
        Err(e) => (None, None, Some(e.to_string())),
    };
    ExchangeRecord {
        method: method.to_string(),
        url: url.to_string(),
        status,
        debug_id,
        elapsed: started.elapsed(),
        error,
        at: Utc::now(),
    }
}

/// Vendor debug id from the response headers.
pub fn debug_id(response: &Response) -> Option<String> {
    response
        .headers()
        .get(DEBUG_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Turns a non-success response into the matching error. `resource_id` is
/// reported in `NotFound` when the service answers 404.
pub async fn error_from_response(response: Response, resource_id: Option<&str>) -> BillingError {
    let status = response.status();
    let debug_id = debug_id(&response);
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!("Failed to read error body: {}", e);
            String::new()
        }
    };

    match (status, resource_id) {
        (StatusCode::PROXY_AUTHENTICATION_REQUIRED, _) => BillingError::ProxyAuthRequired,
        (StatusCode::NOT_FOUND, Some(resource_id)) => {
            info!("Resource {} not found: {}", resource_id, body);
            let debug_id = debug_id.or_else(|| {
                serde_json::from_str::<ErrorResponse>(&body)
                    .ok()
                    .and_then(|parsed| parsed.debug_id)
            });
            BillingError::NotFound {
                resource_id: resource_id.to_string(),
                debug_id,
            }
        }
        _ => {
            let err = ServiceError::from_body(status.as_u16(), body, debug_id);
            error!("Request rejected: {}", err);
            BillingError::Service(err)
        }
    }
}
