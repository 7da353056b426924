//! Deployment Verification Module
//!
//! Probes a running dashboard API over HTTP and reports which endpoints
//! answer, whether every monitored location is reporting, and whether the
//! published overall status agrees with the per-location labels it was
//! reduced from.
//!
//! Run against a live deployment with `canal_ice_service --verify <base-url>`.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::locations::LOCATION_REGISTRY;
use crate::model::SafetyStatus;
use crate::safety::overall_status;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub base_url: String,
    pub endpoints: Vec<EndpointVerification>,
    /// `None` when `/api/status` could not be read at all.
    pub status_consistent: Option<bool>,
    pub summary: VerificationSummary,
}

impl VerificationReport {
    /// True when nothing failed outright and the status reduction checks out.
    pub fn passed(&self) -> bool {
        self.summary.failed == 0 && self.status_consistent == Some(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub partial: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointVerification {
    pub path: String,
    pub status: VerificationStatus,
    pub http_status: Option<u16>,
    pub record_count: Option<usize>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

/// Which response shape an endpoint is expected to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Health,
    Latest,
    History,
    Status,
    All,
}

// ============================================================================
// Response Evaluation
// ============================================================================

/// Judges one response body. Pure, so it is testable without a server.
///
/// `location_count` is the number of monitored locations; a `/api/latest` or
/// `/api/status` answer covering fewer of them is a partial success.
pub fn evaluate_response(
    path: &str,
    kind: EndpointKind,
    http_status: u16,
    body: &Value,
    location_count: usize,
) -> EndpointVerification {
    let mut result = EndpointVerification {
        path: path.to_string(),
        status: VerificationStatus::Failed,
        http_status: Some(http_status),
        record_count: None,
        error_message: None,
    };

    if !(200..300).contains(&http_status) {
        result.error_message = Some(
            body.get("error")
                .and_then(|e| e.as_str())
                .map(|e| format!("HTTP {http_status}: {e}"))
                .unwrap_or_else(|| format!("HTTP {http_status}")),
        );
        return result;
    }

    if kind == EndpointKind::Health {
        if body.get("status").and_then(|s| s.as_str()) == Some("healthy") {
            result.status = VerificationStatus::Success;
            if body.pointer("/store/endpoint").and_then(|e| e.as_str()) == Some("missing") {
                result.status = VerificationStatus::PartialSuccess;
                result.error_message = Some("store endpoint not configured".to_string());
            }
        } else {
            result.error_message = Some("health status is not \"healthy\"".to_string());
        }
        return result;
    }

    if body.get("success").and_then(|s| s.as_bool()) != Some(true) {
        result.error_message = Some("response envelope missing success: true".to_string());
        return result;
    }

    let list_key = if kind == EndpointKind::Status { "locations" } else { "data" };
    let Some(items) = body.get(list_key).and_then(|d| d.as_array()) else {
        result.error_message = Some(format!("response has no \"{list_key}\" array"));
        return result;
    };
    result.record_count = Some(items.len());

    let gap = match kind {
        EndpointKind::Latest | EndpointKind::Status => items.len() < location_count,
        EndpointKind::History => items.is_empty(),
        EndpointKind::All | EndpointKind::Health => false,
    };

    if kind == EndpointKind::All {
        let declared = body.get("count").and_then(|c| c.as_u64());
        if declared != Some(items.len() as u64) {
            result.error_message = Some(format!(
                "count {:?} does not match {} records",
                declared,
                items.len()
            ));
            return result;
        }
    }

    if gap {
        result.status = VerificationStatus::PartialSuccess;
        result.error_message = Some(format!(
            "{} of {} locations reporting",
            items.len(),
            if kind == EndpointKind::History { 1 } else { location_count }
        ));
    } else {
        result.status = VerificationStatus::Success;
    }
    result
}

/// Checks that `overallStatus` equals the reduction of the listed labels.
pub fn status_is_consistent(body: &Value) -> Result<bool, String> {
    let overall: SafetyStatus = body
        .get("overallStatus")
        .and_then(|s| s.as_str())
        .ok_or("missing overallStatus")?
        .parse()
        .map_err(|e| format!("{e}"))?;

    let labels = body
        .get("locations")
        .and_then(|l| l.as_array())
        .ok_or("missing locations array")?
        .iter()
        .map(|entry| {
            entry
                .get("safetyStatus")
                .and_then(|s| s.as_str())
                .ok_or_else(|| "location entry without safetyStatus".to_string())
                .and_then(|s| s.parse::<SafetyStatus>().map_err(|e| format!("{e}")))
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(overall_status(labels) == overall)
}

fn summarize(endpoints: &[EndpointVerification]) -> VerificationSummary {
    let count = |s: VerificationStatus| endpoints.iter().filter(|e| e.status == s).count();
    VerificationSummary {
        total: endpoints.len(),
        working: count(VerificationStatus::Success),
        partial: count(VerificationStatus::PartialSuccess),
        failed: count(VerificationStatus::Failed),
    }
}

// ============================================================================
// Live Probing
// ============================================================================

fn fetch_json(client: &reqwest::blocking::Client, url: &str) -> Result<(u16, Value), String> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .timeout(Duration::from_secs(10))
        .send()
        .map_err(|e| format!("Request failed: {e}"))?;
    let status = response.status().as_u16();
    let body = response
        .json::<Value>()
        .map_err(|e| format!("Parse error: {e}"))?;
    Ok((status, body))
}

/// Probes every endpoint of the deployment at `base_url`.
pub fn verify_deployment(client: &reqwest::blocking::Client, base_url: &str) -> VerificationReport {
    let base = base_url.trim_end_matches('/');
    let location_count = LOCATION_REGISTRY.len();

    let mut targets: Vec<(String, EndpointKind)> = vec![
        ("/health".to_string(), EndpointKind::Health),
        ("/api/latest".to_string(), EndpointKind::Latest),
        ("/api/status".to_string(), EndpointKind::Status),
        ("/api/all".to_string(), EndpointKind::All),
    ];
    targets.extend(
        LOCATION_REGISTRY
            .iter()
            .map(|l| (format!("/api/history/{}", l.key), EndpointKind::History)),
    );

    let mut endpoints = Vec::with_capacity(targets.len());
    let mut status_consistent = None;

    for (path, kind) in targets {
        let url = format!("{base}{path}");
        match fetch_json(client, &url) {
            Ok((http_status, body)) => {
                if kind == EndpointKind::Status && (200..300).contains(&http_status) {
                    status_consistent = status_is_consistent(&body).ok();
                }
                endpoints.push(evaluate_response(&path, kind, http_status, &body, location_count));
            }
            Err(error) => endpoints.push(EndpointVerification {
                path,
                status: VerificationStatus::Failed,
                http_status: None,
                record_count: None,
                error_message: Some(error),
            }),
        }
    }

    VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        base_url: base.to_string(),
        summary: summarize(&endpoints),
        endpoints,
        status_consistent,
    }
}

/// Prints a human-readable report to stdout.
pub fn print_report(report: &VerificationReport) {
    println!("\n🔍 Verifying {}", report.base_url);
    println!("═══════════════════════════════════════════════════════════");
    for endpoint in &report.endpoints {
        let mark = match endpoint.status {
            VerificationStatus::Success => "✓",
            VerificationStatus::PartialSuccess => "⚠",
            VerificationStatus::Failed => "✗",
        };
        print!("  {} {}", mark, endpoint.path);
        if let Some(count) = endpoint.record_count {
            print!(" ({count} records)");
        }
        if let Some(error) = &endpoint.error_message {
            print!(" - {error}");
        }
        println!();
    }
    match report.status_consistent {
        Some(true) => println!("  ✓ overall status matches location labels"),
        Some(false) => println!("  ✗ overall status does NOT match location labels"),
        None => println!("  ✗ overall status could not be checked"),
    }
    println!("═══════════════════════════════════════════════════════════");
    println!(
        "Summary: {}/{} working, {} partial, {} failed\n",
        report.summary.working, report.summary.total, report.summary.partial, report.summary.failed
    );
}
