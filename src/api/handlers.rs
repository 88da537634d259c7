use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::rules::{ActionEvent, CarAction, RuleMatcher};
use crate::state::SignStateStore;
use crate::transport::{self, ViolationReporter};

pub const STATUS_OK: &str = "OK";
pub const STATUS_VIOLATION: &str = "Violation Detected";
pub const STATUS_ERROR: &str = "Error";

const NO_VIOLATION: &str = "Car action received, no violation detected";

/// JSON body returned by `/detected_sign` and `/car_action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub code: u16,
    pub body: StatusBody,
}

impl Reply {
    fn new(code: u16, status: &str, message: impl Into<String>) -> Self {
        Self {
            code,
            body: StatusBody {
                status: status.to_string(),
                message: message.into(),
            },
        }
    }

    fn bad_request(err: anyhow::Error) -> Self {
        Self::new(400, STATUS_ERROR, format!("{:#}", err))
    }

    pub(crate) fn internal_error(message: impl Into<String>) -> Self {
        Self::new(500, STATUS_ERROR, message)
    }
}

#[derive(Debug, Deserialize)]
struct DetectedSignRequest {
    sign: Option<String>,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CarActionRequest {
    action: Option<String>,
}

/// Request-level logic behind the HTTP routes, independent of sockets.
pub struct Controller {
    store: Arc<SignStateStore>,
    matcher: RuleMatcher,
    reporter: Arc<dyn ViolationReporter>,
}

impl Controller {
    pub fn new(
        store: Arc<SignStateStore>,
        matcher: RuleMatcher,
        reporter: Arc<dyn ViolationReporter>,
    ) -> Self {
        Self {
            store,
            matcher,
            reporter,
        }
    }

    pub fn store(&self) -> &Arc<SignStateStore> {
        &self.store
    }

    /// `POST /detected_sign`: overwrite the current sign.
    pub fn detected_sign(&self, body: &[u8]) -> Reply {
        let req: DetectedSignRequest = match parse_json(body) {
            Ok(req) => req,
            Err(e) => return Reply::bad_request(e),
        };
        let Some(sign) = req.sign else {
            return Reply::bad_request(anyhow!("missing 'sign' field"));
        };
        self.store.set(sign.clone(), Utc::now());
        let confidence = req
            .confidence
            .map(|c| format!("{:.2}", c))
            .unwrap_or_else(|| "N/A".to_string());
        log::info!("detected sign updated: {} (confidence: {})", sign, confidence);
        Reply::new(
            200,
            STATUS_OK,
            format!("Sign '{}' received and state updated", sign),
        )
    }

    /// `POST /car_action`: check the action against the current sign and
    /// report a violation when it is prohibited.
    ///
    /// A well-formed request with a code outside FS/BS/RS/LS/Y matches no
    /// rule and is answered `OK`.
    pub fn car_action(&self, body: &[u8]) -> Reply {
        let code = match parse_action_code(body) {
            Ok(code) => code,
            Err(e) => return Reply::bad_request(e),
        };
        let action: CarAction = match code.parse() {
            Ok(action) => action,
            Err(_) => {
                log::warn!(
                    "car action '{}' is not a known code | current sign: {}",
                    code,
                    self.matcher.current_sign()
                );
                return Reply::new(200, STATUS_OK, NO_VIOLATION);
            }
        };
        let event = ActionEvent::now(action);
        let sign = self.matcher.current_sign();
        log::info!("car action: {} | current sign: {}", action, sign);

        match self.matcher.check_against(&sign, &event) {
            Some(record) => {
                log::info!(
                    "violation detected: {} ({} under '{}')",
                    record.violation_type,
                    record.action_taken,
                    record.traffic_sign
                );
                transport::report(self.reporter.as_ref(), &record);
                Reply::new(
                    200,
                    STATUS_VIOLATION,
                    format!("Action {} is prohibited by {}", action, sign),
                )
            }
            None => Reply::new(200, STATUS_OK, NO_VIOLATION),
        }
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T> {
    if body.is_empty() {
        return Err(anyhow!("request body must be a JSON object"));
    }
    serde_json::from_slice(body).map_err(|e| anyhow!("invalid JSON body: {}", e))
}

fn parse_action_code(body: &[u8]) -> Result<String> {
    let req: CarActionRequest = parse_json(body)?;
    req.action.ok_or_else(|| anyhow!("missing 'action' field"))
}
