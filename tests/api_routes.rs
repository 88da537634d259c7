use anyhow::Result;
use serde_json::Value;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use signwatch::api::{ApiConfig, ApiHandle, ApiServer, Controller, HEALTH_TEXT};
use signwatch::transport::RecordingReporter;
use signwatch::{
    CarAction, RuleMatcher, RuleTable, SignStateStore, ViolationRecord, ViolationReporter,
};

fn read_response(stream: &mut TcpStream) -> Result<(String, String)> {
    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    let mut parts = response.splitn(2, "\r\n\r\n");
    let headers = parts.next().unwrap_or("").to_string();
    let body = parts.next().unwrap_or("").to_string();
    Ok((headers, body))
}

/// Reporter whose backend client blows up mid-request.
struct PanickingReporter;

impl ViolationReporter for PanickingReporter {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn report(&self, record: &ViolationRecord) -> Result<()> {
        panic!("reporter crashed on '{}'", record.violation_type);
    }
}

struct TestApi {
    store: Arc<SignStateStore>,
    reporter: Arc<RecordingReporter>,
    api_handle: Option<ApiHandle>,
}

impl TestApi {
    fn new() -> Result<Self> {
        let store = Arc::new(SignStateStore::new());
        let reporter = Arc::new(RecordingReporter::new());
        let matcher = RuleMatcher::new(RuleTable::standard(), "Simulator-Car-001", store.clone());
        let controller = Arc::new(Controller::new(store.clone(), matcher, reporter.clone()));
        let api_config = ApiConfig {
            addr: "127.0.0.1:0".to_string(),
        };
        let api_handle = ApiServer::new(api_config, controller).spawn()?;
        Ok(Self {
            store,
            reporter,
            api_handle: Some(api_handle),
        })
    }

    fn handle(&self) -> &ApiHandle {
        self.api_handle
            .as_ref()
            .expect("test API handle should be initialized")
    }

    fn send(&self, method: &str, path: &str, body: &str) -> Result<(String, String)> {
        let mut stream = TcpStream::connect(self.handle().addr)?;
        let request = format!(
            "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {len}\r\n\r\n{body}",
            len = body.len()
        );
        stream.write_all(request.as_bytes())?;
        read_response(&mut stream)
    }
}

impl Drop for TestApi {
    fn drop(&mut self) {
        if let Some(handle) = self.api_handle.take() {
            handle.stop().expect("failed to stop API server");
        }
    }
}

#[test]
fn health_returns_liveness_text() -> Result<()> {
    let api = TestApi::new()?;
    let (headers, body) = api.send("GET", "/", "")?;
    assert!(headers.contains("200 OK"));
    assert_eq!(body, HEALTH_TEXT);
    Ok(())
}

#[test]
fn detected_sign_updates_state() -> Result<()> {
    let api = TestApi::new()?;
    let (headers, body) = api.send(
        "POST",
        "/detected_sign",
        r#"{"sign":"horn prohibited","confidence":0.77}"#,
    )?;
    assert!(headers.contains("200 OK"));
    let value: Value = serde_json::from_str(&body)?;
    assert_eq!(value["status"], "OK");
    assert_eq!(api.store.get().sign, "horn prohibited");
    Ok(())
}

#[test]
fn car_action_reports_violation() -> Result<()> {
    let api = TestApi::new()?;
    api.send("POST", "/detected_sign", r#"{"sign":"no entry","confidence":0.91}"#)?;

    let (headers, body) = api.send("POST", "/car_action", r#"{"action":"FS"}"#)?;
    assert!(headers.contains("200 OK"));
    let value: Value = serde_json::from_str(&body)?;
    assert_eq!(value["status"], "Violation Detected");
    assert_eq!(value["message"], "Action FS is prohibited by no entry");

    let records = api.reporter.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].violation_type, "no entry");
    assert_eq!(records[0].action_taken, CarAction::Forward);
    assert_eq!(records[0].vehicle_id, "Simulator-Car-001");
    Ok(())
}

#[test]
fn car_action_without_sign_is_ok() -> Result<()> {
    let api = TestApi::new()?;
    for code in ["FS", "BS", "RS", "LS", "Y"] {
        let (headers, body) =
            api.send("POST", "/car_action", &format!(r#"{{"action":"{code}"}}"#))?;
        assert!(headers.contains("200 OK"));
        let value: Value = serde_json::from_str(&body)?;
        assert_eq!(value["status"], "OK");
    }
    assert!(api.reporter.records().is_empty());
    Ok(())
}

#[test]
fn malformed_action_is_bad_request() -> Result<()> {
    let api = TestApi::new()?;
    let (headers, body) = api.send("POST", "/car_action", "{not json")?;
    assert!(headers.contains("400 Bad Request"));
    let value: Value = serde_json::from_str(&body)?;
    assert_eq!(value["status"], "Error");

    // The server keeps serving after a rejected request.
    let (headers, _) = api.send("GET", "/", "")?;
    assert!(headers.contains("200 OK"));
    Ok(())
}

#[test]
fn unlisted_action_code_is_ok() -> Result<()> {
    let api = TestApi::new()?;
    api.send("POST", "/detected_sign", r#"{"sign":"no entry"}"#)?;
    let (headers, body) = api.send("POST", "/car_action", r#"{"action":"STOP"}"#)?;
    assert!(headers.contains("200 OK"));
    let value: Value = serde_json::from_str(&body)?;
    assert_eq!(value["status"], "OK");
    assert!(api.reporter.records().is_empty());

    let (headers, _) = api.send("POST", "/car_action", r#"{"speed":3}"#)?;
    assert!(headers.contains("400 Bad Request"));
    Ok(())
}

#[test]
fn unknown_route_and_wrong_method() -> Result<()> {
    let api = TestApi::new()?;
    let (headers, _) = api.send("GET", "/violations", "")?;
    assert!(headers.contains("404 Not Found"));
    let (headers, _) = api.send("GET", "/car_action", "")?;
    assert!(headers.contains("405 Method Not Allowed"));
    Ok(())
}

#[test]
fn panicking_handler_answers_500_and_keeps_serving() -> Result<()> {
    let store = Arc::new(SignStateStore::new());
    let matcher = RuleMatcher::new(RuleTable::standard(), "Simulator-Car-001", store.clone());
    let controller = Arc::new(Controller::new(store, matcher, Arc::new(PanickingReporter)));
    let handle = ApiServer::new(
        ApiConfig {
            addr: "127.0.0.1:0".to_string(),
        },
        controller,
    )
    .spawn()?;

    let send = |method: &str, path: &str, body: &str| -> Result<(String, String)> {
        let mut stream = TcpStream::connect(handle.addr)?;
        let request = format!(
            "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Length: {len}\r\n\r\n{body}",
            len = body.len()
        );
        stream.write_all(request.as_bytes())?;
        read_response(&mut stream)
    };

    send("POST", "/detected_sign", r#"{"sign":"no entry"}"#)?;
    let (headers, body) = send("POST", "/car_action", r#"{"action":"FS"}"#)?;
    assert!(headers.contains("500 Internal Server Error"), "{}", headers);
    let value: Value = serde_json::from_str(&body)?;
    assert_eq!(value["status"], "Error");
    assert_eq!(value["message"], "reporter crashed on 'no entry'");

    let (headers, body) = send("GET", "/", "")?;
    assert!(headers.contains("200 OK"));
    assert_eq!(body, HEALTH_TEXT);

    handle.stop()?;
    Ok(())
}
