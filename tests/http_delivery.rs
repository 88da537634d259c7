use anyhow::Result;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use signwatch::transport::{HttpSignSink, HttpViolationReporter};
use signwatch::{CarAction, SignSink, SignUpdate, ViolationRecord, ViolationReporter};

/// One-shot HTTP backend: answers a single request with `status` and hands
/// back the request body it received.
fn fake_backend(status_line: &'static str) -> Result<(SocketAddr, JoinHandle<String>)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    let join = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout");
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        let body = loop {
            let n = stream.read(&mut buf).expect("read");
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data).to_string();
            if let Some((head, body)) = text.split_once("\r\n\r\n") {
                let len = head
                    .lines()
                    .find_map(|line| {
                        let (k, v) = line.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length")
                            .then(|| v.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if body.len() >= len {
                    break body.to_string();
                }
            }
            if n == 0 {
                break String::new();
            }
        };
        let reply = "{\"id\":1}";
        let response = format!(
            "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
            reply.len()
        );
        stream.write_all(response.as_bytes()).expect("write");
        body
    });
    Ok((addr, join))
}

/// Backend that accepts one connection and never answers it within `hold`.
fn stalled_backend(hold: Duration) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    let join = std::thread::spawn(move || {
        if let Ok((_stream, _)) = listener.accept() {
            std::thread::sleep(hold);
        }
    });
    Ok((addr, join))
}

fn sample_record() -> ViolationRecord {
    ViolationRecord {
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
        violation_type: "no entry".to_string(),
        traffic_sign: "no entry".to_string(),
        action_taken: CarAction::Forward,
        vehicle_id: "Simulator-Car-001".to_string(),
    }
}

#[test]
fn reporter_posts_backend_shape() -> Result<()> {
    let (addr, join) = fake_backend("HTTP/1.1 201 Created")?;
    let reporter =
        HttpViolationReporter::new(format!("http://{addr}/violations/add"), Duration::from_secs(5));
    reporter.report(&sample_record())?;

    let body: Value = serde_json::from_str(&join.join().expect("backend thread"))?;
    assert_eq!(body["violationType"], "no entry");
    assert_eq!(body["trafficSign"], "no entry");
    assert_eq!(body["actionTaken"], "FS");
    assert_eq!(body["carNumber"], "Simulator-Car-001");
    assert_eq!(body["timestamp"], "2024-05-01T08:30:00Z");
    Ok(())
}

#[test]
fn reporter_treats_server_error_as_failure() -> Result<()> {
    let (addr, join) = fake_backend("HTTP/1.1 500 Internal Server Error")?;
    let reporter = HttpViolationReporter::new(format!("http://{addr}/"), Duration::from_secs(5));
    let err = reporter.report(&sample_record()).unwrap_err();
    assert!(err.to_string().contains("500"));
    join.join().expect("backend thread");
    Ok(())
}

#[test]
fn reporter_fails_when_backend_is_down() -> Result<()> {
    let addr = TcpListener::bind("127.0.0.1:0")?.local_addr()?;
    let reporter =
        HttpViolationReporter::new(format!("http://{addr}/"), Duration::from_millis(500));
    assert!(reporter.report(&sample_record()).is_err());
    Ok(())
}

#[test]
fn sign_sink_requires_200() -> Result<()> {
    let (addr, join) = fake_backend("HTTP/1.1 200 OK")?;
    let sink = HttpSignSink::new(
        format!("http://{addr}/detected_sign"),
        Duration::from_secs(5),
    );
    sink.deliver(&SignUpdate::new("no entry", 0.5))?;
    let body: Value = serde_json::from_str(&join.join().expect("backend thread"))?;
    assert_eq!(body, serde_json::json!({"sign": "no entry", "confidence": 0.5}));

    let (addr, join) = fake_backend("HTTP/1.1 201 Created")?;
    let sink = HttpSignSink::new(
        format!("http://{addr}/detected_sign"),
        Duration::from_secs(5),
    );
    assert!(sink.deliver(&SignUpdate::new("stop", 0.5)).is_err());
    join.join().expect("backend thread");
    Ok(())
}

#[test]
fn reporter_gives_up_on_stalled_backend() -> Result<()> {
    let hold = Duration::from_secs(10);
    let (addr, _join) = stalled_backend(hold)?;
    let reporter =
        HttpViolationReporter::new(format!("http://{addr}/"), Duration::from_millis(300));

    let started = Instant::now();
    let result = reporter.report(&sample_record());
    let elapsed = started.elapsed();

    assert!(result.is_err());
    assert!(
        elapsed < Duration::from_secs(5),
        "report blocked for {:?}",
        elapsed
    );
    Ok(())
}

#[test]
fn sign_sink_gives_up_on_stalled_server() -> Result<()> {
    let hold = Duration::from_secs(10);
    let (addr, _join) = stalled_backend(hold)?;
    let sink = HttpSignSink::new(
        format!("http://{addr}/detected_sign"),
        Duration::from_millis(300),
    );

    let started = Instant::now();
    let result = sink.deliver(&SignUpdate::new("no entry", 0.9));
    let elapsed = started.elapsed();

    assert!(result.is_err());
    assert!(
        elapsed < Duration::from_secs(5),
        "deliver blocked for {:?}",
        elapsed
    );
    Ok(())
}
