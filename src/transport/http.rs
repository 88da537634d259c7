use anyhow::{anyhow, Context, Result};
use std::time::Duration;

use super::{SignSink, ViolationReporter};
use crate::detect::SignUpdate;
use crate::rules::ViolationRecord;

/// Posts sign updates to the violation server's `/detected_sign` endpoint.
///
/// Success is HTTP 200; anything else, or no answer within `timeout`, is a
/// failed delivery.
pub struct HttpSignSink {
    url: String,
    agent: ureq::Agent,
}

impl HttpSignSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl SignSink for HttpSignSink {
    fn name(&self) -> &'static str {
        "http"
    }

    fn deliver(&self, update: &SignUpdate) -> Result<()> {
        let body = serde_json::to_string(update).context("encode sign update")?;
        let (status, text) = post_json(&self.agent, &self.url, &body)?;
        if status != 200 {
            return Err(anyhow!("{} answered HTTP {}: {}", self.url, status, text));
        }
        Ok(())
    }
}

/// Posts violation records to the storage backend with a bounded timeout.
///
/// Success is HTTP 200 or 201. There is no retry.
pub struct HttpViolationReporter {
    url: String,
    agent: ureq::Agent,
}

impl HttpViolationReporter {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl ViolationReporter for HttpViolationReporter {
    fn name(&self) -> &'static str {
        "http"
    }

    fn report(&self, record: &ViolationRecord) -> Result<()> {
        let body = serde_json::to_string(record).context("encode violation record")?;
        let (status, text) = post_json(&self.agent, &self.url, &body)?;
        match status {
            200 | 201 => {
                log::debug!("backend accepted violation: {}", text);
                Ok(())
            }
            _ => Err(anyhow!("{} answered HTTP {}: {}", self.url, status, text)),
        }
    }
}

/// Posts a JSON body. Non-2xx statuses come back as `Ok((status, body))`;
/// only transport failures (refused, DNS, timeout) are errors.
fn post_json(agent: &ureq::Agent, url: &str, body: &str) -> Result<(u16, String)> {
    let response = match agent
        .post(url)
        .set("Content-Type", "application/json")
        .send_string(body)
    {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(ureq::Error::Transport(transport)) => {
            return Err(anyhow!("could not reach {}: {}", url, transport));
        }
    };
    let status = response.status();
    let text = response.into_string().unwrap_or_default();
    Ok((status, text))
}
