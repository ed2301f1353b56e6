use crate::gateways::{CreatedSession, PaymentGateway, SessionRequest};
use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Gateway stand-in issuing `cs_test_<n>` session ids.
pub struct MockGateway {
    pub behavior: String,
    next_id: AtomicU64,
    requests: Mutex<Vec<SessionRequest>>,
}

impl MockGateway {
    pub fn new(behavior: &str) -> Self {
        Self {
            behavior: behavior.to_string(),
            next_id: AtomicU64::new(1),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<SessionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new("ALWAYS_SUCCESS")
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_session(&self, request: SessionRequest) -> Result<CreatedSession> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request);
        }

        match self.behavior.as_str() {
            "ALWAYS_FAILURE" => Err(anyhow!("mock gateway unavailable")),
            _ => {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst);
                let id = format!("cs_test_{n}");
                Ok(CreatedSession {
                    url: format!("https://checkout.mock.local/pay/{id}"),
                    id,
                })
            }
        }
    }
}
