use crate::gateways::{CreatedSession, PaymentGateway, SessionRequest};
use anyhow::{anyhow, Result};

pub struct StripeGateway {
    pub base_url: String,
    pub secret_key: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl StripeGateway {
    fn form(request: &SessionRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                request.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                request.amount_minor.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                request.product_name.clone(),
            ),
            (
                "line_items[0][price_data][product_data][description]".to_string(),
                request.product_description.clone(),
            ),
            ("customer_email".to_string(), request.customer_email.clone()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];
        for (k, v) in &request.metadata {
            form.push((format!("metadata[{k}]"), v.clone()));
        }
        form
    }
}

#[async_trait::async_trait]
impl PaymentGateway for StripeGateway {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_session(&self, request: SessionRequest) -> Result<CreatedSession> {
        let url = format!("{}/v1/checkout/sessions", self.base_url);

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .form(&Self::form(&request))
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("gateway timeout")
                } else {
                    anyhow!("gateway network error: {}", e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "gateway rejected session: HTTP_{} {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            ));
        }

        let v: serde_json::Value = resp.json().await?;
        let id = v
            .get("id")
            .and_then(|id| id.as_str())
            .map(ToString::to_string)
            .ok_or_else(|| anyhow!("gateway response missing session id"))?;
        let url = v
            .get("url")
            .and_then(|u| u.as_str())
            .map(ToString::to_string)
            .ok_or_else(|| anyhow!("gateway response missing checkout url"))?;

        Ok(CreatedSession { id, url })
    }
}
