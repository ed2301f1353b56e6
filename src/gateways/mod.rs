use anyhow::Result;
use serde::Serialize;

pub mod mock;
pub mod stripe;

#[derive(Debug, Clone, Serialize)]
pub struct SessionRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub product_name: String,
    pub product_description: String,
    pub customer_email: String,
    pub metadata: Vec<(String, String)>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub id: String,
    pub url: String,
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_session(&self, request: SessionRequest) -> Result<CreatedSession>;
}
