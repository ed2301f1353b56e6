use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i64,
    pub duration_mins: i32,
    pub active: bool,
}

impl Service {
    pub fn new(key: &str, name: &str, price_major: i64, duration_mins: i32) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: None,
            price_minor: price_major * 100,
            duration_mins,
            active: true,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.key.trim().is_empty() {
            return Err("key must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.price_minor <= 0 {
            return Err("price_minor must be > 0".to_string());
        }
        if self.duration_mins <= 0 {
            return Err("duration_mins must be > 0".to_string());
        }
        Ok(())
    }
}

pub fn default_catalog() -> Vec<Service> {
    vec![
        Service {
            description: Some(
                "A focused tarot session to explore your current path and purpose.".to_string(),
            ),
            ..Service::new("general-reading", "General or Purpose Reading", 65, 45)
        },
        Service {
            description: Some(
                "Insights into your personal journey and relationships through tarot.".to_string(),
            ),
            ..Service::new("personal-tarot", "Personal Tarot Reading", 85, 60)
        },
        Service {
            description: Some("Complete astrological birth chart interpretation.".to_string()),
            ..Service::new("birth-chart", "Birth Chart Analysis", 120, 90)
        },
        Service {
            description: Some("Birth chart analysis combined with tarot guidance.".to_string()),
            ..Service::new("chart-tarot-combo", "Birth Chart + Tarot Combo", 165, 120)
        },
        Service {
            description: Some("Follow-up guidance on a previous reading.".to_string()),
            ..Service::new("follow-up", "Follow Up Session", 45, 30)
        },
    ]
}
