use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

// Цена билета, если у фильма она не задана
pub const DEFAULT_TICKET_PRICE: f64 = 250.0;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, Validate)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub language: Option<String>,
    pub genres: Vec<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub price: Option<f64>,
    #[validate(range(min = 0.0, max = 10.0))]
    pub rating: Option<f64>,
    pub poster_url: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl Movie {
    /// Цена одного билета без множителя сеанса.
    pub fn base_price(&self) -> f64 {
        match self.price {
            Some(p) if p > 0.0 => p,
            _ => DEFAULT_TICKET_PRICE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(price: Option<f64>, rating: Option<f64>) -> Movie {
        Movie {
            id: Uuid::new_v4(),
            title: "Marco".to_string(),
            description: None,
            duration: Some("2h 25m".to_string()),
            language: Some("Malayalam".to_string()),
            genres: vec!["Action".to_string()],
            price,
            rating,
            poster_url: None,
            release_date: None,
            is_available: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn base_price_falls_back_to_default() {
        assert_eq!(movie(None, None).base_price(), DEFAULT_TICKET_PRICE);
        assert_eq!(movie(Some(0.0), None).base_price(), DEFAULT_TICKET_PRICE);
        assert_eq!(movie(Some(320.0), None).base_price(), 320.0);
    }

    #[test]
    fn rating_and_price_are_validated() {
        assert!(movie(Some(200.0), Some(9.2)).validate().is_ok());
        assert!(movie(Some(200.0), Some(10.5)).validate().is_err());
        assert!(movie(Some(-1.0), None).validate().is_err());
        assert!(movie(None, None).validate().is_ok());
    }
}
