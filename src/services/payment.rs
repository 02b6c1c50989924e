//! payment.rs
//!
//! Имитация платёжного шлюза. Реального списания нет: обработка платежа это
//! фиксированная задержка (по умолчанию 2 секунды).
//!
//! В отличие от простого `sleep`, задержка отменяемая: если пользователь закрыл
//! мастер бронирования, ожидание прерывается через [`CancellationToken`] и
//! статус брони в хранилище не меняется.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::BookingConfig;

pub const DEFAULT_PAYMENT_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("payment cancelled before completion")]
    Cancelled,
}

/// Mock gateway that "processes" a payment by waiting for a fixed delay.
#[derive(Debug, Clone)]
pub struct MockPaymentProcessor {
    delay: Duration,
}

impl Default for MockPaymentProcessor {
    fn default() -> Self {
        Self { delay: DEFAULT_PAYMENT_DELAY }
    }
}

impl MockPaymentProcessor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_config(config: &BookingConfig) -> Self {
        Self::new(Duration::from_millis(config.payment_delay_ms))
    }

    /// Waits for the processing delay unless `cancel` fires first.
    pub async fn authorize(&self, amount: f64, cancel: &CancellationToken) -> Result<(), PaymentError> {
        debug!("Mock payment of {:.2} started, delay {:?}", amount, self.delay);

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Mock payment of {:.2} cancelled", amount);
                Err(PaymentError::Cancelled)
            }
            _ = tokio::time::sleep(self.delay) => {
                info!("Mock payment of {:.2} authorized", amount);
                Ok(())
            }
        }
    }
}
