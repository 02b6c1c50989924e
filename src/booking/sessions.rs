//! Реестр открытых мастеров бронирования (живут только в памяти процесса).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::wizard::{BookingWizard, Flow};
use crate::models::Movie;

pub type SharedWizard = Arc<Mutex<BookingWizard>>;

#[derive(Default)]
pub struct WizardSessions {
    sessions: RwLock<HashMap<Uuid, SharedWizard>>,
    default_price: Option<f64>,
}

impl WizardSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Price applied to wizards of movies without their own price.
    pub fn with_default_price(default_price: f64) -> Self {
        Self { default_price: Some(default_price), ..Self::default() }
    }

    pub fn open(&self, movie: Movie, flow: Flow, today: NaiveDate) -> (Uuid, SharedWizard) {
        let mut wizard = BookingWizard::new(movie, flow, today);
        if let Some(price) = self.default_price {
            wizard = wizard.with_default_price(price);
        }

        let id = Uuid::new_v4();
        let shared = Arc::new(Mutex::new(wizard));
        self.write().insert(id, shared.clone());
        debug!("Booking session {} opened", id);
        (id, shared)
    }

    pub fn get(&self, id: &Uuid) -> Option<SharedWizard> {
        self.read().get(id).cloned()
    }

    /// Removes the session, resetting it and cancelling a running payment.
    pub async fn close(&self, id: &Uuid, today: NaiveDate) -> bool {
        let Some(shared) = self.write().remove(id) else {
            return false;
        };
        shared.lock().await.reset(today);
        debug!("Booking session {} closed", id);
        true
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, SharedWizard>> {
        self.sessions.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, SharedWizard>> {
        self.sessions.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
