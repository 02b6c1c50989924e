pub mod payment;
pub mod availability;
