pub const MIN_SEATS: u8 = 1;
pub const MAX_SEATS: u8 = 10;

/// Приводит введённое количество мест к диапазону [1, 10].
pub fn clamp_seat_count(requested: i64) -> u8 {
    requested.clamp(i64::from(MIN_SEATS), i64::from(MAX_SEATS)) as u8
}

/// `base_price × multiplier × seats`, rounded to paise.
///
/// A missing or non-positive multiplier counts as 1.
pub fn total_amount(base_price: f64, price_multiplier: Option<f64>, seat_count: u8) -> f64 {
    let multiplier = match price_multiplier {
        Some(m) if m > 0.0 => m,
        _ => 1.0,
    };
    round_money(base_price * multiplier * f64::from(seat_count))
}

fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
