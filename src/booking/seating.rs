//! seating.rs
//!
//! Детерминированная схема занятых мест. Сервер места не резервирует:
//! "проданные" места вычисляются из идентификатора сеанса, поэтому все клиенты
//! видят одинаковую картину, но два покупателя могут выбрать одно и то же место.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::BookingError;
use crate::models::seat::{ROWS, SEATS_PER_ROW};
use crate::models::{Seat, SeatId};

/// Returns the seats that are shown as already sold for `showtime_key`.
///
/// The key's UTF-16 code units are summed into `hash`; seat `n` of row index
/// `r` is filled when `(hash + r*7 + n*13) % 10 < 4`. Every row ends up with
/// 4 to 6 filled seats, 32..=48 for the whole grid.
pub fn compute_filled_seats(showtime_key: &str) -> BTreeSet<SeatId> {
    let hash: u64 = showtime_key.encode_utf16().map(u64::from).sum();

    let mut filled = BTreeSet::new();
    for (row_index, _) in ROWS.iter().enumerate() {
        for number in 1..=SEATS_PER_ROW {
            let value = hash + row_index as u64 * 7 + u64::from(number) * 13;
            if value % 10 < 4 {
                filled.insert(SeatId::from_index(row_index, number));
            }
        }
    }
    filled
}

/// Схема зала для конкретного сеанса.
#[derive(Debug, Clone)]
pub struct SeatMap {
    filled: BTreeSet<SeatId>,
}

impl SeatMap {
    pub fn for_showtime(showtime_key: &str) -> Self {
        Self { filled: compute_filled_seats(showtime_key) }
    }

    pub fn is_available(&self, seat: &SeatId) -> bool {
        !self.filled.contains(seat)
    }

    pub fn filled(&self) -> &BTreeSet<SeatId> {
        &self.filled
    }

    pub fn available_count(&self) -> usize {
        crate::models::seat::TOTAL_SEATS - self.filled.len()
    }

    /// Ряды A..H, в каждом места 1..12.
    pub fn rows(&self) -> Vec<Vec<Seat>> {
        ROWS.iter()
            .enumerate()
            .map(|(row_index, row)| {
                (1..=SEATS_PER_ROW)
                    .map(|number| {
                        let id = SeatId::from_index(row_index, number);
                        Seat {
                            id,
                            row: *row,
                            number,
                            is_available: self.is_available(&id),
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

/// Выбранные пользователем места в порядке выбора.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SeatSelection {
    seats: Vec<SeatId>,
}

impl SeatSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Click on a seat: sold seats are refused, a selected seat is released,
    /// a free seat is taken only while fewer than `limit` are selected.
    pub fn toggle(&mut self, seat: SeatId, limit: usize, map: &SeatMap) -> Result<(), BookingError> {
        if !map.is_available(&seat) {
            return Err(BookingError::SeatUnavailable(seat));
        }
        if let Some(pos) = self.seats.iter().position(|s| *s == seat) {
            self.seats.remove(pos);
            return Ok(());
        }
        if self.seats.len() >= limit {
            return Err(BookingError::SeatLimitReached { limit });
        }
        self.seats.push(seat);
        Ok(())
    }

    // оставляем первые выбранные
    pub fn truncate(&mut self, limit: usize) {
        self.seats.truncate(limit);
    }

    pub fn clear(&mut self) {
        self.seats.clear();
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn contains(&self, seat: &SeatId) -> bool {
        self.seats.contains(seat)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeatId> {
        self.seats.iter()
    }

    /// Sorted labels, as shown in the payment summary.
    pub fn labels(&self) -> Vec<String> {
        let mut sorted = self.seats.clone();
        sorted.sort();
        sorted.iter().map(ToString::to_string).collect()
    }
}
