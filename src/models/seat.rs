use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Ряды зала, сверху вниз.
pub const ROWS: [char; 8] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];
pub const SEATS_PER_ROW: u8 = 12;
pub const TOTAL_SEATS: usize = ROWS.len() * SEATS_PER_ROW as usize;

/// Seat identifier such as `C7`: row letter followed by seat number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatId {
    row: u8,
    number: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid seat id '{0}', expected A1..H12")]
pub struct InvalidSeatId(pub String);

impl SeatId {
    pub fn new(row: char, number: u8) -> Result<Self, InvalidSeatId> {
        let row_index = ROWS
            .iter()
            .position(|r| *r == row.to_ascii_uppercase())
            .ok_or_else(|| InvalidSeatId(format!("{row}{number}")))?;
        if !(1..=SEATS_PER_ROW).contains(&number) {
            return Err(InvalidSeatId(format!("{row}{number}")));
        }
        Ok(Self { row: row_index as u8, number })
    }

    pub(crate) fn from_index(row_index: usize, number: u8) -> Self {
        Self { row: row_index as u8, number }
    }

    pub fn row(&self) -> char {
        ROWS[self.row as usize]
    }

    pub fn row_index(&self) -> usize {
        self.row as usize
    }

    pub fn number(&self) -> u8 {
        self.number
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row(), self.number)
    }
}

impl FromStr for SeatId {
    type Err = InvalidSeatId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let row = chars.next().ok_or_else(|| InvalidSeatId(s.to_string()))?;
        let number: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| InvalidSeatId(s.to_string()))?;
        SeatId::new(row, number).map_err(|_| InvalidSeatId(s.to_string()))
    }
}

impl Serialize for SeatId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SeatId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Ячейка схемы зала. Доступность вычисляется, в БД не хранится.
#[derive(Debug, Clone, Serialize)]
pub struct Seat {
    pub id: SeatId,
    pub row: char,
    pub number: u8,
    pub is_available: bool,
}
