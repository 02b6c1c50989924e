//! showtimes.rs
//!
//! Группировка сеансов по кинотеатрам и сортировка по времени начала.
//! Время в БД хранится строкой в 12-часовом формате ("7:30 PM"), поэтому для
//! сортировки оно переводится в ключ "HH:mm".

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

use crate::models::{Showtime, ShowtimeWithTheater, Theater};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed show time '{0}', expected 'h:mm AM' or 'h:mm PM'")]
pub struct ShowTimeError(pub String);

/// Время сеанса в 24-часовом представлении.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShowTime {
    hour: u8,
    minute: u8,
}

impl ShowTime {
    /// Fixed-width "HH:mm" key; lexicographic order equals chronological order.
    pub fn sort_key(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ShowTime {
    type Err = ShowTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ShowTimeError(s.to_string());

        let (clock, meridiem) = s.trim().split_once(' ').ok_or_else(err)?;
        let (hours, minutes) = clock.split_once(':').ok_or_else(err)?;

        if hours.is_empty() || hours.len() > 2 || !hours.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        if minutes.len() != 2 || !minutes.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let hour: u8 = hours.parse().map_err(|_| err())?;
        let minute: u8 = minutes.parse().map_err(|_| err())?;
        if !(1..=12).contains(&hour) || minute > 59 {
            return Err(err());
        }

        let pm = match meridiem.to_ascii_uppercase().as_str() {
            "AM" => false,
            "PM" => true,
            _ => return Err(err()),
        };

        // 12 AM -> 00, 12 PM -> 12, остальные PM +12
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };

        Ok(ShowTime { hour, minute })
    }
}

impl fmt::Display for ShowTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hour, meridiem) = match self.hour {
            0 => (12, "AM"),
            h @ 1..=11 => (h, "AM"),
            12 => (12, "PM"),
            h => (h - 12, "PM"),
        };
        write!(f, "{}:{:02} {}", hour, self.minute, meridiem)
    }
}

/// "7:30 PM" -> "19:30".
pub fn to_24_hour(time_12h: &str) -> Result<String, ShowTimeError> {
    time_12h.parse::<ShowTime>().map(|t| t.sort_key())
}

#[derive(Debug, Clone, Serialize)]
pub struct TheaterShowtimes {
    pub theater: Theater,
    pub showtimes: Vec<Showtime>,
}

/// Сеансы, сгруппированные по кинотеатрам в порядке первого появления.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct GroupedShowtimes {
    groups: Vec<TheaterShowtimes>,
    #[serde(skip)]
    index: HashMap<Uuid, usize>,
    #[serde(skip)]
    skipped: usize,
}

impl GroupedShowtimes {
    pub fn get(&self, theater_id: &Uuid) -> Option<&TheaterShowtimes> {
        self.index.get(theater_id).map(|i| &self.groups[*i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TheaterShowtimes> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Сколько строк отброшено из-за некорректных данных.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Находит сеанс и его кинотеатр по id сеанса.
    pub fn find_showtime(&self, showtime_id: &Uuid) -> Option<(&Showtime, &Theater)> {
        self.groups.iter().find_map(|group| {
            group
                .showtimes
                .iter()
                .find(|s| s.id == *showtime_id)
                .map(|s| (s, &group.theater))
        })
    }
}

/// Groups joined showtime rows by theater and sorts each group by start time.
///
/// Rows with an unparseable `show_time` or without a joined theater are
/// dropped with a warning instead of failing the whole listing.
pub fn group_by_theater(rows: Vec<ShowtimeWithTheater>) -> GroupedShowtimes {
    let mut grouped = GroupedShowtimes::default();
    let mut keys: HashMap<Uuid, String> = HashMap::new();

    for row in rows {
        let ShowtimeWithTheater { showtime, theater } = row;

        let key = match to_24_hour(&showtime.show_time) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Skipping showtime {}: {}", showtime.id, e);
                grouped.skipped += 1;
                continue;
            }
        };
        let Some(theater) = theater else {
            tracing::warn!("Skipping showtime {}: theater {} not joined", showtime.id, showtime.theater_id);
            grouped.skipped += 1;
            continue;
        };

        keys.insert(showtime.id, key);
        let next = grouped.groups.len();
        let idx = *grouped.index.entry(theater.id).or_insert(next);
        if idx == next {
            grouped.groups.push(TheaterShowtimes { theater, showtimes: Vec::new() });
        }
        grouped.groups[idx].showtimes.push(showtime);
    }

    for group in grouped.groups.iter_mut() {
        group.showtimes.sort_by(|a, b| keys[&a.id].cmp(&keys[&b.id]));
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn theater(name: &str) -> Theater {
        Theater {
            id: Uuid::new_v4(),
            name: name.to_string(),
            location: "Banjara Hills".to_string(),
            city: "Hyderabad".to_string(),
            address: None,
            amenities: vec!["Dolby Atmos".to_string()],
        }
    }

    fn row(theater: &Theater, time: &str) -> ShowtimeWithTheater {
        ShowtimeWithTheater {
            showtime: Showtime {
                id: Uuid::new_v4(),
                movie_id: Uuid::nil(),
                theater_id: theater.id,
                show_date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
                show_time: time.to_string(),
                price_multiplier: Some(1.0),
                available_seats: None,
                is_available: true,
            },
            theater: Some(theater.clone()),
        }
    }

    fn times(group: &TheaterShowtimes) -> Vec<&str> {
        group.showtimes.iter().map(|s| s.show_time.as_str()).collect()
    }

    #[test]
    fn converts_to_24_hour() {
        assert_eq!(to_24_hour("7:30 PM").unwrap(), "19:30");
        assert_eq!(to_24_hour("10:00 AM").unwrap(), "10:00");
        assert_eq!(to_24_hour("12:15 AM").unwrap(), "00:15");
        assert_eq!(to_24_hour("12:45 PM").unwrap(), "12:45");
        assert_eq!(to_24_hour("1:05 pm").unwrap(), "13:05");
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["", "7:30", "19:30 PM", "7:3 PM", "7:60 AM", "0:30 AM", "7:30PM", "seven PM", "7:30 XM"] {
            assert!(to_24_hour(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn display_round_trips_common_times() {
        for t in ["10:00 AM", "12:00 PM", "12:30 AM", "7:30 PM"] {
            assert_eq!(t.parse::<ShowTime>().unwrap().to_string(), t);
        }
    }

    #[test]
    fn sorts_within_theater() {
        let pvr = theater("PVR");
        let grouped = group_by_theater(vec![
            row(&pvr, "7:30 PM"),
            row(&pvr, "10:00 AM"),
            row(&pvr, "1:30 PM"),
        ]);
        assert_eq!(grouped.len(), 1);
        assert_eq!(times(grouped.get(&pvr.id).unwrap()), vec!["10:00 AM", "1:30 PM", "7:30 PM"]);
    }

    #[test]
    fn midnight_and_noon_order() {
        let inox = theater("INOX");
        let grouped = group_by_theater(vec![
            row(&inox, "12:30 PM"),
            row(&inox, "11:45 AM"),
            row(&inox, "12:05 AM"),
        ]);
        assert_eq!(times(grouped.get(&inox.id).unwrap()), vec!["12:05 AM", "11:45 AM", "12:30 PM"]);
    }

    #[test]
    fn groups_by_theater_in_first_seen_order() {
        let pvr = theater("PVR");
        let cinepolis = theater("Cinepolis");
        let grouped = group_by_theater(vec![
            row(&cinepolis, "4:00 PM"),
            row(&pvr, "10:00 PM"),
            row(&cinepolis, "10:00 AM"),
        ]);
        let names: Vec<&str> = grouped.iter().map(|g| g.theater.name.as_str()).collect();
        assert_eq!(names, vec!["Cinepolis", "PVR"]);
        assert_eq!(times(grouped.get(&cinepolis.id).unwrap()), vec!["10:00 AM", "4:00 PM"]);
    }

    #[test]
    fn skips_malformed_rows() {
        let pvr = theater("PVR");
        let mut orphan = row(&pvr, "1:30 PM");
        orphan.theater = None;
        let grouped = group_by_theater(vec![
            row(&pvr, "soon"),
            orphan,
            row(&pvr, "4:00 PM"),
        ]);
        assert_eq!(grouped.skipped(), 2);
        assert_eq!(times(grouped.get(&pvr.id).unwrap()), vec!["4:00 PM"]);
    }

    #[test]
    fn finds_showtime_with_theater() {
        let pvr = theater("PVR");
        let first = row(&pvr, "4:00 PM");
        let id = first.showtime.id;
        let grouped = group_by_theater(vec![first]);
        let (showtime, found) = grouped.find_showtime(&id).unwrap();
        assert_eq!(showtime.show_time, "4:00 PM");
        assert_eq!(found.name, "PVR");
        assert!(grouped.find_showtime(&Uuid::new_v4()).is_none());
    }
}
