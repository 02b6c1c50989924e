pub mod movie;
pub mod theater;
pub mod showtime;
pub mod seat;
pub mod booking;
pub mod profile;
pub mod payment;

pub use movie::Movie;
pub use theater::Theater;
pub use showtime::{Showtime, ShowtimeWithTheater};
pub use seat::{Seat, SeatId};
pub use booking::{Booking, BookingWithMovie, MovieSummary, NewBooking, PaymentStatus};
pub use payment::{CardDetails, PaymentDetails, UpiDetails};
pub use profile::{Profile, ProfileUpdate, ProfileWithPreferences, UserPreferences};
