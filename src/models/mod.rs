pub mod booking;
pub mod message;
pub mod schedule;
pub mod user;

pub use booking::{Booking, BookingStatus, ServiceName};
pub use message::ChatMessage;
pub use schedule::{Availability, BlockedSlot, ScheduleEntry};
pub use user::{Role, User};
