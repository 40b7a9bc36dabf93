pub mod bookings;
pub mod completion;
pub mod conversation;
pub mod notifications;
pub mod scheduling;
pub mod settlement;
pub mod sweeper;
