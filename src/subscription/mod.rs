//! Subscription lifecycle sweep: expiry, advance renewal reminders and
//! maintenance of the ephemeral store.

pub mod sweep;

pub use sweep::{days_left, ReminderError, SubscriptionSweep, SweepReport};
