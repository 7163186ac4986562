pub mod calendar;
pub mod documents;
pub mod notifications;
pub mod session;
pub mod transitions;
