pub mod booking;
pub mod dashboard;
pub mod envelope;
pub mod form;
pub mod notification;
pub mod user;

pub use booking::{
    Booking, BookingDetails, BookingKind, BookingStatus, BookingSubmission, BookingUpdate, Contact,
};
pub use dashboard::DashboardSummary;
pub use envelope::{Envelope, ErrorBody};
pub use form::{FormStatus, FormType};
pub use notification::Notification;
pub use user::{AuthResponse, PublicUser, User};
