use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

use crate::models::Booking;

/// Dates taken off the calendar by the given bookings.
pub fn blocked_dates(bookings: &[Booking]) -> BTreeSet<NaiveDate> {
    bookings
        .iter()
        .filter(|b| b.status.blocks_calendar())
        .map(|b| b.date)
        .collect()
}

fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

/// All-day iCalendar event for a booking.
pub fn generate_ics(booking: &Booking, venue_name: &str) -> String {
    let dtstart = booking.date.format("%Y%m%d").to_string();
    let dtend = (booking.date + Duration::days(1)).format("%Y%m%d").to_string();
    let dtstamp = booking.created_at.format("%Y%m%dT%H%M%SZ").to_string();
    let uid = format!("{}@venuebook", booking.id);

    let summary = escape_text(&booking.details.summary());
    let location = escape_text(venue_name);
    let description = escape_text(&format!(
        "Status: {}\nContact: {} ({})",
        booking.status.as_str(),
        booking.contact.name,
        booking.contact.phone
    ));

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Venuebook//Bookings//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART;VALUE=DATE:{dtstart}\r\n\
         DTEND;VALUE=DATE:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         LOCATION:{location}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}
