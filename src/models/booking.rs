use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use super::form::FormType;

/// Which registration flow a booking came through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BookingKind {
    #[serde(rename = "general")]
    General,
    #[serde(rename = "samuh_lagan")]
    GroupWedding,
    #[serde(rename = "student_award")]
    StudentAward,
}

impl BookingKind {
    pub const ALL: [BookingKind; 3] = [
        BookingKind::General,
        BookingKind::GroupWedding,
        BookingKind::StudentAward,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingKind::General => "general",
            BookingKind::GroupWedding => "samuh_lagan",
            BookingKind::StudentAward => "student_award",
        }
    }

    /// Path segment under `/api/bookings` serving this kind.
    pub fn route_prefix(&self) -> &'static str {
        match self {
            BookingKind::General => "",
            BookingKind::GroupWedding => "/samuh-lagan",
            BookingKind::StudentAward => "/student-awards",
        }
    }

    /// Status a booking of this kind ends in once the admin confirms it.
    pub fn terminal_status(&self) -> BookingStatus {
        match self {
            BookingKind::General => BookingStatus::Booked,
            BookingKind::GroupWedding => BookingStatus::Confirmed,
            BookingKind::StudentAward => BookingStatus::Awarded,
        }
    }

    /// Registration form gating submissions of this kind, if any.
    pub fn form(&self) -> Option<FormType> {
        match self {
            BookingKind::General => None,
            BookingKind::GroupWedding => Some(FormType::SamuhLagan),
            BookingKind::StudentAward => Some(FormType::StudentAward),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Booked,
    Confirmed,
    Awarded,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Approved,
        BookingStatus::Rejected,
        BookingStatus::Booked,
        BookingStatus::Confirmed,
        BookingStatus::Awarded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Booked => "booked",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Awarded => "awarded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "approved" => Some(BookingStatus::Approved),
            "rejected" => Some(BookingStatus::Rejected),
            "booked" => Some(BookingStatus::Booked),
            "confirmed" => Some(BookingStatus::Confirmed),
            "awarded" => Some(BookingStatus::Awarded),
            _ => None,
        }
    }

    /// Whether a booking in this status takes its date off the calendar.
    /// Approved bookings are still awaiting payment and do not.
    pub fn blocks_calendar(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Booked)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Kind-specific part of a booking. The tag doubles as the booking kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum BookingDetails {
    #[serde(rename = "general")]
    General { event_type: String, guest_count: u32 },
    #[serde(rename = "samuh_lagan")]
    GroupWedding {
        bride_name: String,
        groom_name: String,
        guest_count: u32,
    },
    #[serde(rename = "student_award")]
    StudentAward {
        student_name: String,
        school_name: String,
        standard: String,
        percentage: f32,
    },
}

impl BookingDetails {
    pub fn kind(&self) -> BookingKind {
        match self {
            BookingDetails::General { .. } => BookingKind::General,
            BookingDetails::GroupWedding { .. } => BookingKind::GroupWedding,
            BookingDetails::StudentAward { .. } => BookingKind::StudentAward,
        }
    }

    /// One-line human description, used for calendar entries.
    pub fn summary(&self) -> String {
        match self {
            BookingDetails::General { event_type, .. } => format!("{event_type} booking"),
            BookingDetails::GroupWedding {
                bride_name,
                groom_name,
                ..
            } => format!("Samuh Lagan: {bride_name} & {groom_name}"),
            BookingDetails::StudentAward { student_name, .. } => {
                format!("Student award: {student_name}")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub user_id: Option<String>,
    pub status: BookingStatus,
    pub date: NaiveDate,
    pub contact: Contact,
    pub documents: Vec<String>,
    pub payment_confirmed: bool,
    pub rejection_reason: Option<String>,
    #[serde(flatten)]
    pub details: BookingDetails,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn kind(&self) -> BookingKind {
        self.details.kind()
    }
}

/// Body of a booking submission. Every kind posts the same flat shape;
/// the fields a kind needs are checked by `validation::validate_submission`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSubmission {
    pub date: String,
    pub contact_name: String,
    pub contact_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub guest_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bride_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groom_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f32>,
}

/// Partial overwrite of an existing booking. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub guest_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bride_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groom_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Float(f64),
    Str(String),
}

// Forms post guest counts as either numbers or strings.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IntOrString> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(IntOrString::Int(n)) => Ok(Some(n)),
        Some(IntOrString::Float(f)) => Ok(Some(f.trunc() as i64)),
        Some(IntOrString::Str(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<i64>()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid number: {trimmed}")))
        }
    }
}
