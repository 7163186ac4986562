use serde::{Deserialize, Serialize};

/// Registration forms an admin can open and close.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    SamuhLagan,
    StudentAward,
}

impl FormType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::SamuhLagan => "samuh_lagan",
            FormType::StudentAward => "student_award",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "samuh_lagan" => Some(FormType::SamuhLagan),
            "student_award" => Some(FormType::StudentAward),
            _ => None,
        }
    }

    pub fn open_message(&self) -> &'static str {
        match self {
            FormType::SamuhLagan => "Samuh Lagan registration is now open",
            FormType::StudentAward => "Student award registration is now open",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormStatus {
    pub form_type: FormType,
    pub is_active: bool,
    pub updated_at: String,
}
