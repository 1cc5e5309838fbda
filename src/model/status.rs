//! Status values stored in the `status` column of each table.
//!
//! Columns hold the PascalCase variant name; strum handles the text form
//! and serde the JSON form, so both agree.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
pub enum RoomStatus {
    Available,
    Full,
    Maintenance,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
pub enum ComplaintStatus {
    Pending,
    Resolved,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
pub enum InquiryStatus {
    Unread,
    Read,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
pub enum FeeStatus {
    Due,
    Paid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn text_form_matches_column_values() {
        assert_eq!(RoomStatus::Maintenance.as_ref(), "Maintenance");
        assert_eq!(LeaveStatus::Approved.to_string(), "Approved");
        assert_eq!(InquiryStatus::from_str("Unread").unwrap(), InquiryStatus::Unread);
        assert!(FeeStatus::from_str("paid").is_err());
    }

    #[test]
    fn json_form_matches_text_form() {
        let json = serde_json::to_string(&ComplaintStatus::Resolved).unwrap();
        assert_eq!(json, "\"Resolved\"");
        let parsed: RoomStatus = serde_json::from_str("\"Full\"").unwrap();
        assert_eq!(parsed, RoomStatus::Full);
    }
}
