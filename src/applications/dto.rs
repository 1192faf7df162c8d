use serde::Deserialize;

use crate::db::models::StatusChange;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
}

impl TryFrom<UpdateStatusRequest> for StatusChange {
    type Error = ApiError;

    fn try_from(r: UpdateStatusRequest) -> Result<Self, Self::Error> {
        let filled = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        match r.status.as_deref().map(str::trim) {
            Some("selected") => match (filled(r.appointment_date), filled(r.appointment_time)) {
                (Some(date), Some(time)) => Ok(StatusChange::Selected { date, time }),
                _ => Err(ApiError::validation(
                    "Appointment date and time are required for selected status",
                )),
            },
            Some("rejected") => Ok(StatusChange::Rejected),
            _ => Err(ApiError::validation("Status must be either selected or rejected")),
        }
    }
}

/// Text fields of the multipart apply form.
#[derive(Debug, Default)]
pub struct ApplyForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Vec<String>,
}
