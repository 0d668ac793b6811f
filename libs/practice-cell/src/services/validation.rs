use chrono::NaiveDateTime;

use shared_models::practice::{NewAppointment, NewPatient};

use crate::models::ValidationError;

/// Checked before submission; a rejected draft never reaches the repository.
pub fn validate_new_appointment(
    draft: &NewAppointment,
    now: NaiveDateTime,
) -> Result<(), ValidationError> {
    if draft.patient_id.trim().is_empty() {
        return Err(ValidationError::MissingPatient);
    }
    if draft.duration_minutes == 0 {
        return Err(ValidationError::NonPositiveDuration);
    }
    if draft.starts_at() < now {
        return Err(ValidationError::ScheduledInPast);
    }
    Ok(())
}

pub fn validate_new_patient(draft: &NewPatient) -> Result<(), ValidationError> {
    if draft.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use shared_models::practice::AppointmentType;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
    }

    fn draft(day: u32, hour: u32, minute: u32) -> NewAppointment {
        NewAppointment {
            patient_id: "pat_1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, day).unwrap(),
            time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
            duration_minutes: 50,
            appointment_type: AppointmentType::Online,
        }
    }

    #[test]
    fn test_past_slots_are_rejected() {
        assert_eq!(
            validate_new_appointment(&draft(16, 12, 29), now()),
            Err(ValidationError::ScheduledInPast)
        );
        assert_eq!(
            validate_new_appointment(&draft(15, 18, 0), now()),
            Err(ValidationError::ScheduledInPast)
        );
    }

    #[test]
    fn test_current_minute_and_later_are_accepted() {
        assert!(validate_new_appointment(&draft(16, 12, 30), now()).is_ok());
        assert!(validate_new_appointment(&draft(17, 8, 0), now()).is_ok());
    }

    #[test]
    fn test_zero_duration_and_missing_patient() {
        let mut zero = draft(17, 9, 0);
        zero.duration_minutes = 0;
        assert_eq!(
            validate_new_appointment(&zero, now()),
            Err(ValidationError::NonPositiveDuration)
        );

        let mut orphan = draft(17, 9, 0);
        orphan.patient_id = "  ".to_string();
        assert_eq!(
            validate_new_appointment(&orphan, now()),
            Err(ValidationError::MissingPatient)
        );
    }

    #[test]
    fn test_blank_patient_name() {
        let draft = NewPatient {
            name: "   ".to_string(),
            email: "x@example.com".to_string(),
            phone: String::new(),
            notes: None,
        };
        assert_eq!(validate_new_patient(&draft), Err(ValidationError::EmptyName));
    }
}
