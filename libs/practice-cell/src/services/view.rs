use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use shared_models::practice::{Appointment, AppointmentStatus, Patient};

use crate::models::ValidationError;
use crate::services::store::StoreSnapshot;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Dashboard,
    Patients,
    Calendar,
}

/// Which projection is on screen. Changes only through `navigate`.
#[derive(Debug, Clone, Default)]
pub struct ViewRouter {
    current: View,
}

/// Inputs a projection needs besides the store.
#[derive(Debug, Clone)]
pub struct ViewContext {
    pub today: NaiveDate,
    pub month: Option<(i32, u32)>,
    pub search: Option<String>,
}

impl ViewContext {
    pub fn for_today(today: NaiveDate) -> Self {
        Self {
            today,
            month: None,
            search: None,
        }
    }
}

impl ViewRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> View {
        self.current
    }

    pub fn navigate(&mut self, view: View) -> View {
        std::mem::replace(&mut self.current, view)
    }

    pub fn render(
        &self,
        snapshot: &StoreSnapshot,
        context: &ViewContext,
    ) -> Result<Projection, ValidationError> {
        Ok(match self.current {
            View::Dashboard => Projection::Dashboard(dashboard(snapshot, context.today)),
            View::Patients => Projection::Patients(patients(snapshot, context.search.as_deref())),
            View::Calendar => {
                let (year, month) = context
                    .month
                    .unwrap_or((context.today.year(), context.today.month()));
                Projection::Calendar(calendar(snapshot, year, month, context.today)?)
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Projection {
    Dashboard(DashboardProjection),
    Patients(PatientsProjection),
    Calendar(CalendarProjection),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardProjection {
    pub today: NaiveDate,
    pub todays_appointments: Vec<Appointment>,
    pub todays_count: usize,
    pub total_patients: usize,
    /// First of today's sessions still in SCHEDULED.
    pub next_session: Option<Appointment>,
    pub loading: bool,
    pub pending_writes: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PatientsProjection {
    pub query: Option<String>,
    pub patients: Vec<Patient>,
    pub total: usize,
    pub loading: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_today: bool,
    pub appointments: Vec<Appointment>,
}

/// Month grid with Sunday as the first column.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarProjection {
    pub year: i32,
    pub month: u32,
    pub leading_blanks: u32,
    pub trailing_blanks: u32,
    pub days: Vec<CalendarDay>,
    pub loading: bool,
}

fn appointments_on(snapshot: &StoreSnapshot, date: NaiveDate) -> Vec<Appointment> {
    snapshot
        .appointments
        .iter()
        .filter(|a| a.date == date)
        .cloned()
        .collect()
}

pub fn dashboard(snapshot: &StoreSnapshot, today: NaiveDate) -> DashboardProjection {
    let todays_appointments = appointments_on(snapshot, today);
    let next_session = todays_appointments
        .iter()
        .find(|a| a.status == AppointmentStatus::Scheduled)
        .cloned();

    DashboardProjection {
        today,
        todays_count: todays_appointments.len(),
        todays_appointments,
        total_patients: snapshot.patients.len(),
        next_session,
        loading: snapshot.loading,
        pending_writes: snapshot.pending_writes,
    }
}

/// Case-insensitive substring match on the name; a blank query lists everyone.
pub fn patients(snapshot: &StoreSnapshot, query: Option<&str>) -> PatientsProjection {
    let needle = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let patients: Vec<Patient> = match &needle {
        Some(needle) => snapshot
            .patients
            .iter()
            .filter(|p| p.name.to_lowercase().contains(needle.as_str()))
            .cloned()
            .collect(),
        None => snapshot.patients.clone(),
    };

    PatientsProjection {
        query: needle,
        total: patients.len(),
        patients,
        loading: snapshot.loading,
    }
}

pub fn calendar(
    snapshot: &StoreSnapshot,
    year: i32,
    month: u32,
    today: NaiveDate,
) -> Result<CalendarProjection, ValidationError> {
    let invalid = || ValidationError::InvalidMonth { year, month };
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;

    let days = first
        .iter_days()
        .take_while(|date| *date <= last)
        .map(|date| CalendarDay {
            date,
            is_today: date == today,
            appointments: appointments_on(snapshot, date),
        })
        .collect();

    Ok(CalendarProjection {
        year,
        month,
        leading_blanks: first.weekday().num_days_from_sunday(),
        trailing_blanks: 6 - last.weekday().num_days_from_sunday(),
        days,
        loading: snapshot.loading,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveTime;
    use shared_models::practice::AppointmentType;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn appointment(id: &str, date: NaiveDate, hour: u32, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: id.to_string(),
            patient_id: "pat_1".to_string(),
            patient_name: "John Doe".to_string(),
            date,
            time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            duration_minutes: 50,
            appointment_type: AppointmentType::Online,
            status,
            notes: None,
            summary: None,
        }
    }

    fn patient(name: &str) -> Patient {
        Patient {
            id: name.to_lowercase(),
            name: name.to_string(),
            email: String::new(),
            phone: String::new(),
            notes: None,
            next_session: None,
        }
    }

    fn snapshot() -> StoreSnapshot {
        let today = date(2026, 10, 16);
        StoreSnapshot {
            effective_user: Some("psy_1".to_string()),
            patients: vec![patient("John Doe"), patient("Sarah Smith")],
            appointments: vec![
                appointment("apt_1", today, 10, AppointmentStatus::Confirmed),
                appointment("apt_2", today, 14, AppointmentStatus::Scheduled),
                appointment("apt_3", date(2026, 10, 17), 11, AppointmentStatus::Scheduled),
            ],
            loading: false,
            pending_writes: 0,
        }
    }

    #[test]
    fn test_dashboard_picks_first_scheduled_today() {
        let projection = dashboard(&snapshot(), date(2026, 10, 16));

        assert_eq!(projection.todays_count, 2);
        assert_eq!(projection.total_patients, 2);
        assert_eq!(projection.next_session.unwrap().id, "apt_2");
    }

    #[test]
    fn test_patient_search_ignores_case() {
        let projection = patients(&snapshot(), Some("  sMiTh "));
        assert_eq!(projection.total, 1);
        assert_eq!(projection.patients[0].name, "Sarah Smith");

        assert_eq!(patients(&snapshot(), Some("")).total, 2);
    }

    #[test]
    fn test_calendar_grid_is_sunday_first() {
        // October 2026 starts on a Thursday and ends on a Saturday.
        let grid = calendar(&snapshot(), 2026, 10, date(2026, 10, 16)).unwrap();

        assert_eq!(grid.leading_blanks, 4);
        assert_eq!(grid.trailing_blanks, 0);
        assert_eq!(grid.days.len(), 31);
        assert!(grid.days[15].is_today);
        assert_eq!(grid.days[15].appointments.len(), 2);
        assert_eq!(grid.days[16].appointments[0].id, "apt_3");
    }

    #[test]
    fn test_calendar_rejects_bad_month() {
        assert_matches!(
            calendar(&snapshot(), 2026, 13, date(2026, 10, 16)),
            Err(ValidationError::InvalidMonth { month: 13, .. })
        );
    }

    #[test]
    fn test_router_renders_current_view() {
        let mut router = ViewRouter::new();
        let context = ViewContext::for_today(date(2026, 10, 16));
        assert_matches!(router.render(&snapshot(), &context), Ok(Projection::Dashboard(_)));

        assert_eq!(router.navigate(View::Calendar), View::Dashboard);
        assert_matches!(
            router.render(&snapshot(), &context),
            Ok(Projection::Calendar(grid)) if grid.month == 10
        );
    }
}
