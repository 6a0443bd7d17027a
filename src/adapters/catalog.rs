//! In-memory schedule catalog.
//!
//! Templates are loaded once (from the system of record, or generated by
//! [`InMemoryCatalog::demo`]) and never change afterwards.

use std::collections::HashMap;

use chrono::{Days, NaiveDate, NaiveTime, Weekday};

use crate::domain::{BaselineCapacity, Department, Doctor, DoctorId, ScheduleSlot};
use crate::ports::ScheduleCatalog;

/// Days of templates generated by the demo catalog.
const DEMO_HORIZON_DAYS: u64 = 60;

/// Slot times used by every demo day.
const DEMO_TIMES: [(u32, u32); 9] = [
    (10, 0),
    (10, 20),
    (10, 40),
    (11, 0),
    (11, 20),
    (11, 40),
    (12, 0),
    (12, 20),
    (12, 40),
];

#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    departments: Vec<Department>,
    doctors: Vec<Doctor>,
    templates: HashMap<(DoctorId, NaiveDate), Vec<ScheduleSlot>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_department(&mut self, department: Department) -> &mut Self {
        self.departments.push(department);
        self
    }

    pub fn add_doctor(&mut self, doctor: Doctor) -> &mut Self {
        self.doctors.push(doctor);
        self
    }

    /// Install the template for one doctor-day, replacing any previous one.
    ///
    /// Slots keep the given order.
    pub fn set_day(
        &mut self,
        doctor: &DoctorId,
        date: NaiveDate,
        slots: &[(NaiveTime, BaselineCapacity)],
    ) -> &mut Self {
        let template = slots
            .iter()
            .map(|&(time, baseline)| ScheduleSlot {
                doctor_id: doctor.clone(),
                date,
                time,
                baseline,
            })
            .collect();
        self.templates.insert((doctor.clone(), date), template);
        self
    }

    /// Number of doctor-days with a template.
    #[must_use]
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Demo catalog covering 60 days from `start`.
    ///
    /// Scarcity follows the day offset `i` from `start`:
    /// - `i % 5 == 0`: the first three slots are exhausted upstream
    /// - `i % 3 == 0`: the last slot is scarce
    /// - `i == 1` for d1 and `i == 2` for d2: the whole day is exhausted
    #[must_use]
    pub fn demo(start: NaiveDate) -> Self {
        let mut catalog = Self::new();

        for (id, name) in [
            ("gm", "General Medicine"),
            ("card", "Cardiology"),
            ("ortho", "Orthopaedics"),
            ("obg", "OB-GYN"),
            ("ped", "Paediatrics"),
            ("derm", "Dermatology"),
            ("ent", "ENT"),
        ] {
            catalog.add_department(Department::new(id, name));
        }

        let doctors = [
            Doctor::new("d1", "Dr. A. Sharma")
                .in_departments(&["card", "gm"])
                .closed_on(&[Weekday::Wed]),
            Doctor::new("d2", "Dr. R. Mehta")
                .in_departments(&["gm"])
                .closed_on(&[Weekday::Tue]),
            Doctor::new("d3", "Dr. S. Iyer")
                .in_departments(&["derm", "ent"])
                .closed_on(&[Weekday::Sat, Weekday::Sun]),
        ];

        let times: Vec<NaiveTime> = DEMO_TIMES
            .iter()
            .filter_map(|&(h, m)| NaiveTime::from_hms_opt(h, m, 0))
            .collect();

        for doctor in doctors {
            for offset in 0..DEMO_HORIZON_DAYS {
                let Some(date) = start.checked_add_days(Days::new(offset)) else {
                    break;
                };
                if !doctor.works_on(date) {
                    continue;
                }

                let whole_day_exhausted = (offset == 1 && doctor.id.as_str() == "d1")
                    || (offset == 2 && doctor.id.as_str() == "d2");

                let slots: Vec<(NaiveTime, BaselineCapacity)> = times
                    .iter()
                    .enumerate()
                    .map(|(idx, &time)| {
                        let baseline = if whole_day_exhausted || (offset % 5 == 0 && idx < 3) {
                            BaselineCapacity::Exhausted
                        } else if offset % 3 == 0 && idx == times.len() - 1 {
                            BaselineCapacity::Scarce
                        } else {
                            BaselineCapacity::Plenty
                        };
                        (time, baseline)
                    })
                    .collect();

                catalog.set_day(&doctor.id, date, &slots);
            }
            catalog.add_doctor(doctor);
        }

        tracing::debug!(
            "Built demo catalog: {} doctors, {} doctor-days",
            catalog.doctors.len(),
            catalog.template_count()
        );

        catalog
    }
}

impl ScheduleCatalog for InMemoryCatalog {
    fn doctor(&self, id: &DoctorId) -> Option<Doctor> {
        self.doctors.iter().find(|d| &d.id == id).cloned()
    }

    fn doctors(&self) -> Vec<Doctor> {
        self.doctors.clone()
    }

    fn departments(&self) -> Vec<Department> {
        self.departments.clone()
    }

    fn day_template(&self, doctor: &DoctorId, date: NaiveDate) -> Option<Vec<ScheduleSlot>> {
        self.templates.get(&(doctor.clone(), date)).cloned()
    }
}
