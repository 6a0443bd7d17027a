//! Day and slot availability labels for calendar rendering.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Coarse availability of one calendar day for one doctor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DayState {
    Available,
    FewLeft,
    Full,
    NotAvailable,
}

impl DayState {
    /// Classify a day by its number of bookable slots.
    #[must_use]
    pub fn from_unbooked(unbooked: usize, few_left_threshold: usize) -> Self {
        if unbooked == 0 {
            Self::Full
        } else if unbooked <= few_left_threshold {
            Self::FewLeft
        } else {
            Self::Available
        }
    }

    /// Human-readable legend label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Available => "Slots available",
            Self::FewLeft => "Few left",
            Self::Full => "Full",
            Self::NotAvailable => "Not available",
        }
    }

    /// Whether the day can be selected in a calendar.
    #[must_use]
    pub fn is_selectable(self) -> bool {
        matches!(self, Self::Available | Self::FewLeft)
    }
}

impl std::fmt::Display for DayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::FewLeft => write!(f, "few-left"),
            Self::Full => write!(f, "full"),
            Self::NotAvailable => write!(f, "not-available"),
        }
    }
}

/// Scarcity label of a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotLabel {
    Available,
    FewLeft,
    Full,
}

impl std::fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "Available"),
            Self::FewLeft => write!(f, "Few left"),
            Self::Full => write!(f, "Full"),
        }
    }
}

/// A slot as shown in the time picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub time: NaiveTime,
    pub bookable: bool,
    pub label: SlotLabel,
}

/// One cell of a month calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub state: DayState,
}
