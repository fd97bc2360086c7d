//! Premium plan definitions and calendar durations.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, ValidationError};

/// Premium plan purchased by a subscription.
///
/// Selects the length of the granted period. Lengths are calendar units,
/// never fixed day counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// One calendar month.
    Monthly,

    /// Three calendar months.
    Quarterly,

    /// One calendar year.
    Yearly,
}

impl PlanType {
    /// Length of the plan in calendar months.
    pub fn calendar_months(&self) -> u32 {
        match self {
            PlanType::Monthly => 1,
            PlanType::Quarterly => 3,
            PlanType::Yearly => 12,
        }
    }

    /// Computes the end of a period of this plan starting at `start`.
    ///
    /// Day-of-month overflow rolls back to the last valid day of the target
    /// month (Jan 31 + 1 month = Feb 28/29, Feb 29 + 1 year = Feb 28).
    /// Returns `None` only when the result is out of the representable range.
    pub fn end_date_from(&self, start: Timestamp) -> Option<Timestamp> {
        start.add_calendar_months(self.calendar_months())
    }

    /// Returns the display name for this plan.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanType::Monthly => "Monthly Plan",
            PlanType::Quarterly => "Quarterly Plan",
            PlanType::Yearly => "Yearly Plan",
        }
    }

    /// Stable lower-case name, used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Monthly => "monthly",
            PlanType::Quarterly => "quarterly",
            PlanType::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for PlanType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(PlanType::Monthly),
            "quarterly" => Ok(PlanType::Quarterly),
            "yearly" => Ok(PlanType::Yearly),
            other => Err(ValidationError::invalid_format(
                "plan_type",
                format!("unrecognized plan '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Timestamp {
        Timestamp::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn monthly_from_jan_31_lands_on_leap_february() {
        let end = PlanType::Monthly.end_date_from(date(2024, 1, 31)).unwrap();
        assert_eq!(end, date(2024, 2, 29));
    }

    #[test]
    fn monthly_from_jan_31_lands_on_common_february() {
        let end = PlanType::Monthly.end_date_from(date(2023, 1, 31)).unwrap();
        assert_eq!(end, date(2023, 2, 28));
    }

    #[test]
    fn yearly_from_leap_day_lands_on_feb_28() {
        let end = PlanType::Yearly.end_date_from(date(2024, 2, 29)).unwrap();
        assert_eq!(end, date(2025, 2, 28));
    }

    #[test]
    fn quarterly_from_nov_30_crosses_year_and_clamps() {
        let end = PlanType::Quarterly.end_date_from(date(2023, 11, 30)).unwrap();
        assert_eq!(end, date(2024, 2, 29));
    }

    #[test]
    fn quarterly_is_not_ninety_days() {
        let start = date(2024, 1, 1);
        let end = PlanType::Quarterly.end_date_from(start).unwrap();
        assert_eq!(end, date(2024, 4, 1));
        assert_eq!(end.duration_since(&start).num_days(), 91);
    }

    #[test]
    fn display_names_are_correct() {
        assert_eq!(PlanType::Monthly.display_name(), "Monthly Plan");
        assert_eq!(PlanType::Quarterly.display_name(), "Quarterly Plan");
        assert_eq!(PlanType::Yearly.display_name(), "Yearly Plan");
    }

    #[test]
    fn parses_known_plans_and_rejects_others() {
        assert_eq!("QUARTERLY".parse::<PlanType>(), Ok(PlanType::Quarterly));
        assert_eq!(" yearly ".parse::<PlanType>(), Ok(PlanType::Yearly));
        let err = "weekly".parse::<PlanType>().unwrap_err();
        assert_eq!(err.field(), "plan_type");
    }

    #[test]
    fn plan_serializes_lowercase() {
        let json = serde_json::to_string(&PlanType::Monthly).unwrap();
        assert_eq!(json, "\"monthly\"");
    }
}
