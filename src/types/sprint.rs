use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprint {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

impl Sprint {
    pub fn has_valid_range(&self) -> bool {
        self.end_date >= self.start_date
    }
}

#[derive(Debug, Clone)]
pub struct NewSprint {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

pub const SPRINT_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_sprint_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), SPRINT_DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sprint_date_accepts_iso_days_only() {
        assert_eq!(
            parse_sprint_date("2026-02-03"),
            NaiveDate::from_ymd_opt(2026, 2, 3)
        );
        assert_eq!(parse_sprint_date("03/02/2026"), None);
        assert_eq!(parse_sprint_date("2026-02-30"), None);
    }

    #[test]
    fn range_allows_single_day_sprints() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let sprint = Sprint {
            id: 1,
            name: "S1".into(),
            start_date: day,
            end_date: day,
            is_active: false,
        };
        assert!(sprint.has_valid_range());
        let backwards = Sprint {
            end_date: day.pred_opt().unwrap(),
            ..sprint
        };
        assert!(!backwards.has_valid_range());
    }
}
