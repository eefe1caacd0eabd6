//! Common types used across the platform

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Language used for month labels in reports and charts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum MonthLocale {
    #[default]
    #[serde(rename = "pt-BR", alias = "pt_BR", alias = "pt")]
    PtBr,
    #[serde(rename = "en", alias = "en-US")]
    English,
}

const MONTHS_PT_BR: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

const MONTHS_EN: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

impl MonthLocale {
    pub fn code(&self) -> &'static str {
        match self {
            MonthLocale::PtBr => "pt-BR",
            MonthLocale::English => "en",
        }
    }

    /// Lower-case abbreviated month name, `month` is 1-based
    pub fn month_abbrev(&self, month: u32) -> &'static str {
        let table = match self {
            MonthLocale::PtBr => &MONTHS_PT_BR,
            MonthLocale::English => &MONTHS_EN,
        };
        let index = (month.clamp(1, 12) - 1) as usize;
        table[index]
    }

    pub fn format_month(&self, date: NaiveDate) -> String {
        self.month_abbrev(date.month()).to_string()
    }
}

/// Calendar month used to group observations for monthly averages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn label(&self, locale: MonthLocale) -> String {
        format!("{}/{}", locale.month_abbrev(self.month), self.year)
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Axis-aligned extent in the coordinates of some CRS
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn from_point(x: f64, y: f64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Build the smallest box covering every point, `None` for an empty iterator
    pub fn covering<I>(points: I) -> Option<BoundingBox>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let mut bbox = BoundingBox::from_point(x, y);
        for (x, y) in iter {
            bbox.include(x, y);
        }
        Some(bbox)
    }

    /// Same layout as a GeoPandas `total_bounds` array
    pub fn as_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_abbrev_pt_br() {
        assert_eq!(MonthLocale::PtBr.month_abbrev(2), "fev");
        assert_eq!(MonthLocale::PtBr.month_abbrev(12), "dez");
        assert_eq!(MonthLocale::English.month_abbrev(5), "may");
    }

    #[test]
    fn test_format_month_uses_explicit_locale() {
        let date = NaiveDate::from_ymd_opt(2024, 8, 15).unwrap();
        assert_eq!(MonthLocale::PtBr.format_month(date), "ago");
        assert_eq!(MonthLocale::English.format_month(date), "aug");
    }

    #[test]
    fn test_year_month_ordering() {
        let dec = YearMonth { year: 2023, month: 12 };
        let jan = YearMonth { year: 2024, month: 1 };
        assert!(dec < jan);
        assert_eq!(jan.label(MonthLocale::PtBr), "jan/2024");
        assert_eq!(dec.to_string(), "2023-12");
    }

    #[test]
    fn test_bounding_box_covering() {
        let bbox = BoundingBox::covering(vec![(1.0, 5.0), (-2.0, 3.0), (4.0, 8.0)]).unwrap();
        assert_eq!(bbox.as_array(), [-2.0, 3.0, 4.0, 8.0]);
        assert_eq!(bbox.width(), 6.0);
        assert!(BoundingBox::covering(Vec::<(f64, f64)>::new()).is_none());
    }
}
