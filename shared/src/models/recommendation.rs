//! Control recommendation buckets

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Monthly average below this percentage needs no control
pub fn no_control_limit() -> Decimal {
    Decimal::new(5, 1)
}

/// Monthly average above this percentage needs control within three months
pub fn low_activity_limit() -> Decimal {
    Decimal::from(5)
}

/// Month-over-month increase (percentage points) that flags a new outbreak
pub fn sharp_increase_limit() -> Decimal {
    Decimal::from(8)
}

/// Recommendation assigned to a farm or stand on a given date
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecommendationBucket {
    /// No defoliation (< 0.5 % monthly average)
    #[serde(rename = "SDD")]
    NoDefoliation,
    /// Low activity (0.5 % – 5 %): control within 9 months
    #[serde(rename = "Controle 9M")]
    Control9Months,
    /// Medium to high activity (> 5 %): control within 3 months
    #[serde(rename = "Controle 3M")]
    Control3Months,
    /// Sharp month-over-month increase (> 8 points)
    #[serde(rename = "Outra Desfolha")]
    OtherDefoliation,
}

impl RecommendationBucket {
    pub const ALL: [RecommendationBucket; 4] = [
        RecommendationBucket::NoDefoliation,
        RecommendationBucket::Control9Months,
        RecommendationBucket::Control3Months,
        RecommendationBucket::OtherDefoliation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RecommendationBucket::NoDefoliation => "SDD",
            RecommendationBucket::Control9Months => "Controle 9M",
            RecommendationBucket::Control3Months => "Controle 3M",
            RecommendationBucket::OtherDefoliation => "Outra Desfolha",
        }
    }

    /// Field guidance shown next to the bucket in recommendation tables
    pub fn guidance(&self) -> &'static str {
        match self {
            RecommendationBucket::NoDefoliation => "Sem infestação: seguir monitorando",
            RecommendationBucket::Control9Months => {
                "Infestação com baixa atividade: Controle nos próximos 9 meses"
            }
            RecommendationBucket::Control3Months => {
                "Infestação com média a alta atividade: Controle nos próximos 3 meses"
            }
            RecommendationBucket::OtherDefoliation => {
                "Aumento expressivo da desfolha: monitorar nos próximos meses"
            }
        }
    }
}

impl std::fmt::Display for RecommendationBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Assign a bucket from the monthly average percentage and the change since
/// the previous observation date.
///
/// A sharp increase takes precedence over every threshold bucket. Without a
/// defined average (unknown or zero boundary area) no bucket applies.
pub fn assign_bucket(
    monthly_average: Option<Decimal>,
    percentage_delta: Option<Decimal>,
) -> Option<RecommendationBucket> {
    if percentage_delta.is_some_and(|delta| delta > sharp_increase_limit()) {
        return Some(RecommendationBucket::OtherDefoliation);
    }
    let average = monthly_average?;
    let bucket = if average < no_control_limit() {
        RecommendationBucket::NoDefoliation
    } else if average <= low_activity_limit() {
        RecommendationBucket::Control9Months
    } else {
        RecommendationBucket::Control3Months
    };
    Some(bucket)
}

/// Total area assigned to one bucket
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendationLine {
    pub bucket: RecommendationBucket,
    pub label: &'static str,
    pub area_ha: Decimal,
    pub guidance: &'static str,
}

/// Sum area per bucket; every bucket appears once, in [`RecommendationBucket::ALL`] order
pub fn summarize_recommendations<I>(rows: I) -> Vec<RecommendationLine>
where
    I: IntoIterator<Item = (Option<RecommendationBucket>, Option<Decimal>)>,
{
    let mut totals = [Decimal::ZERO; 4];
    for (bucket, area) in rows {
        if let (Some(bucket), Some(area)) = (bucket, area) {
            let index = RecommendationBucket::ALL
                .iter()
                .position(|b| *b == bucket)
                .unwrap_or_default();
            totals[index] += area;
        }
    }

    RecommendationBucket::ALL
        .iter()
        .zip(totals)
        .map(|(bucket, area_ha)| RecommendationLine {
            bucket: *bucket,
            label: bucket.label(),
            area_ha,
            guidance: bucket.guidance(),
        })
        .collect()
}
