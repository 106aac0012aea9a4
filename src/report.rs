//! US macro assessment over the newest stored snapshots
//!
//! An additive score built from US inflation, mag7 breadth and trend, oil
//! and copper. Stale rows are still scored and counted separately.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::{serialize_local_opt, to_local};
use crate::metrics::round_to;
use crate::models::Module;
use crate::storage::SnapshotRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Positive,
    Mixed,
    Cautious,
    Unknown,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Positive => "positive",
            Level::Mixed => "mixed",
            Level::Cautious => "cautious",
            Level::Unknown => "unknown",
        }
    }

    fn from_score(score: i32) -> Self {
        if score >= 3 {
            Level::Positive
        } else if score <= -2 {
            Level::Cautious
        } else {
            Level::Mixed
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            Level::Positive => "The overall US picture looks constructive with a risk-on bias.",
            Level::Mixed => "The overall US picture is mixed without a dominant regime.",
            Level::Cautious => "The overall US picture looks fragile with elevated macro risk.",
            Level::Unknown => "No snapshot data found in the database.",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs that fed the score. Absent inputs are left out of JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataPoints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inflation_us_yoy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mag7_breadth_positive_share: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mag7_avg_day_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mag7_avg_ytd_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brent_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wti_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copper_day_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub score: i32,
    pub level: Level,
    pub summary: String,
    #[serde(serialize_with = "serialize_local_opt")]
    pub fetched_at: Option<DateTime<Utc>>,
    pub reasons: Vec<String>,
    pub data_points: DataPoints,
}

fn pick<'a>(rows: &'a [SnapshotRecord], key: &str) -> Option<&'a SnapshotRecord> {
    rows.iter().find(|row| row.instrument_key == key)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Score the newest snapshot of each instrument.
pub fn assess(rows: &[SnapshotRecord]) -> Assessment {
    if rows.is_empty() {
        return Assessment {
            score: 0,
            level: Level::Unknown,
            summary: Level::Unknown.summary().to_string(),
            fetched_at: None,
            reasons: vec!["Run the scheduler first to populate quote snapshots.".to_string()],
            data_points: DataPoints::default(),
        };
    }

    let mut score = 0;
    let mut reasons = Vec::new();
    let mut points = DataPoints::default();

    match pick(rows, "inflation_us").and_then(|row| row.last) {
        Some(cpi) => {
            points.inflation_us_yoy = Some(cpi);
            if cpi <= 2.5 {
                score += 2;
                reasons.push(format!(
                    "US CPI is low or moderate ({:.2}%), supporting a soft landing.",
                    cpi
                ));
            } else if cpi <= 3.5 {
                reasons.push(format!("US CPI is manageable but above target ({:.2}%).", cpi));
            } else {
                score -= 2;
                reasons.push(format!(
                    "US CPI is high ({:.2}%), raising rate and growth risk.",
                    cpi
                ));
            }
        }
        None => reasons.push("US CPI missing from the latest snapshot.".to_string()),
    }

    let mag7: Vec<&SnapshotRecord> = rows.iter().filter(|row| row.module == Module::Mag7).collect();
    if mag7.is_empty() {
        reasons.push("Mag7 data missing from the latest snapshot.".to_string());
    } else {
        let day: Vec<f64> = mag7.iter().filter_map(|row| row.day_pct).collect();
        let ytd: Vec<f64> = mag7.iter().filter_map(|row| row.ytd_pct).collect();
        let positive = day.iter().filter(|v| **v > 0.0).count();
        // Rows without a day change count against breadth
        let breadth = positive as f64 / mag7.len() as f64;
        let avg_ytd = mean(&ytd);

        points.mag7_breadth_positive_share = Some(round_to(breadth, 3));
        points.mag7_avg_day_pct = mean(&day).map(|v| round_to(v, 3));
        points.mag7_avg_ytd_pct = avg_ytd.map(|v| round_to(v, 3));

        let (word, delta) = if breadth >= 0.6 {
            ("strong", 1)
        } else if breadth <= 0.4 {
            ("weak", -1)
        } else {
            ("mixed", 0)
        };
        score += delta;
        reasons.push(format!(
            "Mag7 breadth is {} ({}/{} positive today).",
            word,
            positive,
            mag7.len()
        ));

        if let Some(avg) = avg_ytd {
            if avg >= 10.0 {
                score += 1;
                reasons.push(format!(
                    "Mag7 year-to-date trend is strong (average YTD {:.1}%).",
                    avg
                ));
            } else if avg <= -5.0 {
                score -= 1;
                reasons.push(format!(
                    "Mag7 year-to-date trend is weak (average YTD {:.1}%).",
                    avg
                ));
            }
        }
    }

    if let Some(brent) = pick(rows, "brent").and_then(|row| row.last) {
        points.brent_usd = Some(brent);
        if brent >= 95.0 {
            score -= 1;
            reasons.push(format!("Brent is high ({:.2}), inflation risk rising.", brent));
        } else if brent <= 60.0 {
            score += 1;
            reasons.push(format!("Brent is low ({:.2}), easing cost pressure.", brent));
        }
    }

    points.wti_usd = pick(rows, "wti").and_then(|row| row.last);

    if let Some(copper) = pick(rows, "copper").and_then(|row| row.day_pct) {
        points.copper_day_pct = Some(copper);
        if copper > 1.0 {
            score += 1;
            reasons.push(format!(
                "Copper is rising clearly today ({:.2}%), supporting cyclical activity.",
                copper
            ));
        } else if copper < -1.0 {
            score -= 1;
            reasons.push(format!(
                "Copper is falling clearly today ({:.2}%), a weaker growth signal.",
                copper
            ));
        }
    }

    let stale_count = rows.iter().filter(|row| row.is_stale).count();
    points.stale_count = Some(stale_count);
    if stale_count > 0 {
        reasons.push(format!("Data quality: {} instruments marked stale.", stale_count));
    }

    let level = Level::from_score(score);
    Assessment {
        score,
        level,
        summary: level.summary().to_string(),
        fetched_at: rows.iter().map(|row| row.fetched_at).max(),
        reasons,
        data_points: points,
    }
}

impl Assessment {
    /// Markdown document with level, latest fetch, summary and drivers.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# US macro assessment\n\n");
        out.push_str(&format!("- **Level:** `{}` (score `{}`)\n", self.level, self.score));
        if let Some(at) = self.fetched_at {
            out.push_str(&format!("- **Latest fetch:** `{}`\n", to_local(at).to_rfc3339()));
        }
        out.push_str(&format!("- **Summary:** {}\n\n## Drivers\n\n", self.summary));
        for reason in &self.reasons {
            out.push_str(&format!("- {}\n", reason));
        }
        out
    }
}
