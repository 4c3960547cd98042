//! Per-poll status report and its text/JSON renderings.

use crate::{
    engine::{CertificateValidity, DerivedMetrics, Staleness},
    models::Warning,
};
use chrono::{DateTime, Local, SecondsFormat, TimeDelta, Utc};
use colored::Colorize;
use serde::Serialize;

/// Clears the terminal and homes the cursor.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReportLine {
    Info(String),
    Warning(Warning),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub lines: Vec<ReportLine>,
}

impl Section {
    pub fn new(title: &str, lines: Vec<ReportLine>) -> Self {
        Self {
            title: title.to_owned(),
            lines,
        }
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
        self.lines.iter().filter_map(|line| match line {
            ReportLine::Warning(warning) => Some(warning),
            ReportLine::Info(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<Section>,
    pub metrics: DerivedMetrics,
}

impl StatusReport {
    /// Every warning in the report, in rule order.
    pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
        self.sections.iter().flat_map(Section::warnings)
    }

    pub fn render_text(&self, color: bool) -> String {
        let label = if color {
            "WARNING".red().bold().to_string()
        } else {
            "WARNING".to_owned()
        };

        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&format!("\n{}:\n", section.title));
            for line in &section.lines {
                let rendered = match line {
                    ReportLine::Info(text) => format!("{text}\n"),
                    ReportLine::Warning(warning) => format!("{label}: {warning}\n"),
                };
                out.push_str(&rendered);
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Compact `1d 2h 3m 4s` rendering, `-` prefixed when negative.
pub fn format_duration(delta: TimeDelta) -> String {
    let sign = if delta < TimeDelta::zero() { "-" } else { "" };
    let total = delta.num_seconds().unsigned_abs();
    let (days, hours, minutes, seconds) = (
        total / 86_400,
        total % 86_400 / 3_600,
        total % 3_600 / 60,
        total % 60,
    );

    let parts: Vec<String> = [(days, "d"), (hours, "h"), (minutes, "m")]
        .into_iter()
        .skip_while(|(value, _)| *value == 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .chain(std::iter::once(format!("{seconds}s")))
        .collect();

    format!("{sign}{}", parts.join(" "))
}

pub fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at
            .with_timezone(&Local)
            .to_rfc3339_opts(SecondsFormat::Secs, false),
        None => "never".to_owned(),
    }
}

pub fn format_staleness(staleness: &Staleness) -> String {
    match staleness {
        Staleness::Never => "never observed".to_owned(),
        Staleness::Since(elapsed) if *elapsed < TimeDelta::zero() => {
            format!("{} in the future", format_duration(-*elapsed))
        }
        Staleness::Since(elapsed) => format!("{} ago", format_duration(*elapsed)),
    }
}

pub fn format_validity(validity: &CertificateValidity) -> String {
    match validity {
        CertificateValidity::Unknown => "validity unknown".to_owned(),
        CertificateValidity::Remaining(left) if *left > TimeDelta::zero() => {
            format!("expires in {}", format_duration(*left))
        }
        CertificateValidity::Remaining(left) => format!("expired {} ago", format_duration(-*left)),
    }
}

pub fn format_rate(rate: f64) -> String {
    format!("{rate:.3}")
}
