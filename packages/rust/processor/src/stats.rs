//! Summary statistics over processed program records.

use std::collections::BTreeMap;

use serde::Serialize;

use execadvisor_shared::ProgramRecord;

/// Min/max/average over a numeric field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl Range {
    fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        Some(Self { min, max, avg })
    }
}

/// Aggregate view of a processed dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramStats {
    pub total_programs: usize,
    /// Value counts of the `language` field.
    pub languages: BTreeMap<String, usize>,
    /// Value counts of the `location` field.
    pub locations: BTreeMap<String, usize>,
    /// Over records with a normalized duration; `None` when there are none.
    pub duration_months: Option<Range>,
    /// Per currency, over records with a normalized amount.
    pub costs: BTreeMap<String, Range>,
}

/// Compute [`ProgramStats`] for a set of records.
pub fn generate_stats(records: &[ProgramRecord]) -> ProgramStats {
    let mut languages = BTreeMap::new();
    let mut locations = BTreeMap::new();
    let mut durations = Vec::new();
    let mut amounts: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for record in records {
        *languages.entry(record.language.clone()).or_insert(0) += 1;
        *locations.entry(record.location.clone()).or_insert(0) += 1;

        if let Some(months) = record.duration.months {
            durations.push(f64::from(months));
        }
        if let (Some(amount), Some(currency)) = (record.costs.amount, &record.costs.currency) {
            amounts.entry(currency.clone()).or_default().push(amount);
        }
    }

    let costs = amounts
        .into_iter()
        .filter_map(|(currency, values)| Range::from_values(&values).map(|r| (currency, r)))
        .collect();

    ProgramStats {
        total_programs: records.len(),
        languages,
        locations,
        duration_months: Range::from_values(&durations),
        costs,
    }
}

impl std::fmt::Display for ProgramStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Programs: {}", self.total_programs)?;
        writeln!(f, "Languages:")?;
        for (lang, n) in &self.languages {
            writeln!(f, "  {lang}: {n}")?;
        }
        writeln!(f, "Locations:")?;
        for (loc, n) in &self.locations {
            writeln!(f, "  {loc}: {n}")?;
        }
        if let Some(d) = &self.duration_months {
            writeln!(
                f,
                "Duration (months): min {:.0}, max {:.0}, avg {:.1}",
                d.min, d.max, d.avg
            )?;
        }
        for (currency, r) in &self.costs {
            writeln!(
                f,
                "Costs ({currency}): min {:.0}, max {:.0}, avg {:.0}",
                r.min, r.max, r.avg
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process_program;
    use execadvisor_shared::RawProgram;

    fn raw(url: &str, duration: &str, costs: &str, language: &str) -> RawProgram {
        let mut raw: RawProgram =
            serde_json::from_value(serde_json::json!({ "url": url })).expect("raw");
        raw.duration = duration.into();
        raw.costs = costs.into();
        raw.language = language.into();
        raw.location = "St.Gallen".into();
        raw
    }

    #[test]
    fn stats_over_mixed_records() {
        let records: Vec<_> = [
            raw("https://emba.unisg.ch/a", "18 months", "CHF 60,000", "English"),
            raw("https://emba.unisg.ch/b", "2 years", "CHF 80,000", "German"),
            raw("https://emba.unisg.ch/c", "Not specified", "EUR 40,000", "English"),
        ]
        .iter()
        .map(process_program)
        .collect();

        let stats = generate_stats(&records);
        assert_eq!(stats.total_programs, 3);
        assert_eq!(stats.languages["English"], 2);
        assert_eq!(stats.locations["St.Gallen"], 3);

        let d = stats.duration_months.expect("durations");
        assert_eq!(d.min, 18.0);
        assert_eq!(d.max, 24.0);
        assert_eq!(d.avg, 21.0);

        let chf = &stats.costs["CHF"];
        assert_eq!(chf.min, 60000.0);
        assert_eq!(chf.avg, 70000.0);
        assert_eq!(stats.costs["EUR"].max, 40000.0);
    }

    #[test]
    fn empty_dataset() {
        let stats = generate_stats(&[]);
        assert_eq!(stats.total_programs, 0);
        assert!(stats.duration_months.is_none());
        assert!(stats.costs.is_empty());
        assert!(stats.to_string().contains("Programs: 0"));
    }
}
