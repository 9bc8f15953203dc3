//! Quote formatting and export
//!
//! Text tables for the terminal and a `QuoteDocument` written as JSON or CSV.
//! Layout of the printed quotation belongs to the front end.

use crate::bundling::{BundleResult, FactorSelection};
use crate::credit::{CreditQuote, PolicyIdentity, ScenarioStatus};
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;

/// `0.022523 -> "2.2523%"` at four decimals
pub fn format_percent(rate: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, rate * 100.0)
}

/// Intermediate values followed by one line per acquisition scenario
pub fn format_credit_quote(quote: &CreditQuote) -> String {
    let b = &quote.breakdown;
    let mut out = String::new();

    out.push_str(&format!(
        "{} / {} / {} ({})\n",
        quote.inputs.province, quote.inputs.bank_type, quote.inputs.sector, quote.inputs.credit_type
    ));
    out.push_str(&format!("  NPL:            {}\n", format_percent(b.npl, 4)));
    out.push_str(&format!(
        "  Relativity:     {:.4} x {:.4} x {:.4} = {:.4}{}\n",
        b.rel_province,
        b.rel_bank,
        b.rel_sector,
        b.total_relativity,
        if b.relativity_capped { " (capped)" } else { "" }
    ));
    out.push_str(&format!("  Probability:    {}\n", format_percent(b.probability, 4)));
    out.push_str(&format!("  Severity:       {:.6}\n", b.severity));
    out.push_str(&format!("  Pure rate:      {}\n", format_percent(b.pure_rate, 4)));
    out.push('\n');

    out.push_str(&format!("  {:>12}  {:>12}\n", "Acquisition", "Gross rate"));
    out.push_str(&format!("  {:-<12}  {:-<12}\n", "", ""));
    for s in &quote.scenarios {
        let rate = match (s.gross_rate, s.status) {
            (Some(rate), _) => format_percent(rate, 4),
            (None, ScenarioStatus::Invalid { denominator }) => format!("invalid ({:.4})", denominator),
            (None, ScenarioStatus::Valid) => "-".to_string(),
        };
        out.push_str(&format!("  {:>12}  {:>12}\n", format_percent(s.acquisition, 1), rate));
    }

    out
}

pub fn format_bundle(result: &BundleResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{:>3}  {:<20} {:<20} {:>10} {:>8} {:>10}\n",
        "#", "Coverage", "Subcover", "Base", "Acq", "Adjusted"
    ));
    out.push_str(&format!("{:-<76}\n", ""));
    for line in &result.lines {
        out.push_str(&format!(
            "{:>3}  {:<20} {:<20} {:>10} {:>8} {:>10}\n",
            line.number,
            line.coverage,
            line.subcover,
            format_percent(line.base_rate, 4),
            format_percent(line.acquisition, 1),
            format_percent(line.adjusted_rate, 4)
        ));
        for (column, value) in &line.factors {
            out.push_str(&format!("       {}: {}\n", column, value));
        }
    }
    out.push_str(&format!("{:-<76}\n", ""));
    out.push_str(&format!("Total rate: {}\n", format_percent(result.total_rate, 4)));

    out
}

/// `Okupasi=Rumah Tinggal; Kelas Konstruksi=1`
fn format_factors(factors: &FactorSelection) -> String {
    factors
        .iter()
        .map(|(column, value)| format!("{}={}", column, value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// One priced line of an exported quote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteRow {
    pub item: String,
    /// Selected factor values of a bundle line
    #[serde(skip_serializing_if = "FactorSelection::is_empty")]
    pub factors: FactorSelection,
    pub acquisition: f64,
    /// Absent for invalid scenarios
    pub rate: Option<f64>,
    pub rate_display: String,
}

/// Exportable quotation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteDocument {
    pub product: String,
    pub identity: PolicyIdentity,
    pub generated_on: NaiveDate,
    pub rows: Vec<QuoteRow>,
    /// Bundle total; not set for credit quotes
    pub total_rate: Option<f64>,
}

impl QuoteDocument {
    pub fn from_credit(quote: &CreditQuote, generated_on: NaiveDate) -> Self {
        let rows = quote
            .scenarios
            .iter()
            .map(|s| QuoteRow {
                item: format!("Acquisition {}", format_percent(s.acquisition, 1)),
                factors: FactorSelection::new(),
                acquisition: s.acquisition,
                rate: s.gross_rate,
                rate_display: s
                    .gross_rate
                    .map(|r| format_percent(r, 4))
                    .unwrap_or_else(|| "invalid".to_string()),
            })
            .collect();

        Self {
            product: format!("credit ({})", quote.inputs.credit_type),
            identity: quote.inputs.identity.clone().unwrap_or_default(),
            generated_on,
            rows,
            total_rate: None,
        }
    }

    pub fn from_bundle(result: &BundleResult, identity: PolicyIdentity, generated_on: NaiveDate) -> Self {
        let rows = result
            .lines
            .iter()
            .map(|line| QuoteRow {
                item: format!("{} - {}", line.coverage, line.subcover),
                factors: line.factors.clone(),
                acquisition: line.acquisition,
                rate: Some(line.adjusted_rate),
                rate_display: format_percent(line.adjusted_rate, 4),
            })
            .collect();

        Self {
            product: "bundling".to_string(),
            identity,
            generated_on,
            rows,
            total_rate: Some(result.total_rate),
        }
    }

    /// Suggested export file name, e.g. `quote_PKS-001_2024-05-01.json`
    pub fn file_name(&self, extension: &str) -> String {
        let reference = [&self.identity.policy_number, &self.identity.pks_number]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .map(|s| s.trim().replace(['/', '\\', ' '], "-"))
            .unwrap_or_else(|| "draft".to_string());
        format!("quote_{}_{}.{}", reference, self.generated_on.format("%Y-%m-%d"), extension)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Identity block as key/value rows, then the priced rows
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);

        wtr.write_record(["product", self.product.as_str()])?;
        let generated_on = self.generated_on.to_string();
        wtr.write_record(["generated_on", generated_on.as_str()])?;
        wtr.write_record(["insured_name", self.identity.insured_name.as_str()])?;
        wtr.write_record(["bank_name", self.identity.bank_name.as_str()])?;
        wtr.write_record(["policy_number", self.identity.policy_number.as_str()])?;
        wtr.write_record(["pks_number", self.identity.pks_number.as_str()])?;

        wtr.write_record(["item", "factors", "acquisition", "rate", "rate_display"])?;
        for row in &self.rows {
            wtr.write_record([
                row.item.clone(),
                format_factors(&row.factors),
                format!("{:.4}", row.acquisition),
                row.rate.map(|r| format!("{:.8}", r)).unwrap_or_default(),
                row.rate_display.clone(),
            ])?;
        }
        if let Some(total) = self.total_rate {
            wtr.write_record([
                "total".to_string(),
                String::new(),
                String::new(),
                format!("{:.8}", total),
                format_percent(total, 4),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }
}
