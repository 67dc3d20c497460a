//! Terminal formatting for tables and fit diagnostics.
//!
//! Formatting lives here so the flows stay free of presentation detail.

use serde_json::Value;

use crate::fit::FittedModel;

use super::TableArtifact;

const MAX_CELL: usize = 24;

/// Render a table artifact as a header line, a rule, and aligned rows.
pub fn format_artifact(artifact: &TableArtifact) -> String {
    let cells: Vec<Vec<String>> = artifact
        .rows
        .iter()
        .map(|row| row.iter().map(|v| truncate(&fmt_cell(v), MAX_CELL)).collect())
        .collect();

    let widths: Vec<usize> = artifact
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    out.push_str(&format!("=== {} ({}) ===\n", artifact.description, artifact.key));

    let header: Vec<String> = artifact
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, &w)| format!("{name:<w$}"))
        .collect();
    out.push_str(header.join(" ").trim_end());
    out.push('\n');

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join(" "));
    out.push('\n');

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:>w$}"))
            .collect();
        out.push_str(line.join(" ").trim_end());
        out.push('\n');
    }
    if cells.is_empty() {
        out.push_str("(no rows)\n");
    }

    out
}

/// One block describing the fitted model.
pub fn format_fit_summary(model: &FittedModel) -> String {
    let fit = &model.fit;
    let params = &fit.params;
    let mut out = String::new();

    out.push_str(&format!(
        "SARIMA{}x{} on {} observations (last {})\n",
        fit.model.regular(),
        fit.model.seasonal(),
        model.n_obs,
        model.last_date
    ));
    if params.ar.is_empty() && params.ma.is_empty() && params.seasonal_ar.is_empty() && params.seasonal_ma.is_empty()
    {
        out.push_str("- no ARMA coefficients\n");
    }
    if !params.ar.is_empty() {
        out.push_str(&format!("- ar  : {}\n", fmt_vec(&params.ar)));
    }
    if !params.ma.is_empty() {
        out.push_str(&format!("- ma  : {}\n", fmt_vec(&params.ma)));
    }
    if !params.seasonal_ar.is_empty() {
        out.push_str(&format!("- sar : {}\n", fmt_vec(&params.seasonal_ar)));
    }
    if !params.seasonal_ma.is_empty() {
        out.push_str(&format!("- sma : {}\n", fmt_vec(&params.seasonal_ma)));
    }
    out.push_str(&format!(
        "- sigma2={:.6} aic={} bic={} iterations={}\n",
        fit.sigma2,
        fmt_opt(fit.aic),
        fmt_opt(fit.bic),
        fit.iterations
    ));

    out
}

fn fmt_cell(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(x) if n.is_f64() => format!("{x:.3}"),
            _ => n.to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.3}")).unwrap_or_else(|| "n/a".to_string())
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
