//! "Installment N/M" labels on a project's incomes.

use once_cell::sync::Lazy;
use regex::Regex;

use tto_domain::Income;

static LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Installment \d+/\d+(?:\s*-\s*)?").expect("installment label pattern")
});

/// Returns the description with any installment label removed.
pub fn strip_label(description: &str) -> &str {
    match LABEL.find(description) {
        Some(found) => description[found.end()..].trim(),
        None => description.trim(),
    }
}

pub fn is_labeled(description: &str) -> bool {
    LABEL.is_match(description)
}

fn label_for(position: usize, total: usize, rest: &str) -> String {
    if rest.is_empty() {
        format!("Installment {position}/{total}")
    } else {
        format!("Installment {position}/{total} - {rest}")
    }
}

/// Renumbers installment labels across all incomes of one project and returns
/// the incomes whose description changed.
///
/// Incomes are ordered by income date, then creation time. Only incomes with an
/// empty description or an existing label are rewritten; free-text descriptions
/// keep their wording but still count towards the numbering.
pub fn relabel(incomes: &[Income]) -> Vec<Income> {
    let mut ordered: Vec<&Income> = incomes.iter().collect();
    ordered.sort_by(|a, b| {
        a.income_date
            .cmp(&b.income_date)
            .then(a.created_at.cmp(&b.created_at))
    });
    let total = ordered.len();
    ordered
        .into_iter()
        .enumerate()
        .filter(|(_, income)| income.description.trim().is_empty() || is_labeled(&income.description))
        .filter_map(|(idx, income)| {
            let wanted = label_for(idx + 1, total, strip_label(&income.description));
            (wanted != income.description).then(|| {
                let mut updated = income.clone();
                updated.description = wanted;
                updated
            })
        })
        .collect()
}
