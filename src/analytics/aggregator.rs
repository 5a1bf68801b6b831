use chrono::Datelike;

use crate::types::{Idea, Sale, Totals, YearReport};

/// Build the report for one calendar year (UTC).
///
/// Records outside `year` are ignored, so callers may pass a wider set than
/// the year itself. Revenue comes from sale amounts only; idea prices feed
/// `listed_value`.
pub fn aggregate(year: i32, ideas: &[Idea], sales: &[Sale]) -> YearReport {
    let mut report = YearReport::empty(year);

    for idea in ideas.iter().filter(|i| i.created_at.year() == year) {
        let bucket = &mut report.monthly[idea.created_at.month0() as usize];
        bucket.idea_count += 1;

        report.idea_count += 1;
        report.listed_value += idea.price;
        report.category_counts.record(&idea.category);
    }

    for sale in sales.iter().filter(|s| s.created_at.year() == year) {
        let bucket = &mut report.monthly[sale.created_at.month0() as usize];
        bucket.sale_count += 1;
        bucket.revenue += sale.amount;

        report.sale_count += 1;
        report.total_revenue += sale.amount;
    }

    report
}

/// Totals over every record given, regardless of when it was created.
pub fn summarize(ideas: &[Idea], sales: &[Sale]) -> Totals {
    let mut totals = Totals::default();
    for idea in ideas {
        totals.idea_count += 1;
        totals.listed_value += idea.price;
        totals.category_counts.record(&idea.category);
    }
    for sale in sales {
        totals.sale_count += 1;
        totals.total_revenue += sale.amount;
    }
    totals
}
