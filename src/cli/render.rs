//! Terminal rendering of state snapshots.

use chrono::{DateTime, Utc};
use console::style;

use scisummarize::models::{Document, FeedbackEntry, Notification, SearchHit, Summary};
use scisummarize::services::{ChartSeries, InsightCharts, InsightTab};
use scisummarize::state::{ContainerSnapshot, NotificationSnapshot, SearchSnapshot};

const BAR_WIDTH: usize = 40;

/// "Just now", "5 min ago", "3 hr ago", "2 days ago", or the date.
pub fn relative_time(now: DateTime<Utc>, at: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds().max(0);
    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;

    if secs < 60 {
        "Just now".to_string()
    } else if mins < 60 {
        format!("{} min ago", mins)
    } else if hours < 24 {
        format!("{} hr ago", hours)
    } else if days < 7 {
        format!("{} day{} ago", days, if days > 1 { "s" } else { "" })
    } else {
        at.format("%Y-%m-%d").to_string()
    }
}

fn format_size(kb: Option<u64>) -> String {
    match kb {
        Some(kb) if kb >= 1024 => format!("{:.1} MB", kb as f64 / 1024.0),
        Some(kb) => format!("{} KB", kb),
        None => "-".to_string(),
    }
}

fn document_line(doc: &Document, now: DateTime<Utc>) -> String {
    let star = if doc.is_favorite {
        style("★").yellow().to_string()
    } else {
        " ".to_string()
    };
    let summary = if doc.has_summary {
        style("summarized").green().to_string()
    } else {
        style("no summary").dim().to_string()
    };
    format!(
        "{} {}  {}  {}  {}  {}",
        star,
        style(&doc.id).dim(),
        style(&doc.title).bold(),
        relative_time(now, doc.created_at),
        format_size(doc.file_size_kb),
        summary
    )
}

pub fn print_documents<F>(snapshot: &ContainerSnapshot<Document, F>) {
    let now = Utc::now();
    if snapshot.items.is_empty() {
        println!("{}", style("No documents found.").dim());
    }
    for doc in &snapshot.items {
        println!("{}", document_line(doc, now));
    }
    print_paging(snapshot.page, snapshot.has_more, snapshot.error.as_deref());
}

pub fn print_document(doc: &Document) {
    println!("{}", style(&doc.title).bold().underlined());
    println!("  id:       {}", doc.id);
    println!("  uploaded: {}", doc.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(expires) = doc.expires_at {
        println!("  expires:  {}", expires.format("%Y-%m-%d %H:%M"));
    }
    println!("  size:     {}", format_size(doc.file_size_kb));
    if !doc.tags.is_empty() {
        println!("  tags:     {}", doc.tags.join(", "));
    }
    if let Some(ref description) = doc.description {
        println!("\n{}", description);
    }
    if let Some(ref summary) = doc.summary {
        println!("\n{}\n{}", style("Summary").bold(), summary);
    }
}

pub fn print_summaries<F>(snapshot: &ContainerSnapshot<Summary, F>) {
    let now = Utc::now();
    if snapshot.items.is_empty() {
        println!("{}", style("No summaries found.").dim());
    }
    for summary in &snapshot.items {
        println!(
            "{}  {}  v{}  {:?}  {}",
            style(&summary.id).dim(),
            style(&summary.title).bold(),
            summary.version,
            summary.status,
            relative_time(now, summary.created_at)
        );
    }
    print_paging(snapshot.page, snapshot.has_more, snapshot.error.as_deref());
}

fn print_paging(page: u32, has_more: bool, error: Option<&str>) {
    if let Some(error) = error {
        println!("{}", style(error).red());
    }
    if has_more {
        println!(
            "{}",
            style(format!("page {} loaded, more available", page)).dim()
        );
    }
}

fn notification_line(n: &Notification, now: DateTime<Utc>) -> String {
    let marker = if n.read {
        " ".to_string()
    } else {
        style("●").cyan().to_string()
    };
    format!(
        "{} {}  {}  {}\n    {}",
        marker,
        style(&n.id).dim(),
        style(n.display_title()).bold(),
        style(relative_time(now, n.timestamp)).dim(),
        n.display_message()
    )
}

pub fn print_notifications(snapshot: &NotificationSnapshot) {
    let now = Utc::now();
    match snapshot.badge {
        Some(count) => println!("{} unread", style(count).cyan().bold()),
        None => println!("{}", style("No unread notifications").dim()),
    }
    if snapshot.items.is_empty() {
        println!("{}", style("No notifications").dim());
    }
    for n in &snapshot.items {
        println!("{}", notification_line(n, now));
    }
    if let Some(ref error) = snapshot.error {
        println!("{}", style(error).red());
    }
}

fn hit_line(hit: &SearchHit) -> String {
    let mut line = format!("{}  {}", style(&hit.id).dim(), style(&hit.title).bold());
    if let Some(ref file_type) = hit.file_type {
        line.push_str(&format!("  [{}]", file_type));
    }
    if let Some(ref snippet) = hit.snippet {
        line.push_str(&format!("\n    {}", snippet));
    }
    line
}

pub fn print_search(snapshot: &SearchSnapshot) {
    if snapshot.results.is_empty() {
        println!("No results found for \"{}\"", snapshot.query);
        return;
    }
    println!(
        "{} results for \"{}\" (page {} of {})",
        snapshot.total_results, snapshot.query, snapshot.page, snapshot.total_pages
    );
    for hit in &snapshot.results {
        println!("{}", hit_line(hit));
    }
}

pub fn print_feedback(entries: &[FeedbackEntry]) {
    let now = Utc::now();
    if entries.is_empty() {
        println!("{}", style("No feedback submitted yet.").dim());
    }
    for entry in entries {
        println!(
            "{}  {}  {}",
            style(entry.kind).cyan(),
            style(relative_time(now, entry.created_at)).dim(),
            entry.status.as_deref().unwrap_or("pending")
        );
        println!("    {}", entry.text);
        if let Some(ref response) = entry.response {
            println!("    {} {}", style("↳").green(), response);
        }
    }
}

fn print_chart(tab: InsightTab, series: &ChartSeries) {
    println!("{}", style(tab.as_str()).bold().underlined());
    if series.is_empty() {
        println!("  {}", style("no data").dim());
        return;
    }
    let max = series.values.iter().cloned().fold(0.0_f64, f64::max);
    let width = series.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    for (label, value) in series.labels.iter().zip(&series.values) {
        let len = if max > 0.0 {
            ((value / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        println!(
            "  {:width$}  {} {}",
            label,
            style("█".repeat(len)).cyan(),
            value,
            width = width
        );
    }
}

pub fn print_insights(charts: &InsightCharts, tab: Option<InsightTab>) {
    if !charts.document.title.is_empty() {
        println!("{}\n", style(&charts.document.title).bold());
    }
    let tabs: Vec<InsightTab> = match tab {
        Some(tab) => vec![tab],
        None => InsightTab::ALL.to_vec(),
    };
    for tab in tabs {
        if let Some(series) = charts.chart(tab) {
            print_chart(tab, series);
            println!();
        }
    }
}
