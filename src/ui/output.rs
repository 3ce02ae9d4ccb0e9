use crate::import::ImportReport;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().title.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!(
        "{} {}: {}",
        icon.style(theme().icon.clone()),
        label.style(theme().label.clone()),
        value
    );
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().ok.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().failure.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().caution.clone()));
}

pub fn section(title: &str) {
    println!();
    println!("━ {} ━", title.style(theme().title.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().label.clone()).to_string()
}

pub fn timing(elapsed: std::time::Duration) {
    println!(
        "{} {}",
        Icons::CLOCK.style(theme().label.clone()),
        indicatif::HumanDuration(elapsed)
    );
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().label.clone()), value);
}

/// Print the outcome of a bulk import
pub fn import_report(report: &ImportReport) {
    section("Import Summary");
    summary_row("Rows read:", &report.total.to_string());
    summary_row("Inserted: ", &report.inserted.to_string());
    if report.failed == 0 {
        success("All rows imported");
        return;
    }
    summary_row("Failed:   ", &report.failed.to_string());
    if let Some(log) = &report.failed_log {
        warn(&format!("Failed rows logged to {}", log.display()));
    }
}
