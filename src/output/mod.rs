mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::{export_json, write_csv_reports, JSON_REPORT_FILE};
pub use progress::PhaseProgress;
pub use styling::{dim, magenta_bold};
pub use summary::print_summary;

/// Prints the `DORALens` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("📈 DORALens"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("DORA metrics from build timelines")
    );
}
