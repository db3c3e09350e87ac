use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::time::format_average;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

/// Change failure rate, green up to 15%, yellow up to 30%.
pub fn color_coded_failure_rate_cell(rate: f64) -> Cell {
    let text = format!("{rate:.1}%");
    if rate <= 15.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if rate <= 30.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

/// Average of `seconds`, green within a day, yellow within a week.
#[allow(clippy::cast_precision_loss)]
pub fn color_coded_average_cell(seconds: &[i64]) -> Cell {
    let text = format_average(seconds);
    if seconds.is_empty() {
        return Cell::new(text).fg(TableColor::DarkGrey);
    }

    let avg = seconds.iter().sum::<i64>() as f64 / seconds.len() as f64;
    if avg <= 86_400.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if avg <= 7.0 * 86_400.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}
