use super::ui;
use crate::core::RateRecord;
use comfy_table::{Cell, CellAlignment};
use std::collections::BTreeMap;

/// Renders one day's rates as a table, one row per currency.
pub fn display_rates(record: &RateRecord) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell(&format!("Rate (1 {})", record.base)),
    ]);

    for (code, rate) in &record.rates {
        table.add_row(vec![
            Cell::new(code),
            Cell::new(format!("{rate:.6}")).set_alignment(CellAlignment::Right),
        ]);
    }

    format!(
        "Exchange rates for {} ({} based)\n\n{}\n\n{} {}",
        ui::style_text(&record.date.to_string(), ui::StyleType::Title),
        record.base,
        table,
        ui::style_text("Currencies:", ui::StyleType::TotalLabel),
        ui::style_text(&record.rates.len().to_string(), ui::StyleType::TotalValue),
    )
}

pub fn display_currencies(currencies: &BTreeMap<String, String>) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Code"), ui::header_cell("Name")]);

    for (code, name) in currencies {
        table.add_row(vec![Cell::new(code), Cell::new(name)]);
    }

    table.to_string()
}
