use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use itertools::{Itertools, MinMaxResult};

use crate::core::{parameters::ChargingControlParameters, price::ElectricityPrice};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

/// The cheapest prices are green, the most expensive are red.
pub fn build_prices_table(prices: &[ElectricityPrice]) -> Table {
    let (min_price, max_price) = match prices.iter().map(ElectricityPrice::value).minmax() {
        MinMaxResult::NoElements => (None, None),
        MinMaxResult::OneElement(price) => (Some(price), Some(price)),
        MinMaxResult::MinMax(min, max) => (Some(min), Some(max)),
    };

    let mut table = new_table();
    table.set_header(vec!["Date", "Start", "End", "Price"]);
    for price in prices {
        let interval = price.interval();
        let color = if Some(price.value()) == min_price {
            Color::Green
        } else if Some(price.value()) == max_price {
            Color::Red
        } else {
            Color::Reset
        };
        table.add_row(vec![
            Cell::new(interval.start.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(interval.start.format("%H:%M")),
            Cell::new(interval.end.format("%H:%M")).add_attribute(Attribute::Dim),
            Cell::new(price.value()).set_alignment(CellAlignment::Right).fg(color),
        ]);
    }
    table
}

pub fn build_parameters_table(parameters: &ChargingControlParameters) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Parameter", "Value"]);
    table.add_row(vec![
        Cell::new("Max total power"),
        Cell::new(parameters.max_total_power).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Max price"),
        Cell::new(parameters.max_price).set_alignment(CellAlignment::Right),
    ]);
    table
}
