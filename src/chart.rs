use crate::color::{Palette, Rgb};
use crate::config::ChartConfig;
use crate::scale::{format_tick, BandScale, LinearScale, QuantileScale};
use crate::scene::{capitalize, Bar, ChartLayer, Tick};
use crate::state::ViewState;
use crate::types::Record;
use std::cmp::Ordering;

/// Headroom above the tallest bar.
const HEADROOM: f64 = 1.1;
const VALUE_TICKS: usize = 10;

pub fn chart_title(template: &str, attribute: &str) -> String {
    template.replace("{attribute}", &capitalize(attribute))
}

/// Descending, with missing values last.
fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

pub fn draw_chart(
    records: &[Record],
    scale: &QuantileScale<Rgb>,
    view: &ViewState,
    config: &ChartConfig,
    palette: &Palette,
) -> ChartLayer {
    let attribute = view.attribute.as_str();
    let padding = config.padding;
    let inner_width = config.width - padding * 2.0;
    let inner_height = config.height - padding * 2.0;

    let mut ordered: Vec<&Record> = records.iter().collect();
    ordered.sort_by(|a, b| descending(a.value(attribute), b.value(attribute)));

    let max = records
        .iter()
        .map(|r| r.value(attribute))
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let top = if max > 0.0 { max * HEADROOM } else { 1.0 };

    let y = LinearScale::new((0.0, top), (inner_height, 0.0));
    let x = BandScale::new(
        ordered.len(),
        (0.0, inner_width),
        config.bar_padding,
        config.outer_padding,
    );

    let bars = ordered
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let value = Some(record.value(attribute)).filter(|v| !v.is_nan());
            // Missing and negative values draw as zero-height bars.
            let top_y = y.apply(value.unwrap_or(0.0).max(0.0));
            Bar {
                key: record.key.clone(),
                value,
                x: padding + x.position(i),
                y: padding + top_y,
                width: x.bandwidth(),
                height: inner_height - top_y,
                fill: value
                    .and_then(|v| scale.apply(v))
                    .copied()
                    .unwrap_or(palette.fallback),
                emphasized: view.is_highlighted(Some(&record.key)),
            }
        })
        .collect();

    let step = y.tick_step(VALUE_TICKS);
    let value_axis = y
        .ticks(VALUE_TICKS)
        .into_iter()
        .map(|t| Tick {
            position: padding + y.apply(t),
            label: format_tick(t, step),
        })
        .collect();

    let category_axis = ordered
        .iter()
        .enumerate()
        .map(|(i, record)| Tick {
            position: padding + x.position(i) + x.bandwidth() / 2.0,
            label: record.key.clone(),
        })
        .collect();

    ChartLayer {
        width: config.width,
        height: config.height,
        padding,
        title: chart_title(&config.title_template, attribute),
        bars,
        value_axis,
        category_axis,
    }
}
