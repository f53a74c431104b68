use crate::scene::{ChartLayer, Legend, MapLayer, Scene, Stroke};
use std::fmt::Write;

const GAP: f64 = 20.0;
const LEGEND_HEIGHT: f64 = 70.0;
const SWATCH_WIDTH: f64 = 30.0;
const SWATCH_STEP: f64 = 40.0;
const TICK_SIZE: f64 = 6.0;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn stroke_attrs(emphasized: bool, stroke: &Stroke) -> String {
    if emphasized {
        format!(r#" stroke="{}" stroke-width="{}""#, stroke.color, stroke.width)
    } else {
        String::new()
    }
}

pub fn document(scene: &Scene) -> String {
    let chart_x = scene.map.width + GAP;
    let width = chart_x + scene.chart.width;
    let height = scene.map.height.max(scene.chart.height + LEGEND_HEIGHT);

    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" data-attribute="{attr}" font-family="sans-serif" font-size="10">"#,
        w = width,
        h = height,
        attr = escape(&scene.attribute)
    );
    write_map(&mut out, &scene.map, &scene.highlight);
    write_chart(&mut out, &scene.chart, &scene.highlight, chart_x);
    write_legend(&mut out, &scene.legend, chart_x, scene.chart.height);
    out.push_str("</svg>\n");
    out
}

fn write_map(out: &mut String, map: &MapLayer, stroke: &Stroke) {
    let _ = writeln!(out, r#"<g id="map" class="map">"#);
    for (i, shape) in map.shapes.iter().enumerate() {
        let key = shape.key.as_deref().map(escape).unwrap_or_default();
        let _ = writeln!(
            out,
            r#"<path class="country" data-index="{i}" data-key="{key}" d="{d}" fill="{fill}"{stroke}/>"#,
            d = shape.path,
            fill = shape.fill,
            stroke = stroke_attrs(shape.emphasized, stroke),
        );
    }
    out.push_str("</g>\n");
}

fn write_chart(out: &mut String, chart: &ChartLayer, stroke: &Stroke, offset_x: f64) {
    let p = chart.padding;
    let _ = writeln!(
        out,
        r#"<g id="chart" class="chart" transform="translate({offset_x:.2},0)">"#
    );
    let _ = writeln!(
        out,
        r#"<text id="chart-title" class="chartTitle" x="{p:.2}" y="{y:.2}" font-size="16">{title}</text>"#,
        y = p.max(20.0),
        title = escape(&chart.title)
    );

    out.push_str("<g id=\"bars\">\n");
    for bar in &chart.bars {
        let _ = writeln!(
            out,
            r#"<rect class="bar" data-key="{key}" x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="{fill}"{stroke}/>"#,
            key = escape(&bar.key),
            x = bar.x,
            y = bar.y,
            w = bar.width,
            h = bar.height,
            fill = bar.fill,
            stroke = stroke_attrs(bar.emphasized, stroke),
        );
    }
    out.push_str("</g>\n");

    let baseline = chart.height - p;
    let _ = writeln!(
        out,
        r##"<g id="value-axis" class="axis" transform="translate({p:.2},0)"><line x1="0" y1="{p:.2}" x2="0" y2="{baseline:.2}" stroke="#000"/>"##
    );
    for tick in &chart.value_axis {
        let _ = writeln!(
            out,
            r##"<g class="tick"><line x1="{x1:.2}" y1="{y:.2}" x2="0" y2="{y:.2}" stroke="#000"/><text x="{tx:.2}" y="{y:.2}" dy="0.32em" text-anchor="end">{label}</text></g>"##,
            x1 = -TICK_SIZE,
            tx = -TICK_SIZE - 3.0,
            y = tick.position,
            label = escape(&tick.label)
        );
    }
    out.push_str("</g>\n");

    let _ = writeln!(
        out,
        r##"<g id="category-axis" class="x axis" transform="translate(0,{baseline:.2})"><line x1="{p:.2}" y1="0" x2="{x2:.2}" y2="0" stroke="#000"/>"##,
        x2 = chart.width - p
    );
    for tick in &chart.category_axis {
        let _ = writeln!(
            out,
            r##"<g class="tick" transform="translate({x:.2},0)"><line y2="{TICK_SIZE}" stroke="#000"/><text y="9" dx="-0.5em" dy="0.15em" text-anchor="end" transform="rotate(-45)">{label}</text></g>"##,
            x = tick.position,
            label = escape(&tick.label)
        );
    }
    out.push_str("</g>\n</g>\n");
}

fn write_legend(out: &mut String, legend: &Legend, offset_x: f64, offset_y: f64) {
    let _ = writeln!(
        out,
        r#"<g id="legend" class="legend" transform="translate({offset_x:.2},{offset_y:.2})"><text class="legendTitle" x="0" y="15" font-weight="bold">{}</text>"#,
        escape(&legend.title)
    );
    for (i, swatch) in legend.swatches.iter().enumerate() {
        let x = i as f64 * SWATCH_STEP;
        let _ = writeln!(
            out,
            r#"<rect class="swatch" data-index="{i}" x="{x:.2}" y="25" width="{SWATCH_WIDTH}" height="15" fill="{}"/>"#,
            swatch.fill
        );
        let caption = match (&swatch.label, swatch.lower) {
            (Some(label), _) => label.clone(),
            (None, Some(lower)) => format!("{lower:.1}"),
            (None, None) => String::new(),
        };
        if !caption.is_empty() {
            let _ = writeln!(
                out,
                r#"<text x="{x:.2}" y="55">{}</text>"#,
                escape(&caption)
            );
        }
    }
    out.push_str("</g>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::scene::{Bar, Shape, Swatch, Tick};

    fn scene() -> Scene {
        let rgb = |hex: &str| Rgb::from_hex(hex).unwrap();
        Scene {
            attribute: "speed".to_string(),
            highlight: Stroke {
                color: rgb("#000"),
                width: 2.0,
            },
            map: MapLayer {
                width: 200.0,
                height: 100.0,
                shapes: vec![
                    Shape {
                        key: Some("FR".to_string()),
                        path: "M0,0L1,1Z".to_string(),
                        fill: rgb("#006d2c"),
                        emphasized: true,
                    },
                    Shape {
                        key: None,
                        path: "M2,2L3,3Z".to_string(),
                        fill: rgb("#ccc"),
                        emphasized: false,
                    },
                ],
            },
            chart: ChartLayer {
                width: 300.0,
                height: 200.0,
                padding: 25.0,
                title: "Internet Speed by Country".to_string(),
                bars: vec![Bar {
                    key: "FR".to_string(),
                    value: Some(1.0),
                    x: 25.0,
                    y: 25.0,
                    width: 100.0,
                    height: 150.0,
                    fill: rgb("#006d2c"),
                    emphasized: true,
                }],
                value_axis: vec![Tick {
                    position: 175.0,
                    label: "0".to_string(),
                }],
                category_axis: vec![Tick {
                    position: 75.0,
                    label: "FR".to_string(),
                }],
            },
            legend: Legend {
                title: "Legend".to_string(),
                swatches: vec![Swatch {
                    fill: rgb("#edf8fb"),
                    label: Some("Low".to_string()),
                    lower: Some(0.0),
                    upper: Some(1.0),
                }],
            },
        }
    }

    #[test]
    fn test_document_contains_every_element() {
        let svg = document(&scene());
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("class=\"country\"").count(), 2);
        assert_eq!(svg.matches("class=\"bar\"").count(), 1);
        assert!(svg.contains("Internet Speed by Country"));
        assert!(svg.contains(r##"fill="#edf8fb""##));
        assert!(svg.contains(">Low</text>"));
    }

    #[test]
    fn test_emphasis_marks_polygon_and_bar() {
        let svg = document(&scene());
        assert_eq!(svg.matches(r##"stroke="#000000" stroke-width="2""##).count(), 2);
    }

    #[test]
    fn test_text_is_escaped() {
        let mut s = scene();
        s.chart.title = "Cost <€> & \"more\"".to_string();
        let svg = document(&s);
        assert!(svg.contains("Cost &lt;€&gt; &amp; &quot;more&quot;"));
    }
}
