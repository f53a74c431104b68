use crate::color::Rgb;
use crate::scale::QuantileScale;
use crate::scene::{Legend, Swatch};

/// One swatch per bucket, light to dark, with the value extent each bucket covers.
pub fn draw_legend(scale: &QuantileScale<Rgb>) -> Legend {
    let last = scale.range().len().saturating_sub(1);
    let swatches = scale
        .range()
        .iter()
        .enumerate()
        .map(|(i, fill)| {
            let extent = scale.invert_extent(i);
            let label = if i == last && i > 0 {
                Some("High".to_string())
            } else if i == 0 {
                Some("Low".to_string())
            } else {
                None
            };
            Swatch {
                fill: *fill,
                label,
                lower: extent.map(|(low, _)| low),
                upper: extent.map(|(_, high)| high),
            }
        })
        .collect();

    Legend {
        title: "Legend".to_string(),
        swatches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(hex: &str) -> Rgb {
        Rgb::from_hex(hex).unwrap()
    }

    #[test]
    fn test_low_and_high_swatches() {
        let scale = QuantileScale::new(
            vec![10.0, 50.0, 90.0],
            vec![rgb("#edf8fb"), rgb("#66c2a4"), rgb("#006d2c")],
        );
        let legend = draw_legend(&scale);
        assert_eq!(legend.swatches.len(), 3);
        assert_eq!(legend.swatches[0].label.as_deref(), Some("Low"));
        assert_eq!(legend.swatches[0].fill, rgb("#edf8fb"));
        assert_eq!(legend.swatches[1].label, None);
        assert_eq!(legend.swatches[2].label.as_deref(), Some("High"));
        assert_eq!(legend.swatches[2].fill, rgb("#006d2c"));
        assert_eq!(legend.swatches[0].lower, Some(10.0));
        assert_eq!(legend.swatches[2].upper, Some(90.0));
    }

    #[test]
    fn test_empty_domain_has_no_extents() {
        let scale = QuantileScale::new(Vec::<f64>::new(), vec![rgb("#fff"), rgb("#000")]);
        let legend = draw_legend(&scale);
        assert_eq!(legend.swatches.len(), 2);
        assert!(legend.swatches.iter().all(|s| s.lower.is_none()));
    }
}
