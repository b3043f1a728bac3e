//! Fixed-width text gauges.

use perfpane_common::types::{UtilizationSample, clamp_fraction};

/// Renders `[|||   ]` with `floor(width * fraction)` ticks.
///
/// The fraction is clamped to `[0, 1]` first, so the result is always
/// `width + 2` characters long.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn render_bar(fraction: f64, width: usize) -> String {
    let filled = ((width as f64) * clamp_fraction(fraction)).floor() as usize;
    let filled = filled.min(width);

    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.extend(std::iter::repeat_n('|', filled));
    bar.extend(std::iter::repeat_n(' ', width - filled));
    bar.push(']');
    bar
}

/// Centres the scalar's text in the same `width + 2` columns a bar takes.
///
/// Text longer than that is returned unpadded rather than truncated.
#[must_use]
pub fn render_scalar(value: f64, width: usize) -> String {
    let text = value.to_string();
    format!("{text:^total$}", total = width + 2)
}

/// Renders one text per grid cell the sample occupies, dispatching on the
/// sample's kind.
#[must_use]
pub fn render_sample(sample: &UtilizationSample, width: usize) -> Vec<String> {
    match sample {
        UtilizationSample::Fraction(fraction) => vec![render_bar(*fraction, width)],
        UtilizationSample::Scalar(value) => vec![render_scalar(*value, width)],
        UtilizationSample::Sequence(fractions) => fractions
            .iter()
            .map(|fraction| render_bar(*fraction, width))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(bar: &str) -> usize {
        bar.chars().filter(|c| *c == '|').count()
    }

    #[test]
    fn empty_and_full_bars() {
        assert_eq!(render_bar(0.0, 8), format!("[{}]", " ".repeat(8)));
        assert_eq!(render_bar(1.0, 8), format!("[{}]", "|".repeat(8)));
    }

    #[test]
    fn half_bar_has_half_the_ticks() {
        assert_eq!(ticks(&render_bar(0.5, 10)), 5);
    }

    #[test]
    fn ten_percent_of_thirty_is_three_ticks() {
        let bar = render_bar(0.10, 30);
        assert_eq!(ticks(&bar), 3);
        assert_eq!(bar.len(), 32);
    }

    #[test]
    fn out_of_range_fractions_are_clamped() {
        assert_eq!(render_bar(1.8, 4), "[||||]");
        assert_eq!(render_bar(-0.2, 4), "[    ]");
        assert_eq!(render_bar(f64::NAN, 4), "[    ]");
    }

    #[test]
    fn length_is_always_width_plus_two() {
        for width in [1_usize, 7, 20, 30] {
            for step in 0..=20 {
                let fraction = f64::from(step) / 20.0;
                assert_eq!(render_bar(fraction, width).chars().count(), width + 2);
            }
        }
    }

    #[test]
    fn scalar_is_centred_to_bar_width() {
        let text = render_scalar(61.0, 6);
        assert_eq!(text, "   61   ");
        assert_eq!(text.len(), render_bar(0.0, 6).len());
    }

    #[test]
    fn scalar_longer_than_bar_is_not_truncated() {
        assert_eq!(render_scalar(123.25, 2), "123.25");
    }

    #[test]
    fn dispatch_follows_sample_kind() {
        assert_eq!(render_sample(&UtilizationSample::Fraction(1.0), 2), vec!["[||]"]);
        assert_eq!(render_sample(&UtilizationSample::Scalar(7.0), 2), vec![" 7  "]);
        assert_eq!(
            render_sample(&UtilizationSample::Sequence(vec![0.0, 1.0, 0.5]), 2),
            vec!["[  ]", "[||]", "[| ]"]
        );
    }
}
