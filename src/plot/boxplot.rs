use crate::domain::model::Label;
use crate::plot::canvas::{format_tick, nice_ticks, Canvas, BLACK, GRID};
use crate::utils::error::{PipelineError, Result};
use image::Rgb;

const WIDTH: u32 = 560;
const HEIGHT: u32 = 420;
const MARGIN_LEFT: i64 = 90;
const MARGIN_RIGHT: i64 = 20;
const MARGIN_TOP: i64 = 44;
const MARGIN_BOTTOM: i64 = 60;

const TITLE_PX: f32 = 18.0;
const LABEL_PX: f32 = 14.0;
const TICK_PX: f32 = 12.0;
const X_LABEL: &str = "Label (0: Neutral, 1: Stressed)";

const PALETTE: [Rgb<u8>; 2] = [Rgb([76, 114, 176]), Rgb([221, 132, 82])];

/// Five-number summary plus outliers (Tukey, 1.5 × IQR).
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

/// Linear-interpolated quantile of sorted data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

impl BoxStats {
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let lo_fence = q1 - 1.5 * iqr;
        let hi_fence = q3 + 1.5 * iqr;

        // 鬚線延伸到圍欄內最遠的資料點
        let whisker_low = sorted.iter().copied().find(|&v| v >= lo_fence).unwrap_or(q1);
        let whisker_high = sorted.iter().rev().copied().find(|&v| v <= hi_fence).unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|&v| v < lo_fence || v > hi_fence)
            .collect();

        Some(Self {
            q1,
            median,
            q3,
            whisker_low,
            whisker_high,
            outliers,
        })
    }
}

/// Renders one box per label group (x axis: label value, y axis: feature value) as PNG,
/// titled `<feature> by label`.
pub fn render_boxplot(feature: &str, groups: &[(Label, Vec<f64>)]) -> Result<Vec<u8>> {
    let stats: Vec<(Label, BoxStats)> = groups
        .iter()
        .filter_map(|(label, values)| BoxStats::compute(values).map(|s| (*label, s)))
        .collect();
    if stats.is_empty() {
        return Err(PipelineError::processing("no finite values to plot"));
    }

    let (mut lo, mut hi) = stats.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, s)| {
        let min = s.outliers.iter().copied().fold(s.whisker_low, f64::min);
        let max = s.outliers.iter().copied().fold(s.whisker_high, f64::max);
        (lo.min(min), hi.max(max))
    });
    if (hi - lo).abs() < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }
    let pad = (hi - lo) * 0.05;
    lo -= pad;
    hi += pad;

    let mut canvas = Canvas::new(WIDTH, HEIGHT)?;
    let plot_left = MARGIN_LEFT;
    let plot_right = WIDTH as i64 - MARGIN_RIGHT;
    let plot_top = MARGIN_TOP;
    let plot_bottom = HEIGHT as i64 - MARGIN_BOTTOM;
    let to_y = |v: f64| -> i64 {
        plot_bottom - ((v - lo) / (hi - lo) * (plot_bottom - plot_top) as f64).round() as i64
    };

    for tick in nice_ticks(lo, hi, 6) {
        let y = to_y(tick);
        canvas.line(plot_left, y, plot_right, y, GRID);
        canvas.line(plot_left - 4, y, plot_left, y, BLACK);
        let label = format_tick(tick);
        let w = canvas.text_width(&label, TICK_PX);
        let h = canvas.text_height(TICK_PX);
        canvas.text(plot_left - 8 - w, y - h / 2, &label, TICK_PX, BLACK);
    }

    let slot = (plot_right - plot_left) / stats.len() as i64;
    let half_box = slot / 5;
    for (i, (label, s)) in stats.iter().enumerate() {
        let cx = plot_left + slot * i as i64 + slot / 2;
        let color = PALETTE[label.index() % PALETTE.len()];

        canvas.line(cx, to_y(s.whisker_low), cx, to_y(s.q1), BLACK);
        canvas.line(cx, to_y(s.q3), cx, to_y(s.whisker_high), BLACK);
        canvas.line(cx - half_box / 2, to_y(s.whisker_low), cx + half_box / 2, to_y(s.whisker_low), BLACK);
        canvas.line(cx - half_box / 2, to_y(s.whisker_high), cx + half_box / 2, to_y(s.whisker_high), BLACK);

        canvas.fill_rect(cx - half_box, to_y(s.q3), cx + half_box, to_y(s.q1), color);
        canvas.stroke_rect(cx - half_box, to_y(s.q3), cx + half_box, to_y(s.q1), BLACK);
        canvas.line(cx - half_box, to_y(s.median), cx + half_box, to_y(s.median), BLACK);

        for &v in &s.outliers {
            canvas.ring(cx, to_y(v), 3, BLACK);
        }

        canvas.line(cx, plot_bottom, cx, plot_bottom + 4, BLACK);
        canvas.text_centered(cx, plot_bottom + 16, &label.as_i64().to_string(), TICK_PX, BLACK);
    }

    canvas.line(plot_left, plot_top, plot_left, plot_bottom, BLACK);
    canvas.line(plot_left, plot_bottom, plot_right, plot_bottom, BLACK);

    let center_x = (plot_left + plot_right) / 2;
    canvas.text_centered(center_x, MARGIN_TOP / 2, &format!("{} by label", feature), TITLE_PX, BLACK);
    canvas.text_centered(center_x, HEIGHT as i64 - 16, X_LABEL, LABEL_PX, BLACK);
    canvas.text_vertical_centered(18, (plot_top + plot_bottom) / 2, feature, LABEL_PX, BLACK);

    canvas.to_png()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quartiles_interpolate() {
        let stats = BoxStats::compute(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((stats.q1 - 1.75).abs() < 1e-12);
        assert!((stats.median - 2.5).abs() < 1e-12);
        assert!((stats.q3 - 3.25).abs() < 1e-12);
        assert!(stats.outliers.is_empty());
    }

    #[test]
    fn test_outliers_beyond_fences() {
        let stats = BoxStats::compute(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]).unwrap();
        assert_eq!(stats.outliers, vec![100.0]);
        assert_eq!(stats.whisker_high, 5.0);
        assert_eq!(stats.whisker_low, 1.0);
    }

    #[test]
    fn test_empty_group_is_none() {
        assert!(BoxStats::compute(&[]).is_none());
        assert!(BoxStats::compute(&[f64::NAN]).is_none());
    }

    #[test]
    fn test_render_png() {
        let groups = vec![
            (Label::Neutral, vec![1.0, 2.0, 3.0]),
            (Label::Stressed, vec![2.0, 4.0, 6.0, 30.0]),
        ];
        let png = render_boxplot("mean_pitch_hz", &groups).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!(img.width(), WIDTH);
        assert_eq!(img.height(), HEIGHT);
    }

    #[test]
    fn test_title_and_axis_labels_are_drawn() {
        let groups = vec![
            (Label::Neutral, vec![0.01, 0.02, 0.03]),
            (Label::Stressed, vec![0.02, 0.04, 0.05]),
        ];
        let img = image::load_from_memory(&render_boxplot("jitter_local", &groups).unwrap())
            .unwrap()
            .to_rgb8();
        let inked = |x0: u32, y0: u32, x1: u32, y1: u32| {
            (y0..y1).any(|y| (x0..x1).any(|x| img.get_pixel(x, y).0 != [255, 255, 255]))
        };

        // 標題列、左側 y 軸名稱、底部 x 軸名稱
        assert!(inked(0, 0, WIDTH, MARGIN_TOP as u32 - 6));
        assert!(inked(0, MARGIN_TOP as u32, 30, HEIGHT - MARGIN_BOTTOM as u32));
        assert!(inked(0, HEIGHT - 28, WIDTH, HEIGHT));
        // 沒有標題文字時標題列是空白的
        assert!(!inked(0, 0, WIDTH, 8));
    }

    #[test]
    fn test_constant_values_render() {
        let groups = vec![(Label::Neutral, vec![5.0; 4])];
        assert!(render_boxplot("f", &groups).is_ok());
        assert!(render_boxplot("f", &[(Label::Neutral, Vec::new())]).is_err());
    }
}
