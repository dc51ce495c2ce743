use crate::domain::model::Label;
use crate::ml::metrics::ConfusionMatrix;
use crate::plot::canvas::{format_tick, nice_ticks, Canvas, BLACK, WHITE};
use crate::utils::error::Result;
use image::Rgb;

const WIDTH: u32 = 560;
const HEIGHT: u32 = 440;
const CELL: i64 = 160;
const ORIGIN_X: i64 = 110;
const ORIGIN_Y: i64 = 50;
const BAR_X: i64 = ORIGIN_X + 2 * CELL + 30;
const BAR_WIDTH: i64 = 20;

const TITLE_PX: f32 = 18.0;
const LABEL_PX: f32 = 14.0;
const TICK_PX: f32 = 13.0;
const COUNT_PX: f32 = 28.0;

const LIGHT: [f64; 3] = [247.0, 251.0, 255.0];
const DARK: [f64; 3] = [8.0, 48.0, 107.0];

/// Blue ramp: 0 → near white, 1 → dark blue.
pub fn blues(t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let mix = |i: usize| (LIGHT[i] + (DARK[i] - LIGHT[i]) * t).round() as u8;
    Rgb([mix(0), mix(1), mix(2)])
}

/// Annotated heatmap of the confusion matrix (rows: actual, columns: predicted) as PNG.
pub fn render_confusion_matrix(cm: &ConfusionMatrix) -> Result<Vec<u8>> {
    let mut canvas = Canvas::new(WIDTH, HEIGHT)?;
    let max = cm.max_count().max(1) as f64;

    for actual in Label::ALL {
        for predicted in Label::ALL {
            let count = cm.get(actual, predicted);
            let t = count as f64 / max;
            let x0 = ORIGIN_X + predicted.index() as i64 * CELL;
            let y0 = ORIGIN_Y + actual.index() as i64 * CELL;
            canvas.fill_rect(x0, y0, x0 + CELL - 1, y0 + CELL - 1, blues(t));

            let text_color = if t > 0.5 { WHITE } else { BLACK };
            canvas.text_centered(x0 + CELL / 2, y0 + CELL / 2, &count.to_string(), COUNT_PX, text_color);
        }
    }

    // 軸刻度：類別名稱
    let grid_bottom = ORIGIN_Y + 2 * CELL;
    let tick_height = canvas.text_height(TICK_PX);
    for label in Label::ALL {
        let center = label.index() as i64 * CELL + CELL / 2;
        let name = label.display_name();
        canvas.text_centered(ORIGIN_X + center, grid_bottom + 14, name, TICK_PX, BLACK);
        let w = canvas.text_width(name, TICK_PX);
        canvas.text(ORIGIN_X - 8 - w, ORIGIN_Y + center - tick_height / 2, name, TICK_PX, BLACK);
    }

    canvas.text_centered(ORIGIN_X + CELL, ORIGIN_Y / 2, "Confusion Matrix", TITLE_PX, BLACK);
    canvas.text_centered(ORIGIN_X + CELL, grid_bottom + 42, "Predicted Label", LABEL_PX, BLACK);
    canvas.text_vertical_centered(18, ORIGIN_Y + CELL, "Actual Label", LABEL_PX, BLACK);

    let bar_top = ORIGIN_Y;
    let bar_bottom = ORIGIN_Y + 2 * CELL - 1;
    for y in bar_top..=bar_bottom {
        let t = (bar_bottom - y) as f64 / (bar_bottom - bar_top) as f64;
        canvas.line(BAR_X, y, BAR_X + BAR_WIDTH, y, blues(t));
    }
    canvas.stroke_rect(BAR_X, bar_top, BAR_X + BAR_WIDTH, bar_bottom, BLACK);
    for tick in nice_ticks(0.0, max, 5) {
        let y = bar_bottom - ((tick / max) * (bar_bottom - bar_top) as f64).round() as i64;
        canvas.line(BAR_X + BAR_WIDTH, y, BAR_X + BAR_WIDTH + 4, y, BLACK);
        canvas.text(BAR_X + BAR_WIDTH + 8, y - tick_height / 2, &format_tick(tick), TICK_PX, BLACK);
    }

    canvas.to_png()
}
