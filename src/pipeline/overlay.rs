//! Pixel overlays drawn straight into RGBA frames.

use image::{ImageBuffer, Rgba};
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut},
    rect::Rect,
};

use crate::{
    selection::SelectionOutcome,
    session::{FrameReport, PhaseView},
    types::{HandObservation, landmarks},
};

type Canvas<'a> = ImageBuffer<Rgba<u8>, &'a mut [u8]>;

const BONE: Rgba<u8> = Rgba([0, 255, 255, 255]);
const JOINT: Rgba<u8> = Rgba([50, 205, 50, 255]);
const TIP: Rgba<u8> = Rgba([255, 99, 71, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const DIVIDER: Rgba<u8> = Rgba([80, 80, 80, 255]);
const BAR_BACKGROUND: Rgba<u8> = Rgba([60, 60, 60, 255]);
const BAR_FILL: Rgba<u8> = Rgba([127, 255, 0, 255]);

const DASH: u32 = 15;
const GAP: u32 = 20;
const BAR_HEIGHT: u32 = 18;

/// Draws every overlay the report calls for. Buffers that do not match the
/// given size are left untouched.
pub fn draw_report(rgba: &mut [u8], width: u32, height: u32, report: &FrameReport) {
    let Some(mut canvas) = Canvas::from_raw(width, height, rgba) else {
        log::debug!("frame buffer does not match {width}x{height}, overlay skipped");
        return;
    };

    for hand in &report.hands {
        draw_hand(&mut canvas, hand);
    }

    match &report.view {
        PhaseView::Selecting(SelectionOutcome::Holding { progress, .. }) => {
            draw_progress_bar(&mut canvas, *progress)
        }
        PhaseView::Selecting(_) => {}
        PhaseView::Calculating { .. } => draw_divider(&mut canvas),
    }
}

fn draw_hand(canvas: &mut Canvas<'_>, hand: &HandObservation) {
    let points = hand.pixel_landmarks(canvas.width(), canvas.height());

    // Three parallel strokes per bone for a visible line on HD frames.
    for &(a, b) in landmarks::CONNECTIONS.iter() {
        let ((x0, y0), (x1, y1)) = (points[a], points[b]);
        for offset in [-1.0, 0.0, 1.0] {
            draw_line_segment_mut(canvas, (x0 + offset, y0), (x1 + offset, y1), BONE);
            draw_line_segment_mut(canvas, (x0, y0 + offset), (x1, y1 + offset), BONE);
        }
    }

    for (i, &(x, y)) in points.iter().enumerate() {
        let center = (x.round() as i32, y.round() as i32);
        if landmarks::FINGERTIPS.contains(&i) {
            draw_filled_circle_mut(canvas, center, 10, WHITE);
            draw_filled_circle_mut(canvas, center, 8, TIP);
        } else {
            draw_filled_circle_mut(canvas, center, 6, WHITE);
            draw_filled_circle_mut(canvas, center, 5, JOINT);
        }
    }
}

fn fill(canvas: &mut Canvas<'_>, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    if w == 0 || h == 0 {
        return;
    }
    draw_filled_rect_mut(canvas, Rect::at(x as i32, y as i32).of_size(w, h), color);
}

/// Dashed vertical line at the midpoint separating the two operands.
fn draw_divider(canvas: &mut Canvas<'_>) {
    let x = canvas.width() / 2;
    let mut y = 0;
    while y < canvas.height() {
        fill(canvas, x, y, 1, DASH, DIVIDER);
        y += DASH + GAP;
    }
}

fn draw_progress_bar(canvas: &mut Canvas<'_>, progress: f32) {
    let width = (canvas.width() / 3).max(1);
    let x = canvas.width().saturating_sub(width + 20);
    let y = canvas.height().saturating_sub(BAR_HEIGHT + 20);
    let filled = (width as f32 * progress.clamp(0.0, 1.0)) as u32;

    fill(canvas, x, y, width, BAR_HEIGHT, BAR_BACKGROUND);
    fill(canvas, x, y, filled, BAR_HEIGHT, BAR_FILL);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        calculator::OperationKind,
        fingers::FingerCounter,
        hands::{self, Operands},
        selection::CONFIRMATION_HOLD,
        test_support::{FRAME_HEIGHT, FRAME_WIDTH, hand},
    };

    fn blank() -> Vec<u8> {
        vec![0u8; (FRAME_WIDTH * FRAME_HEIGHT * 4) as usize]
    }

    fn pixel(rgba: &[u8], x: u32, y: u32) -> Rgba<u8> {
        let idx = ((y * FRAME_WIDTH + x) * 4) as usize;
        Rgba([rgba[idx], rgba[idx + 1], rgba[idx + 2], rgba[idx + 3]])
    }

    const BLANK: Rgba<u8> = Rgba([0, 0, 0, 0]);

    #[test]
    fn calculating_draws_divider_at_midpoint() {
        let mut rgba = blank();
        let report = FrameReport {
            hands: Vec::new(),
            view: PhaseView::Calculating {
                operation: OperationKind::Add,
                operands: Operands::default(),
                result: Ok(0.0),
            },
            hold: CONFIRMATION_HOLD,
        };

        draw_report(&mut rgba, FRAME_WIDTH, FRAME_HEIGHT, &report);

        assert_eq!(pixel(&rgba, 640, 0), DIVIDER);
        assert_eq!(pixel(&rgba, 640, DASH + 1), BLANK);
        assert_eq!(pixel(&rgba, 10, 0), BLANK);
    }

    #[test]
    fn hands_near_the_edge_are_clipped() {
        let mut rgba = blank();
        let hands = hands::observe(
            vec![hand(5, (2.0, 2.0)), hand(5, (1279.0, 719.0))],
            &FingerCounter::default(),
            FRAME_WIDTH,
            FRAME_HEIGHT,
        );
        let report = FrameReport {
            hands,
            view: PhaseView::Selecting(SelectionOutcome::Holding {
                operation: OperationKind::Multiply,
                progress: 0.5,
            }),
            hold: CONFIRMATION_HOLD,
        };

        draw_report(&mut rgba, FRAME_WIDTH, FRAME_HEIGHT, &report);

        assert_eq!(rgba.len(), (FRAME_WIDTH * FRAME_HEIGHT * 4) as usize);
        assert!(rgba.chunks_exact(4).any(|px| px == BAR_FILL.0));
    }

    #[test]
    fn empty_progress_and_mismatched_buffers_are_safe() {
        let mut rgba = blank();
        let report = FrameReport {
            hands: Vec::new(),
            view: PhaseView::Selecting(SelectionOutcome::Holding {
                operation: OperationKind::Add,
                progress: 0.0,
            }),
            hold: CONFIRMATION_HOLD,
        };

        draw_report(&mut rgba, FRAME_WIDTH, FRAME_HEIGHT, &report);
        assert!(rgba.chunks_exact(4).any(|px| px == BAR_BACKGROUND.0));
        assert!(!rgba.chunks_exact(4).any(|px| px == BAR_FILL.0));

        let mut short = vec![0u8; 16];
        draw_report(&mut short, FRAME_WIDTH, FRAME_HEIGHT, &report);
        assert!(short.iter().all(|b| *b == 0));
    }
}
