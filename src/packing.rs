//! Next-fit shelf packing of fixed-size panels into a rectangular plot.
//!
//! Panels are laid left-to-right on shelves of fixed height, bottom-to-top,
//! with no rotation. The heuristic trades optimality for a deterministic,
//! explainable placement order that is easy to draw as a map overlay.

use geo_types::{coord, Rect};
use serde::Serialize;
use tracing::warn;

/// Hard ceiling on placement iterations. Guarantees termination even for
/// pathological floating-point dimensions; hitting it is a diagnostic, not
/// an error.
pub const MAX_PACK_ITERATIONS: usize = 1_000_000;

/// One packed panel in plot-local coordinates (meters), origin at the plot
/// corner the packing starts from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacedPanel {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PlacedPanel {
    pub fn rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.x, y: self.y },
            coord! { x: self.x + self.width, y: self.y + self.height },
        )
    }
}

/// Result of one packing run.
#[derive(Debug, Clone, Default)]
pub struct PackResult {
    /// Placements in the order they were made.
    pub panels: Vec<PlacedPanel>,
    /// True when packing stopped because it hit [`MAX_PACK_ITERATIONS`].
    pub iteration_cap_hit: bool,
}

impl PackResult {
    pub fn count(&self) -> usize {
        self.panels.len()
    }
}

/// Pack panels of `panel_width x panel_height` into a
/// `plot_width x plot_height` plot, stopping early once `max_count` panels
/// are placed.
///
/// Degenerate inputs (non-positive panel dimensions, or a panel larger than
/// the plot in either axis) return an empty result rather than an error.
pub fn next_fit_shelf(
    plot_width: f64,
    plot_height: f64,
    panel_width: f64,
    panel_height: f64,
    max_count: Option<usize>,
) -> PackResult {
    let mut result = PackResult::default();

    if panel_width <= 0.0 || panel_height <= 0.0 {
        return result;
    }
    if panel_width > plot_width || panel_height > plot_height {
        return result;
    }

    let shelf_height = panel_height;
    let mut x = 0.0_f64;
    let mut shelf_y = 0.0_f64;
    let mut iterations = 0_usize;

    while iterations < MAX_PACK_ITERATIONS {
        iterations += 1;

        if max_count.is_some_and(|n| result.panels.len() >= n) {
            break;
        }
        if shelf_y + shelf_height > plot_height {
            break;
        }

        if x + panel_width <= plot_width {
            result.panels.push(PlacedPanel {
                x,
                y: shelf_y,
                width: panel_width,
                height: panel_height,
            });
            x += panel_width;
            continue;
        }

        // Shelf full: open the next one and retry the placement once.
        x = 0.0;
        shelf_y += shelf_height;
        if shelf_y + shelf_height > plot_height {
            break;
        }
        if x + panel_width <= plot_width {
            result.panels.push(PlacedPanel {
                x,
                y: shelf_y,
                width: panel_width,
                height: panel_height,
            });
            x += panel_width;
            continue;
        }
        break;
    }

    if iterations >= MAX_PACK_ITERATIONS {
        result.iteration_cap_hit = true;
        warn!(
            iterations,
            placed = result.panels.len(),
            "shelf packing stopped at the iteration ceiling"
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_shelves_left_to_right_bottom_to_top() {
        let result = next_fit_shelf(100.0, 50.0, 1.65, 1.0, None);

        // floor(100 / 1.65) = 60 panels per shelf, 50 shelves of height 1.
        assert_eq!(result.count(), 60 * 50);
        assert!(!result.iteration_cap_hit);

        // First shelf tiles left to right at y = 0.
        for (i, panel) in result.panels.iter().take(60).enumerate() {
            assert!((panel.x - i as f64 * 1.65).abs() < 1e-9);
            assert_eq!(panel.y, 0.0);
        }
        // Panel 61 starts the second shelf.
        assert_eq!(result.panels[60].x, 0.0);
        assert!((result.panels[60].y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn packing_is_deterministic() {
        let a = next_fit_shelf(37.3, 19.7, 1.65, 0.992, None);
        let b = next_fit_shelf(37.3, 19.7, 1.65, 0.992, None);
        assert_eq!(a.panels, b.panels);
    }

    #[test]
    fn placements_stay_inside_the_plot() {
        let (plot_w, plot_h) = (23.4, 11.9);
        let result = next_fit_shelf(plot_w, plot_h, 1.65, 1.0, None);
        assert!(result.count() > 0);
        for panel in &result.panels {
            let rect = panel.rect();
            assert!(rect.min().x >= 0.0 && rect.min().y >= 0.0);
            assert!(rect.max().x <= plot_w + 1e-9);
            assert!(rect.max().y <= plot_h + 1e-9);
        }
    }

    #[test]
    fn oversized_panel_packs_nothing() {
        let result = next_fit_shelf(5.0, 5.0, 10.0, 10.0, None);
        assert_eq!(result.count(), 0);
        assert!(!result.iteration_cap_hit);
    }

    #[test]
    fn degenerate_panel_dimensions_pack_nothing() {
        assert_eq!(next_fit_shelf(100.0, 50.0, 0.0, 1.0, None).count(), 0);
        assert_eq!(next_fit_shelf(100.0, 50.0, 1.65, -1.0, None).count(), 0);
    }

    #[test]
    fn max_count_caps_the_placements() {
        let result = next_fit_shelf(100.0, 50.0, 1.65, 1.0, Some(10));
        assert_eq!(result.count(), 10);

        // When capacity is short of the request, everything that fits is
        // placed and nothing more.
        let result = next_fit_shelf(5.0, 1.0, 1.0, 1.0, Some(10));
        assert_eq!(result.count(), 5);
    }

    #[test]
    fn iteration_ceiling_stops_packing_with_a_diagnostic() {
        // A 3,000,000 m shelf of 1 m panels has room for three times the
        // ceiling; packing must stop at the cap instead.
        let result = next_fit_shelf(3_000_000.0, 1.0, 1.0, 1.0, None);

        assert!(result.iteration_cap_hit);
        // Every iteration placed a panel, so the count equals the ceiling.
        assert_eq!(result.count(), MAX_PACK_ITERATIONS);

        let last = result.panels.last().unwrap();
        let rect = last.rect();
        assert!(rect.max().x <= 3_000_000.0);
        assert!(rect.max().y <= 1.0);
    }

    #[test]
    fn single_panel_exactly_fits_the_plot() {
        let result = next_fit_shelf(1.65, 1.0, 1.65, 1.0, None);
        assert_eq!(result.count(), 1);
        assert_eq!(result.panels[0].x, 0.0);
        assert_eq!(result.panels[0].y, 0.0);
    }
}
