//! Placement of a citation tooltip so it stays inside its scroll container.
//!
//! All x coordinates are in pixels relative to the container's left edge.

pub const CONTAINER_PADDING: f32 = 16.0;
pub const MAX_TOOLTIP_WIDTH: f32 = 320.0;
/// Minimum arrow distance from the tooltip edge when clamped on the right.
const RIGHT_ARROW_MARGIN: f32 = 6.0;
/// Arrow range, as fractions of tooltip width, when clamped on the left.
const LEFT_ARROW_RANGE: (f32, f32) = (0.15, 0.85);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TooltipGeometry {
    pub container_width: f32,
    /// Center of the citation marker.
    pub marker_center_x: f32,
    /// Left edge of the inline element the tooltip is positioned against.
    pub anchor_left_x: f32,
    /// Natural tooltip width, already capped at [`MAX_TOOLTIP_WIDTH`].
    pub tooltip_width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TooltipPlacement {
    /// Centered over the marker, arrow in the middle.
    Centered { max_width: f32 },
    /// Shifted to stay inside the container.
    Shifted {
        /// Tooltip left edge relative to the anchor element.
        left: f32,
        width: f32,
        /// Arrow position as a percentage of `width`.
        arrow_percent: f32,
    },
}

pub fn place_tooltip(g: &TooltipGeometry) -> TooltipPlacement {
    let arrow_x = g.marker_center_x;
    let half = g.tooltip_width / 2.0;
    let min_left = CONTAINER_PADDING;
    let max_right = g.container_width - CONTAINER_PADDING;
    let max_width = (max_right - min_left).max(0.0);

    if arrow_x - half < min_left {
        let width = g.tooltip_width.min(max_width);
        let left = min_left;
        let (lo, hi) = LEFT_ARROW_RANGE;
        let arrow = (arrow_x - left).clamp(width * lo, width * hi);
        shifted(left - g.anchor_left_x, width, arrow)
    } else if arrow_x + half > max_right {
        let width = g.tooltip_width.min(max_width);
        let left = max_right - width;
        let arrow = (arrow_x - left).clamp(
            RIGHT_ARROW_MARGIN.min(width / 2.0),
            (width - RIGHT_ARROW_MARGIN).max(width / 2.0),
        );
        shifted(left - g.anchor_left_x, width, arrow)
    } else {
        TooltipPlacement::Centered {
            max_width: MAX_TOOLTIP_WIDTH,
        }
    }
}

fn shifted(left: f32, width: f32, arrow: f32) -> TooltipPlacement {
    let arrow_percent = if width > 0.0 { arrow / width * 100.0 } else { 50.0 };
    TooltipPlacement::Shifted {
        left,
        width,
        arrow_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(marker: f32, width: f32) -> TooltipGeometry {
        TooltipGeometry {
            container_width: 400.0,
            marker_center_x: marker,
            anchor_left_x: marker - 10.0,
            tooltip_width: width,
        }
    }

    #[test]
    fn test_centered_when_it_fits() {
        assert_eq!(
            place_tooltip(&geometry(200.0, 300.0)),
            TooltipPlacement::Centered { max_width: 320.0 }
        );
    }

    #[test]
    fn test_clamped_left() {
        let TooltipPlacement::Shifted {
            left,
            width,
            arrow_percent,
        } = place_tooltip(&geometry(40.0, 300.0))
        else {
            panic!("expected shifted placement");
        };
        assert_eq!(width, 300.0);
        // Tooltip left at x=16, anchor left at x=30.
        assert_eq!(left, -14.0);
        // Arrow at 24px would be 8%; held at 15%.
        assert!((arrow_percent - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_clamped_right() {
        let TooltipPlacement::Shifted {
            left,
            width,
            arrow_percent,
        } = place_tooltip(&geometry(380.0, 300.0))
        else {
            panic!("expected shifted placement");
        };
        assert_eq!(width, 300.0);
        // Right edge at 384, so left edge at 84; anchor at 370.
        assert_eq!(left, 84.0 - 370.0);
        // Arrow offset 296 clamps to 294.
        assert!((arrow_percent - 294.0 / 300.0 * 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_narrow_container_shrinks_tooltip() {
        let g = TooltipGeometry {
            container_width: 200.0,
            marker_center_x: 20.0,
            anchor_left_x: 10.0,
            tooltip_width: 320.0,
        };
        let TooltipPlacement::Shifted { width, .. } = place_tooltip(&g) else {
            panic!("expected shifted placement");
        };
        assert_eq!(width, 168.0);
    }
}
