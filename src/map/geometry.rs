use crate::braille::BrailleCanvas;

/// Plot a straight segment between two pixels (Bresenham, all octants)
pub fn draw_line(canvas: &mut BrailleCanvas, from: (i32, i32), to: (i32, i32)) {
    let (mut x, mut y) = from;
    let (dx, dy) = ((to.0 - x).abs(), -(to.1 - y).abs());
    let step_x = (to.0 - x).signum();
    let step_y = (to.1 - y).signum();
    let mut err = dx + dy;

    loop {
        canvas.set_pixel_signed(x, y);
        if (x, y) == to {
            return;
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            x += step_x;
        }
        if doubled <= dx {
            err += dx;
            y += step_y;
        }
    }
}

/// Plus-shaped cross of arm length `arm`, used to ring the selected marker
pub fn draw_cross(canvas: &mut BrailleCanvas, center: (i32, i32), arm: i32) {
    let (x, y) = center;
    for offset in -arm..=arm {
        canvas.set_pixel_signed(x + offset, y);
        canvas.set_pixel_signed(x, y + offset);
    }
}

/// Filled disc, the supplier marker itself
pub fn draw_dot(canvas: &mut BrailleCanvas, center: (i32, i32), radius: i32) {
    let (x, y) = center;
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                canvas.set_pixel_signed(x + dx, y + dy);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, (0, 0), (9, 0));
        // Top dot row of every cell
        assert_eq!(canvas.to_string(), "⠉⠉⠉⠉⠉");
    }

    #[test]
    fn test_line_direction_does_not_matter() {
        let mut forward = BrailleCanvas::new(1, 2);
        let mut backward = BrailleCanvas::new(1, 2);
        draw_line(&mut forward, (0, 0), (0, 7));
        draw_line(&mut backward, (0, 7), (0, 0));
        assert_eq!(forward.to_string(), "⡇\n⡇");
        assert_eq!(forward.to_string(), backward.to_string());
    }

    #[test]
    fn test_dot_clipped_at_edge() {
        let mut canvas = BrailleCanvas::new(2, 1);
        draw_dot(&mut canvas, (0, 0), 1);
        // (0,0) (1,0) (0,1) set; negative pixels ignored
        assert_eq!(canvas.to_string(), "⠋⠀");
    }

    #[test]
    fn test_cross_arms() {
        let mut canvas = BrailleCanvas::new(2, 2);
        draw_cross(&mut canvas, (1, 3), 1);
        // (0,3) (1,2) (1,3) (2,3) and (1,4)
        assert!(canvas.cell_is_set(0, 0));
        assert!(canvas.cell_is_set(1, 0));
        assert!(canvas.cell_is_set(0, 1));
        assert!(!canvas.cell_is_set(1, 1));
    }
}
