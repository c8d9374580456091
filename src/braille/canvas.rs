/// First code point of the Unicode Braille block; the low byte selects the dots
const BRAILLE_BASE: u32 = 0x2800;

/// Dot bit for each (x, y) inside a 2x4 cell, indexed `[y][x]`
const DOT_BITS: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];

/// Off-screen drawing surface where every terminal cell holds 2x4 Braille dots.
///
/// Coordinates passed to the drawing methods are dot (pixel) coordinates, so a
/// canvas of `width` x `height` cells has `width * 2` x `height * 4` pixels.
pub struct BrailleCanvas {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl BrailleCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    /// Set one dot; anything outside the canvas is dropped
    pub fn set_pixel(&mut self, x: usize, y: usize) {
        let (cx, cy) = (x / 2, y / 4);
        if cx >= self.width || cy >= self.height {
            return;
        }
        self.cells[cy * self.width + cx] |= DOT_BITS[y % 4][x % 2];
    }

    /// Signed variant for projected coordinates, which may lie left of or above the canvas
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) {
            self.set_pixel(x, y);
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether any dot in the given character cell is set
    pub fn cell_is_set(&self, cx: usize, cy: usize) -> bool {
        cx < self.width && cy < self.height && self.cells[cy * self.width + cx] != 0
    }

    /// Every cell with at least one dot, as `(column, row, glyph)`
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize, char)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &bits)| bits != 0)
            .map(|(idx, &bits)| (idx % self.width, idx / self.width, glyph(bits)))
    }

    /// One row of cells as Braille text
    pub fn row(&self, cy: usize) -> String {
        if cy >= self.height {
            return String::new();
        }
        let start = cy * self.width;
        self.cells[start..start + self.width].iter().map(|&bits| glyph(bits)).collect()
    }
}

fn glyph(bits: u8) -> char {
    char::from_u32(BRAILLE_BASE + bits as u32).unwrap_or(' ')
}

#[cfg(test)]
impl std::fmt::Display for BrailleCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rows: Vec<String> = (0..self.height).map(|cy| self.row(cy)).collect();
        f.write_str(&rows.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_layout() {
        let mut canvas = BrailleCanvas::new(2, 1);
        canvas.set_pixel(0, 0);
        canvas.set_pixel(1, 1);
        canvas.set_pixel(2, 2);
        canvas.set_pixel(3, 3);
        assert_eq!(canvas.to_string(), "⠑⢄");
    }

    #[test]
    fn test_full_cell() {
        let mut canvas = BrailleCanvas::new(1, 1);
        for x in 0..2 {
            for y in 0..4 {
                canvas.set_pixel(x, y);
            }
        }
        assert_eq!(canvas.to_string(), "⣿");
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(2, 0);
        canvas.set_pixel_signed(-1, 0);
        assert!(!canvas.cell_is_set(0, 0));
        canvas.set_pixel_signed(1, 3);
        assert!(canvas.cell_is_set(0, 0));
        assert!(!canvas.cell_is_set(1, 0));
    }

    #[test]
    fn test_occupied_skips_blank_cells() {
        let mut canvas = BrailleCanvas::new(3, 2);
        canvas.set_pixel(4, 4);
        let cells: Vec<_> = canvas.occupied().collect();
        assert_eq!(cells, [(2, 1, '⠁')]);
        assert_eq!(canvas.row(1), "⠀⠀⠁");
        assert_eq!(canvas.row(5), "");
    }
}
