//! Minimal figures: line and scatter series rasterized to PNG.

#[cfg(feature = "plot")]
use crate::error::{ScriptError, ScriptResult};

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Line,
    Scatter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub kind: SeriesKind,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub width: u32,
    pub height: u32,
    pub title: Option<String>,
    pub series: Vec<Series>,
}

impl Default for Figure {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl Figure {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            title: None,
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, kind: SeriesKind, points: Vec<(f64, f64)>) {
        self.series.push(Series { kind, points });
    }

    /// Drop every series and the title; the size is kept.
    pub fn clear(&mut self) {
        self.series.clear();
        self.title = None;
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|series| series.points.is_empty())
    }

    /// Data bounds as `(x_min, x_max, y_min, y_max)`, widened when degenerate.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self
            .series
            .iter()
            .flat_map(|series| series.points.iter().copied())
            .filter(|(x, y)| x.is_finite() && y.is_finite());
        let (x0, y0) = points.next()?;
        let (mut x_min, mut x_max, mut y_min, mut y_max) = (x0, x0, y0, y0);
        for (x, y) in points {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        if x_max - x_min == 0.0 {
            x_min -= 0.5;
            x_max += 0.5;
        }
        if y_max - y_min == 0.0 {
            y_min -= 0.5;
            y_max += 0.5;
        }
        Some((x_min, x_max, y_min, y_max))
    }
}

#[cfg(feature = "plot")]
mod raster {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

    use super::*;

    const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const FRAME: Rgba<u8> = Rgba([64, 64, 64, 255]);
    const PALETTE: [[u8; 3]; 10] = [
        [31, 119, 180],
        [255, 127, 14],
        [44, 160, 44],
        [214, 39, 40],
        [148, 103, 189],
        [140, 86, 75],
        [227, 119, 194],
        [127, 127, 127],
        [188, 189, 34],
        [23, 190, 207],
    ];
    const MARKER_RADIUS: i64 = 2;

    struct Canvas {
        image: RgbaImage,
        left: i64,
        top: i64,
        right: i64,
        bottom: i64,
    }

    impl Canvas {
        fn new(width: u32, height: u32) -> Self {
            let margin = i64::from(width.min(height) / 10);
            let (w, h) = (i64::from(width), i64::from(height));
            let margin = if w > 2 * margin + 1 && h > 2 * margin + 1 {
                margin
            } else {
                0
            };
            Self {
                image: RgbaImage::from_pixel(width, height, BACKGROUND),
                left: margin,
                top: margin,
                right: w - 1 - margin,
                bottom: h - 1 - margin,
            }
        }

        fn put(&mut self, x: i64, y: i64, colour: Rgba<u8>) {
            if x < 0 || y < 0 {
                return;
            }
            let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
                return;
            };
            if x < self.image.width() && y < self.image.height() {
                self.image.put_pixel(x, y, colour);
            }
        }

        fn frame(&mut self) {
            for x in self.left..=self.right {
                self.put(x, self.top, FRAME);
                self.put(x, self.bottom, FRAME);
            }
            for y in self.top..=self.bottom {
                self.put(self.left, y, FRAME);
                self.put(self.right, y, FRAME);
            }
        }

        /// Bresenham between two pixel coordinates.
        fn line(&mut self, from: (i64, i64), to: (i64, i64), colour: Rgba<u8>) {
            let (mut x0, mut y0) = from;
            let (x1, y1) = to;
            let dx = (x1 - x0).abs();
            let dy = -(y1 - y0).abs();
            let sx = if x0 < x1 { 1 } else { -1 };
            let sy = if y0 < y1 { 1 } else { -1 };
            let mut err = dx + dy;
            loop {
                self.put(x0, y0, colour);
                if x0 == x1 && y0 == y1 {
                    break;
                }
                let doubled = 2 * err;
                if doubled >= dy {
                    err += dy;
                    x0 += sx;
                }
                if doubled <= dx {
                    err += dx;
                    y0 += sy;
                }
            }
        }

        fn marker(&mut self, centre: (i64, i64), colour: Rgba<u8>) {
            for dx in -MARKER_RADIUS..=MARKER_RADIUS {
                for dy in -MARKER_RADIUS..=MARKER_RADIUS {
                    self.put(centre.0 + dx, centre.1 + dy, colour);
                }
            }
        }
    }

    impl Figure {
        /// Rasterize to PNG bytes.
        pub fn to_png(&self) -> ScriptResult<Vec<u8>> {
            if self.width == 0 || self.height == 0 {
                return Err(ScriptError::Figure(format!(
                    "invalid figure size {}x{}",
                    self.width, self.height
                )));
            }
            let mut canvas = Canvas::new(self.width, self.height);
            canvas.frame();

            if let Some((x_min, x_max, y_min, y_max)) = self.bounds() {
                let inset = 4_i64.min((canvas.right - canvas.left).min(canvas.bottom - canvas.top) / 4);
                let span_x = (canvas.right - canvas.left - 2 * inset) as f64;
                let span_y = (canvas.bottom - canvas.top - 2 * inset) as f64;
                let (left, bottom) = (canvas.left + inset, canvas.bottom - inset);
                let project = |(x, y): (f64, f64)| -> (i64, i64) {
                    let px = left as f64 + (x - x_min) / (x_max - x_min) * span_x;
                    let py = bottom as f64 - (y - y_min) / (y_max - y_min) * span_y;
                    (px.round() as i64, py.round() as i64)
                };

                for (index, series) in self.series.iter().enumerate() {
                    let [r, g, b] = PALETTE[index % PALETTE.len()];
                    let colour = Rgba([r, g, b, 255]);
                    let pixels: Vec<_> = series
                        .points
                        .iter()
                        .copied()
                        .filter(|(x, y)| x.is_finite() && y.is_finite())
                        .map(project)
                        .collect();
                    match series.kind {
                        SeriesKind::Line => {
                            for pair in pixels.windows(2) {
                                canvas.line(pair[0], pair[1], colour);
                            }
                            if let [only] = pixels.as_slice() {
                                canvas.marker(*only, colour);
                            }
                        }
                        SeriesKind::Scatter => {
                            for pixel in pixels {
                                canvas.marker(pixel, colour);
                            }
                        }
                    }
                }
            }

            let mut bytes = Vec::new();
            DynamicImage::ImageRgba8(canvas.image)
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .map_err(|err| ScriptError::Figure(err.to_string()))?;
            Ok(bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_widen_degenerate_axes() {
        let mut figure = Figure::default();
        figure.add_series(SeriesKind::Scatter, vec![(1.0, 2.0)]);
        assert_eq!(figure.bounds(), Some((0.5, 1.5, 1.5, 2.5)));
    }

    #[test]
    fn empty_figure_has_no_bounds() {
        assert!(Figure::default().bounds().is_none());
        assert!(Figure::default().is_empty());
    }

    #[test]
    fn clear_keeps_size() {
        let mut figure = Figure::new(100, 50);
        figure.title = Some("t".into());
        figure.add_series(SeriesKind::Line, vec![(0.0, 0.0), (1.0, 1.0)]);
        figure.clear();
        assert!(figure.is_empty());
        assert_eq!(figure.title, None);
        assert_eq!((figure.width, figure.height), (100, 50));
    }

    #[cfg(feature = "plot")]
    #[test]
    fn png_has_signature() {
        let mut figure = Figure::new(64, 48);
        figure.add_series(SeriesKind::Line, vec![(0.0, 0.0), (1.0, 3.0), (2.0, 1.0)]);
        let png = figure.to_png().expect("png");
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
