use crate::{error::Error, overlay::Segment};

/// How segments are stroked: solid, with rounded joins and caps.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Stroke {
    pub(crate) width: f32,
    /// RGBA.
    pub(crate) color: [u8; 4],
}

impl Stroke {
    pub(crate) const WHITE: [u8; 4] = [255, 255, 255, 255];

    pub(crate) fn new(width: f32) -> Result<Self, Error> {
        if width > 0.0 && width.is_finite() {
            Ok(Self {
                width,
                color: Self::WHITE,
            })
        } else {
            Err(Error::InvalidStrokeWidth(width))
        }
    }
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            width: 2.0,
            color: Self::WHITE,
        }
    }
}

/// A persistent drawing surface composited over the camera view.
pub(crate) trait OverlaySurface {
    /// Reallocate the backing buffer; previous content is lost.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), Error>;

    /// Reset every pixel to transparent.
    fn clear(&mut self) -> Result<(), Error>;

    fn draw_segment(&mut self, segment: &Segment, stroke: &Stroke) -> Result<(), Error>;

    /// Make the drawn content visible.
    fn present(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Headless surface that keeps the segments drawn since the last clear.
#[derive(Debug, Default)]
pub(crate) struct RecordingSurface {
    width: u32,
    height: u32,
    segments: Vec<Segment>,
    clears: usize,
    presents: usize,
}

impl RecordingSurface {
    #[cfg(test)]
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub(crate) fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub(crate) fn clears(&self) -> usize {
        self.clears
    }

    pub(crate) fn presents(&self) -> usize {
        self.presents
    }
}

impl OverlaySurface for RecordingSurface {
    fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        self.width = width;
        self.height = height;
        self.segments.clear();
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Error> {
        self.segments.clear();
        self.clears += 1;
        Ok(())
    }

    fn draw_segment(&mut self, segment: &Segment, _stroke: &Stroke) -> Result<(), Error> {
        self.segments.push(*segment);
        Ok(())
    }

    fn present(&mut self) -> Result<(), Error> {
        self.presents += 1;
        Ok(())
    }
}

#[cfg(feature = "gui")]
pub(crate) use window::WindowSurface;

#[cfg(feature = "gui")]
mod window {
    use super::{OverlaySurface, Stroke};
    use crate::{error::Error, overlay::Segment};
    use num_traits::ToPrimitive;
    use opencv::{
        core::{Mat, Point2f, Scalar, CV_8UC4},
        imgproc::LINE_AA,
    };
    use std::convert::TryFrom;

    /// OpenCV window showing the overlay on a transparent BGRA canvas.
    pub(crate) struct WindowSurface {
        name: String,
        canvas: Mat,
        rows: i32,
        cols: i32,
    }

    fn blank(rows: i32, cols: i32) -> Result<Mat, Error> {
        Mat::new_rows_cols_with_default(rows, cols, CV_8UC4, Scalar::all(0.0))
            .map_err(Error::AllocateCanvas)
    }

    fn dimension(value: u32) -> Result<i32, Error> {
        i32::try_from(value).map_err(|e| Error::ConvertDimension(e, value))
    }

    impl WindowSurface {
        /// An empty window; call [`OverlaySurface::resize`] before drawing.
        pub(crate) fn new(name: &str) -> Self {
            Self {
                name: name.to_owned(),
                canvas: Mat::default(),
                rows: 0,
                cols: 0,
            }
        }
    }

    impl OverlaySurface for WindowSurface {
        fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
            self.rows = dimension(height)?;
            self.cols = dimension(width)?;
            self.canvas = blank(self.rows, self.cols)?;
            Ok(())
        }

        fn clear(&mut self) -> Result<(), Error> {
            self.canvas = blank(self.rows, self.cols)?;
            Ok(())
        }

        fn draw_segment(&mut self, segment: &Segment, stroke: &Stroke) -> Result<(), Error> {
            let start = Point2f::new(segment.start_x, segment.start_y);
            let end = Point2f::new(segment.end_x, segment.end_y);
            let [r, g, b, a] = stroke.color;
            opencv::imgproc::line(
                &mut self.canvas,
                start.to().ok_or(Error::ConvertPoint2fToPoint2i(start))?,
                end.to().ok_or(Error::ConvertPoint2fToPoint2i(end))?,
                Scalar::new(f64::from(b), f64::from(g), f64::from(r), f64::from(a)),
                stroke.width.round().to_i32().unwrap_or(1).max(1), // thickness
                LINE_AA,                                            // line_type
                0,                                                  // shift
            )
            .map_err(Error::DrawLine)
        }

        fn present(&mut self) -> Result<(), Error> {
            opencv::highgui::imshow(&self.name, &self.canvas).map_err(Error::ImShow)?;
            opencv::highgui::wait_key(1).map_err(Error::WaitKey)?;
            Ok(())
        }
    }
}
