// THEORY:
// The region extractor is the last stage and the only one that talks about
// "things" rather than pixels. It walks the borders of every connected active
// area in the cleaned mask and keeps only the outermost ones: holes inside a
// blob and blobs nested inside those holes are dropped.
//
// Border tracing yields one point per boundary pixel. Long straight runs carry
// no information beyond their end points, so horizontal, vertical and diagonal
// runs are compressed down to their corners. A clean rectangle therefore comes
// back as four points.
//
// Overlay drawing is purely visual. Nothing drawn here feeds back into the
// verdict.

use crate::core_modules::frame::Frame;
use image::{GrayImage, Rgb};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::drawing::BresenhamLineIter;

/// A 2D integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// The ordered outer boundary of one connected active region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub points: Vec<Point>,
}

impl Region {
    /// Top-left and bottom-right corners, inclusive.
    pub fn bounding_box(&self) -> Option<(Point, Point)> {
        let first = self.points.first()?;
        let mut min = *first;
        let mut max = *first;
        for point in &self.points {
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }
        Some((min, max))
    }
}

/// Finds the outer, top-level contours of the active regions in `mask`.
pub fn extract_regions(mask: &GrayImage) -> Vec<Region> {
    let contours: Vec<Contour<i32>> = find_contours(mask);
    contours
        .into_iter()
        .filter(|contour| matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none())
        .map(|contour| {
            let traced: Vec<Point> = contour
                .points
                .iter()
                .map(|p| Point { x: p.x, y: p.y })
                .collect();
            Region {
                points: compress_runs(&traced),
            }
        })
        .collect()
}

/// Drops every point that sits in the middle of a straight run. The boundary
/// is treated as closed.
fn compress_runs(points: &[Point]) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let step = |from: Point, to: Point| ((to.x - from.x).signum(), (to.y - from.y).signum());

    let kept: Vec<Point> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let here = points[i];
            let next = points[(i + 1) % n];
            step(prev, here) != step(here, next)
        })
        .map(|i| points[i])
        .collect();

    // Every point identical: keep the ends so there is still something to draw.
    if kept.is_empty() {
        return vec![points[0], points[n - 1]];
    }
    kept
}

/// Draws each region as a closed polyline onto `canvas`.
pub fn draw_regions(canvas: &mut Frame, regions: &[Region], color: [u8; 3], thickness: u32) {
    let color = Rgb(color);
    for region in regions {
        let n = region.points.len();
        match n {
            0 => {}
            1 => stamp(canvas, region.points[0], color, thickness),
            _ => {
                for i in 0..n {
                    let start = region.points[i];
                    let end = region.points[(i + 1) % n];
                    draw_segment(canvas, start, end, color, thickness);
                }
            }
        }
    }
}

fn draw_segment(canvas: &mut Frame, start: Point, end: Point, color: Rgb<u8>, thickness: u32) {
    let line = BresenhamLineIter::new((start.x as f32, start.y as f32), (end.x as f32, end.y as f32));
    for (x, y) in line {
        stamp(canvas, Point { x, y }, color, thickness);
    }
    // The iterator may stop one short of the end point.
    stamp(canvas, end, color, thickness);
}

/// Paints a `thickness x thickness` square brush centered on `at`, clipped to
/// the canvas.
fn stamp(canvas: &mut Frame, at: Point, color: Rgb<u8>, thickness: u32) {
    let (width, height) = canvas.dimensions();
    let lo = -((thickness as i32) / 2);
    let hi = lo + thickness as i32;
    for dy in lo..hi {
        for dx in lo..hi {
            let (x, y) = (at.x + dx, at.y + dy);
            if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                canvas.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::binarizer::ACTIVE;
    use image::Luma;

    fn fill_rect(mask: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.put_pixel(x, y, Luma([ACTIVE]));
            }
        }
    }

    #[test]
    fn empty_mask_has_no_regions() {
        assert!(extract_regions(&GrayImage::new(50, 50)).is_empty());
    }

    #[test]
    fn filled_rectangle_compresses_to_its_corners() {
        let mut mask = GrayImage::new(60, 40);
        fill_rect(&mut mask, 10, 5, 20, 15);

        let regions = extract_regions(&mask);
        assert_eq!(regions.len(), 1);

        let region = &regions[0];
        assert_eq!(region.points.len(), 4);
        for corner in [
            Point { x: 10, y: 5 },
            Point { x: 29, y: 5 },
            Point { x: 29, y: 19 },
            Point { x: 10, y: 19 },
        ] {
            assert!(region.points.contains(&corner), "missing corner {:?}", corner);
        }
    }

    #[test]
    fn diamond_compresses_diagonal_runs_to_its_tips() {
        let mask = GrayImage::from_fn(41, 41, |x, y| {
            let reach = (x as i32 - 20).abs() + (y as i32 - 20).abs();
            Luma([if reach <= 10 { ACTIVE } else { 0 }])
        });

        let regions = extract_regions(&mask);
        assert_eq!(regions.len(), 1);

        let region = &regions[0];
        assert_eq!(region.points.len(), 4);
        for tip in [
            Point { x: 20, y: 10 },
            Point { x: 10, y: 20 },
            Point { x: 20, y: 30 },
            Point { x: 30, y: 20 },
        ] {
            assert!(region.points.contains(&tip), "missing tip {:?}", tip);
        }
    }

    #[test]
    fn holes_and_nested_blobs_are_dropped() {
        let mut mask = GrayImage::new(60, 60);
        fill_rect(&mut mask, 5, 5, 50, 50);
        // Punch a hole, then put an island inside the hole.
        for y in 15..45 {
            for x in 15..45 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        fill_rect(&mut mask, 25, 25, 10, 10);

        let regions = extract_regions(&mask);
        assert_eq!(regions.len(), 1);
        let (min, max) = regions[0].bounding_box().unwrap();
        assert_eq!((min.x, min.y, max.x, max.y), (5, 5, 54, 54));
    }

    #[test]
    fn separate_blobs_give_separate_regions() {
        let mut mask = GrayImage::new(80, 30);
        fill_rect(&mut mask, 5, 5, 10, 10);
        fill_rect(&mut mask, 40, 10, 12, 8);
        assert_eq!(extract_regions(&mask).len(), 2);
    }

    #[test]
    fn compress_keeps_direction_changes_only() {
        let line: Vec<Point> = (0..5).map(|x| Point { x, y: 0 }).collect();
        let compressed = compress_runs(&line);
        // An open straight line turns back on itself at both ends.
        assert_eq!(compressed, vec![Point { x: 0, y: 0 }, Point { x: 4, y: 0 }]);
    }

    #[test]
    fn drawing_outlines_but_does_not_fill() {
        let mut canvas = Frame::new(40, 40);
        let region = Region {
            points: vec![
                Point { x: 10, y: 10 },
                Point { x: 30, y: 10 },
                Point { x: 30, y: 30 },
                Point { x: 10, y: 30 },
            ],
        };
        draw_regions(&mut canvas, &[region], [255, 0, 0], 2);

        assert_eq!(canvas.get_pixel(20, 10), &Rgb([255, 0, 0]));
        assert_eq!(canvas.get_pixel(30, 20), &Rgb([255, 0, 0]));
        assert_eq!(canvas.get_pixel(20, 20), &Rgb([0, 0, 0]));
    }

    #[test]
    fn drawing_nothing_leaves_canvas_untouched() {
        let mut canvas = Frame::from_pixel(16, 16, Rgb([7, 8, 9]));
        let before = canvas.clone();
        draw_regions(&mut canvas, &[], [255, 0, 0], 2);
        assert_eq!(canvas, before);
    }

    #[test]
    fn brush_is_clipped_at_the_edges() {
        let mut canvas = Frame::new(4, 4);
        stamp(&mut canvas, Point { x: 0, y: 0 }, Rgb([1, 2, 3]), 3);
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([1, 2, 3]));
        assert_eq!(canvas.get_pixel(1, 1), &Rgb([1, 2, 3]));
        assert_eq!(canvas.get_pixel(2, 2), &Rgb([0, 0, 0]));
    }
}
