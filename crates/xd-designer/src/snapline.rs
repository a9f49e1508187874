//! Snapline geometry.
//!
//! A horizontal line sits at a y `offset` and spans `start..end` along x;
//! a vertical line is the transpose. Snapping compares the lines of the
//! item being placed against a map built from its container and siblings.

use kurbo::Rect;

use crate::placement::{HorizontalEdge, PlacementAlignment, VerticalEdge};

/// Lines only snap to lines of the same group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineGroup {
    #[default]
    Edge,
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapline {
    pub offset: f64,
    pub start: f64,
    pub end: f64,
    pub group: LineGroup,
    /// Only snap when the spans of both lines overlap.
    pub require_overlap: bool,
}

impl Snapline {
    pub fn new(offset: f64, start: f64, end: f64) -> Self {
        Self {
            offset,
            start,
            end,
            group: LineGroup::Edge,
            require_overlap: false,
        }
    }

    fn overlaps(&self, other: &Snapline) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    fn can_snap_to(&self, other: &Snapline) -> bool {
        self.group == other.group
            && (!(self.require_overlap || other.require_overlap) || self.overlaps(other))
    }
}

/// Horizontal and vertical lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnaplineMap {
    pub horizontal: Vec<Snapline>,
    pub vertical: Vec<Snapline>,
}

impl SnaplineMap {
    /// Add the edges of `rect` pushed outward by `inflate` (inward when
    /// negative). An uninflated rect also contributes its center lines.
    pub fn add_rect(&mut self, rect: Rect, inflate: f64, require_overlap: bool) {
        let r = rect.inflate(inflate, inflate);
        let line = |offset, start, end| Snapline {
            require_overlap,
            ..Snapline::new(offset, start, end)
        };
        self.horizontal.push(line(r.y0, r.x0, r.x1));
        self.horizontal.push(line(r.y1, r.x0, r.x1));
        self.vertical.push(line(r.x0, r.y0, r.y1));
        self.vertical.push(line(r.x1, r.y0, r.y1));
        if inflate == 0.0 {
            let center = r.center();
            self.horizontal.push(line(center.y, r.x0, r.x1));
            self.vertical.push(line(center.x, r.y0, r.y1));
        }
    }

    /// Add a text baseline `baseline` below the top of `rect`.
    pub fn add_baseline(&mut self, rect: Rect, baseline: f64) {
        self.horizontal.push(Snapline {
            group: LineGroup::Baseline,
            ..Snapline::new(rect.y0 + baseline, rect.x0, rect.x1)
        });
    }

    pub fn is_empty(&self) -> bool {
        self.horizontal.is_empty() && self.vertical.is_empty()
    }
}

/// Lines of an item being placed. A moved item offers every edge, its
/// centers and its baseline; a resized one only the edges under the thumb.
pub fn input_lines(bounds: Rect, baseline: Option<f64>, resize: Option<PlacementAlignment>) -> SnaplineMap {
    let mut map = SnaplineMap::default();
    let Some(alignment) = resize else {
        map.add_rect(bounds, 0.0, false);
        if let Some(baseline) = baseline {
            map.add_baseline(bounds, baseline);
        }
        return map;
    };
    match alignment.horizontal {
        HorizontalEdge::Left => map.vertical.push(Snapline::new(bounds.x0, bounds.y0, bounds.y1)),
        HorizontalEdge::Right => map.vertical.push(Snapline::new(bounds.x1, bounds.y0, bounds.y1)),
        HorizontalEdge::Center => {}
    }
    match alignment.vertical {
        VerticalEdge::Top => map.horizontal.push(Snapline::new(bounds.y0, bounds.x0, bounds.x1)),
        VerticalEdge::Bottom => map.horizontal.push(Snapline::new(bounds.y1, bounds.x0, bounds.x1)),
        VerticalEdge::Center => {}
    }
    map
}

/// Smallest shift that lines any input line up with a map line, if one is
/// within `accuracy`. Ties go to the lower map offset, then to the earlier
/// input line.
pub fn snap(input: &[Snapline], map: &[Snapline], accuracy: f64) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for line in input {
        for target in map.iter().filter(|t| line.can_snap_to(t)) {
            let delta = target.offset - line.offset;
            if delta.abs() > accuracy {
                continue;
            }
            let better = match best {
                None => true,
                Some((d, offset)) => {
                    delta.abs() < d.abs() || (delta.abs() == d.abs() && target.offset < offset)
                }
            };
            if better {
                best = Some((delta, target.offset));
            }
        }
    }
    best.map(|(delta, _)| delta)
}

/// Guide lines to draw after snapping by `delta`: one per matched offset,
/// spanning the input and every map line it meets.
pub fn draw_lines(input: &[Snapline], map: &[Snapline], delta: f64) -> Vec<Snapline> {
    let mut drawn: Vec<Snapline> = Vec::new();
    for line in input {
        let offset = line.offset + delta;
        let hits: Vec<&Snapline> = map
            .iter()
            .filter(|t| line.can_snap_to(t) && (t.offset - offset).abs() < 1e-6)
            .collect();
        if hits.is_empty() {
            continue;
        }
        let start = hits.iter().map(|t| t.start).fold(line.start, f64::min);
        let end = hits.iter().map(|t| t.end).fold(line.end, f64::max);
        match drawn.iter_mut().find(|d| (d.offset - offset).abs() < 1e-6) {
            Some(existing) => {
                existing.start = existing.start.min(start);
                existing.end = existing.end.max(end);
            }
            None => drawn.push(Snapline {
                group: line.group,
                ..Snapline::new(offset, start, end)
            }),
        }
    }
    drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn snaps_within_accuracy_only() {
        let input = [Snapline::new(100.0, 0.0, 10.0)];
        let map = [Snapline::new(103.0, 0.0, 10.0)];
        assert_eq!(snap(&input, &map, 5.0), Some(3.0));
        assert_eq!(snap(&input, &map, 2.0), None);
    }

    #[test]
    fn ties_prefer_the_lower_offset() {
        let input = [Snapline::new(50.0, 0.0, 10.0)];
        let map = [Snapline::new(52.0, 0.0, 10.0), Snapline::new(48.0, 0.0, 10.0)];
        assert_eq!(snap(&input, &map, 5.0), Some(-2.0));

        let input = [Snapline::new(10.0, 0.0, 1.0), Snapline::new(30.0, 0.0, 1.0)];
        let map = [Snapline::new(12.0, 0.0, 1.0), Snapline::new(32.0, 0.0, 1.0), Snapline::new(31.0, 0.0, 1.0)];
        assert_eq!(snap(&input, &map, 5.0), Some(1.0));
    }

    #[test]
    fn overlap_and_group_gate_matches() {
        let input = [Snapline::new(0.0, 0.0, 10.0)];
        let far = Snapline {
            require_overlap: true,
            ..Snapline::new(1.0, 50.0, 60.0)
        };
        assert_eq!(snap(&input, &[far], 5.0), None);
        assert_eq!(snap(&input, &[Snapline { start: 5.0, ..far }], 5.0), Some(1.0));

        let baseline = Snapline {
            group: LineGroup::Baseline,
            ..Snapline::new(1.0, 0.0, 10.0)
        };
        assert_eq!(snap(&input, &[baseline], 5.0), None);
    }

    #[test]
    fn rect_lines_include_centers_unless_inflated() {
        let mut map = SnaplineMap::default();
        map.add_rect(Rect::new(0.0, 0.0, 100.0, 50.0), 0.0, false);
        let offsets: Vec<f64> = map.vertical.iter().map(|l| l.offset).collect();
        assert_eq!(offsets, vec![0.0, 100.0, 50.0]);

        let mut map = SnaplineMap::default();
        map.add_rect(Rect::new(0.0, 0.0, 100.0, 50.0), -8.0, false);
        let offsets: Vec<f64> = map.horizontal.iter().map(|l| l.offset).collect();
        assert_eq!(offsets, vec![8.0, 42.0]);
    }

    #[test]
    fn resize_input_uses_the_dragged_edges() {
        let alignment = PlacementAlignment {
            horizontal: HorizontalEdge::Right,
            vertical: VerticalEdge::Center,
        };
        let lines = input_lines(Rect::new(10.0, 10.0, 40.0, 30.0), Some(5.0), Some(alignment));
        assert_eq!(lines.vertical, vec![Snapline::new(40.0, 10.0, 30.0)]);
        assert!(lines.horizontal.is_empty());
    }

    #[test]
    fn drawn_lines_span_both_partners() {
        let input = [Snapline::new(20.0, 100.0, 150.0)];
        let map = [Snapline::new(22.0, 0.0, 40.0), Snapline::new(22.0, 300.0, 320.0)];
        assert_eq!(draw_lines(&input, &map, 2.0), vec![Snapline::new(22.0, 0.0, 320.0)]);
    }
}
