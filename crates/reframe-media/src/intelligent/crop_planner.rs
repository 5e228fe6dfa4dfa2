//! Crop window solver.
//!
//! Turns the detection history of the current shot into a raw (unsmoothed)
//! crop window:
//!
//! 1. Pick the classes to frame with the prioritization policy.
//! 2. Take the horizontal extent of all included regions. Only when no
//!    region qualifies does the extent collapse to the frame centre.
//! 3. If the extent is wider than the target crop, try recent detections
//!    only (humans present) or fall back to a target-width span around the
//!    extent's midpoint (no humans).
//! 4. A fitting extent gets a target-width window: the previous window is
//!    kept while it still strictly contains the extent, otherwise the window
//!    is centred on it.
//! 5. An extent that still does not fit gets a widened window, placed with
//!    a slight bias towards its right-hand side.

use reframe_models::{ClassSet, CropWindow, DetectionOutput};
use tracing::trace;

use super::config::ReframeConfig;
use super::history::DetectionHistory;
use super::policy::included_classes;

/// Horizontal extent `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    pub fn point(x: f64) -> Self {
        Self { min: x, max: x }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn center(&self) -> f64 {
        self.min + self.width() / 2.0
    }

    fn include(self, x1: f64, x2: f64) -> Self {
        Self {
            min: self.min.min(x1),
            max: self.max.max(x2),
        }
    }

    /// Extent of the included regions in `detections`; `None` when no
    /// region is of an included class.
    pub fn of_regions<'a>(
        detections: impl Iterator<Item = &'a DetectionOutput>,
        included: ClassSet,
    ) -> Option<Self> {
        detections
            .flat_map(|d| d.regions.iter())
            .filter(|r| included.contains(r.class))
            .fold(None, |span: Option<Span>, r| {
                Some(match span {
                    Some(span) => span.include(r.x1(), r.x2()),
                    None => Span {
                        min: r.x1(),
                        max: r.x2(),
                    },
                })
            })
    }
}

/// Computes raw crop windows from detection history.
#[derive(Debug, Clone)]
pub struct CropPlanner {
    source_width: f64,
    target_width: f64,
    widen_margin: f64,
    trailing_bias: f64,
    recent_detections: usize,
}

impl CropPlanner {
    pub fn new(config: &ReframeConfig) -> Self {
        Self {
            source_width: config.source_width_f64(),
            target_width: config.target_width(),
            widen_margin: config.widen_margin,
            trailing_bias: config.trailing_bias,
            recent_detections: config.recent_detections,
        }
    }

    pub fn target_width(&self) -> f64 {
        self.target_width
    }

    pub fn source_width(&self) -> f64 {
        self.source_width
    }

    /// Solve for the raw window.
    ///
    /// `reference` is the previous raw window of this shot, used for
    /// hysteresis. Pure: the same history and reference give the same window.
    pub fn plan(&self, history: &DetectionHistory, reference: Option<CropWindow>) -> CropWindow {
        let counts = history.max_counts();
        let included = included_classes(&counts);
        let centre = self.source_width / 2.0;
        let tw = self.target_width;

        let mut span =
            Span::of_regions(history.iter(), included).unwrap_or(Span::point(centre));

        if span.width() > tw {
            if counts.contains_humans() {
                let recent = Span::of_regions(history.recent(self.recent_detections), included);
                if let Some(recent) = recent.filter(|r| r.width() <= tw) {
                    span = recent;
                }
            } else {
                let c = span.center();
                span = Span {
                    min: c - tw / 2.0,
                    max: c + tw / 2.0,
                };
            }
        }

        let window = if span.width() <= tw {
            let held = reference
                .map(|r| CropWindow::new(r.x, tw).clamped(self.source_width))
                .filter(|r| span.min > r.x && span.max < r.right());
            match held {
                Some(held) => held,
                None => {
                    let x = (span.center() - tw / 2.0).clamp(0.0, self.source_width - tw);
                    CropWindow::new(x, tw)
                }
            }
        } else {
            let width = (span.width() * (1.0 + self.widen_margin)).min(self.source_width);
            let x = span.min + span.width() * self.trailing_bias - width / 2.0;
            CropWindow::new(x, width).clamped(self.source_width)
        };

        trace!(
            classes = %included,
            span_min = span.min,
            span_max = span.max,
            window = %window,
            "Planned crop"
        );
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reframe_models::{DetectionRegion, SubjectClass};

    fn planner() -> CropPlanner {
        CropPlanner::new(&ReframeConfig::default())
    }

    fn region(x1: f64, x2: f64, class: SubjectClass) -> DetectionRegion {
        DetectionRegion::new((x1, 100.0), (x2, 400.0), 0.9, class)
    }

    fn history(frames: Vec<Vec<DetectionRegion>>) -> DetectionHistory {
        let mut history = DetectionHistory::new(50);
        for regions in frames {
            history.push(regions.into_iter().collect());
        }
        history
    }

    #[test]
    fn test_empty_history_is_centred() {
        let window = planner().plan(&DetectionHistory::new(50), None);
        assert_eq!(window, CropWindow::new(420.0, 1080.0));
    }

    #[test]
    fn test_centred_subject() {
        let h = history(vec![vec![region(900.0, 1020.0, SubjectClass::Face)]]);
        let window = planner().plan(&h, None);
        assert_eq!(window.x, 420.0);
        assert_eq!(window.width, 1080.0);
    }

    #[test]
    fn test_off_centre_subject_is_clamped() {
        let h = history(vec![vec![region(1700.0, 1900.0, SubjectClass::Face)]]);
        let window = planner().plan(&h, None);
        // Span [1700, 1900], centre 1800 -> x 1260, clamped to 840.
        assert_eq!(window.x, 840.0);
        assert!(window.is_within(1920.0));
    }

    #[test]
    fn test_hysteresis_holds_position() {
        let h = history(vec![vec![region(950.0, 1100.0, SubjectClass::Face)]]);
        let reference = CropWindow::new(400.0, 1080.0);
        let window = planner().plan(&h, Some(reference));
        assert_eq!(window.x, 400.0);

        // Touching the edge is not strict containment.
        let h = history(vec![vec![region(950.0, 1480.0, SubjectClass::Face)]]);
        let window = planner().plan(&h, Some(reference));
        // Span [950, 1480], centre 1215.
        assert_eq!(window.x, 675.0);
    }

    #[test]
    fn test_wide_humans_widen_window() {
        let h = history(vec![vec![
            region(100.0, 300.0, SubjectClass::Person),
            region(1500.0, 1700.0, SubjectClass::Person),
        ]]);
        let window = planner().plan(&h, None);
        // Span 1600 -> width 1760, x = 100 + 880 - 880 = 100.
        assert!((window.width - 1760.0).abs() < 1e-9);
        assert!((window.x - 100.0).abs() < 1e-9);
        assert!(window.is_within(1920.0));
    }

    #[test]
    fn test_wide_humans_use_recent_detections() {
        let mut frames = vec![vec![
            region(100.0, 300.0, SubjectClass::Person),
            region(1500.0, 1700.0, SubjectClass::Person),
        ]];
        for _ in 0..10 {
            frames.push(vec![region(1000.0, 1200.0, SubjectClass::Person)]);
        }
        let window = planner().plan(&history(frames), None);
        // Recent span [1000, 1200] fits: centred at 1100.
        assert_eq!(window, CropWindow::new(560.0, 1080.0));
    }

    #[test]
    fn test_wide_without_humans_is_centred_on_midpoint() {
        let h = history(vec![vec![
            region(100.0, 300.0, SubjectClass::Animal),
            region(1500.0, 1820.0, SubjectClass::Transport),
        ]]);
        let window = planner().plan(&h, None);
        // Span [100, 1820], midpoint 960.
        assert_eq!(window, CropWindow::new(420.0, 1080.0));
    }

    #[test]
    fn test_objects_ignored_next_to_animals() {
        let h = history(vec![vec![
            region(1000.0, 1200.0, SubjectClass::Animal),
            region(0.0, 50.0, SubjectClass::Object),
        ]]);
        let window = planner().plan(&h, None);
        assert_eq!(window, CropWindow::new(560.0, 1080.0));
    }

    #[test]
    fn test_lone_subject_is_framed_without_pull_to_centre() {
        // Portrait: target width 607.5. A subject hugging the right edge must
        // not drag the centre into the extent.
        let planner = CropPlanner::new(&ReframeConfig::portrait());
        let h = history(vec![vec![region(1800.0, 1900.0, SubjectClass::Face)]]);
        let window = planner.plan(&h, None);
        assert!((window.width - 607.5).abs() < 1e-9);
        assert!((window.x - 1312.5).abs() < 1e-9, "x = {}", window.x);

        let h = history(vec![vec![region(1500.0, 1600.0, SubjectClass::Face)]]);
        let window = planner.plan(&h, None);
        // Span [1500, 1600], centre 1550.
        assert!((window.x - 1246.25).abs() < 1e-9, "x = {}", window.x);
    }

    #[test]
    fn test_recent_detections_of_other_classes_keep_full_span() {
        let mut frames = vec![vec![
            region(100.0, 300.0, SubjectClass::Person),
            region(1500.0, 1700.0, SubjectClass::Person),
        ]];
        for _ in 0..10 {
            frames.push(vec![region(1000.0, 1200.0, SubjectClass::Object)]);
        }
        let window = planner().plan(&history(frames), None);
        assert!((window.width - 1760.0).abs() < 1e-9);
    }

    #[test]
    fn test_plan_is_idempotent() {
        let p = planner();
        let h = history(vec![
            vec![region(700.0, 900.0, SubjectClass::Face)],
            vec![region(720.0, 910.0, SubjectClass::Face)],
        ]);
        let first = p.plan(&h, None);
        let second = p.plan(&h, Some(first));
        let third = p.plan(&h, Some(second));
        assert_eq!(first, second);
        assert_eq!(second, third);
    }
}
