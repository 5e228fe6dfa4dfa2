//! Detection regions produced by the detection worker.

use serde::{Deserialize, Serialize};

use crate::subject::{ClassCounts, SubjectClass};

/// An axis-aligned region reported by one of the detectors.
///
/// Coordinates are in source-frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRegion {
    /// Top-left corner `(x, y)`.
    pub top_left: (f64, f64),
    /// Bottom-right corner `(x, y)`.
    pub bottom_right: (f64, f64),
    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,
    /// Subject class.
    pub class: SubjectClass,
}

impl DetectionRegion {
    /// Create a region from its corners.
    pub fn new(
        top_left: (f64, f64),
        bottom_right: (f64, f64),
        confidence: f64,
        class: SubjectClass,
    ) -> Self {
        Self {
            top_left,
            bottom_right,
            confidence: confidence.clamp(0.0, 1.0),
            class,
        }
    }

    /// Create a region from an `[x, y, width, height]` box.
    pub fn from_xywh(bbox: [f64; 4], confidence: f64, class: SubjectClass) -> Self {
        Self::new(
            (bbox[0], bbox[1]),
            (bbox[0] + bbox[2], bbox[1] + bbox[3]),
            confidence,
            class,
        )
    }

    /// Left edge.
    #[inline]
    pub fn x1(&self) -> f64 {
        self.top_left.0
    }

    /// Right edge.
    #[inline]
    pub fn x2(&self) -> f64 {
        self.bottom_right.0
    }

    /// Horizontal extent.
    #[inline]
    pub fn width(&self) -> f64 {
        self.bottom_right.0 - self.top_left.0
    }

    /// Horizontal centre.
    #[inline]
    pub fn cx(&self) -> f64 {
        (self.top_left.0 + self.bottom_right.0) / 2.0
    }
}

/// Merged output of all detectors for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionOutput {
    /// Number of regions per class.
    pub class_counts: ClassCounts,
    /// All regions, faces first.
    pub regions: Vec<DetectionRegion>,
}

impl DetectionOutput {
    /// An empty result (nothing detected).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a region and bump its class count.
    pub fn push(&mut self, region: DetectionRegion) {
        self.class_counts.increment(region.class);
        self.regions.push(region);
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }
}

impl FromIterator<DetectionRegion> for DetectionOutput {
    fn from_iter<T: IntoIterator<Item = DetectionRegion>>(iter: T) -> Self {
        let mut output = DetectionOutput::empty();
        for region in iter {
            output.push(region);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_xywh() {
        let region = DetectionRegion::from_xywh([100.0, 50.0, 200.0, 300.0], 0.8, SubjectClass::Person);
        assert_eq!(region.x1(), 100.0);
        assert_eq!(region.x2(), 300.0);
        assert_eq!(region.width(), 200.0);
        assert_eq!(region.cx(), 200.0);
        assert_eq!(region.bottom_right.1, 350.0);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let region = DetectionRegion::new((0.0, 0.0), (1.0, 1.0), 1.7, SubjectClass::Object);
        assert_eq!(region.confidence, 1.0);
    }

    #[test]
    fn test_push_counts_classes() {
        let output: DetectionOutput = vec![
            DetectionRegion::new((0.0, 0.0), (10.0, 10.0), 0.9, SubjectClass::Face),
            DetectionRegion::new((20.0, 0.0), (30.0, 10.0), 0.9, SubjectClass::Face),
            DetectionRegion::new((0.0, 0.0), (50.0, 90.0), 0.7, SubjectClass::Person),
        ]
        .into_iter()
        .collect();

        assert_eq!(output.len(), 3);
        assert_eq!(output.class_counts.get(SubjectClass::Face), 2);
        assert_eq!(output.class_counts.get(SubjectClass::Person), 1);
        assert_eq!(output.class_counts.get(SubjectClass::Object), 0);
    }

    #[test]
    fn test_wire_format() {
        let region = DetectionRegion::new((1.0, 2.0), (3.0, 4.0), 0.5, SubjectClass::Animal);
        let json = serde_json::to_value(region).unwrap();
        assert_eq!(json["topLeft"][0], 1.0);
        assert_eq!(json["bottomRight"][1], 4.0);
        assert_eq!(json["class"], "ANIMAL");
    }
}
