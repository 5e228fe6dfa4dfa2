//! Detection provider traits.
//!
//! The detection worker talks to a single [`SubjectDetector`]. The shipped
//! [`CompositeDetector`] merges a face model and a general object model; the
//! models themselves are supplied by the embedding application.

use image::RgbImage;
use reframe_models::{DetectionOutput, DetectionRegion, SubjectClass};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::object_classes::class_for_label;
use crate::error::MediaResult;

/// Something that finds subjects in an RGB frame.
pub trait SubjectDetector: Send {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Load models. Called once, before the first `detect`.
    fn initialize(&mut self) -> MediaResult<()>;

    /// Detect subjects in one frame.
    fn detect(&mut self, image: &RgbImage) -> MediaResult<DetectionOutput>;
}

/// A face reported by a face model.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceEstimate {
    pub top_left: (f64, f64),
    pub bottom_right: (f64, f64),
    pub probability: f64,
    /// Landmark slots; `None` where the model could not place a landmark.
    pub landmarks: Vec<Option<(f64, f64)>>,
}

impl FaceEstimate {
    pub fn landmark_count(&self) -> usize {
        self.landmarks.iter().filter(|l| l.is_some()).count()
    }
}

/// Face detection model.
pub trait FaceModel: Send {
    fn load(&mut self) -> MediaResult<()>;
    fn estimate_faces(&mut self, image: &RgbImage) -> MediaResult<Vec<FaceEstimate>>;
}

/// An object reported by an object model.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPrediction {
    /// `[x, y, width, height]` in pixels.
    pub bbox: [f64; 4],
    /// Model label, e.g. `"dog"`.
    pub label: String,
    pub score: f64,
}

/// General object detection model.
pub trait ObjectModel: Send {
    fn load(&mut self) -> MediaResult<()>;
    fn detect(
        &mut self,
        image: &RgbImage,
        max_results: usize,
        min_score: f64,
    ) -> MediaResult<Vec<ObjectPrediction>>;
}

/// Tunables for the composite detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeDetectorConfig {
    /// Maximum objects per frame (default: 10)
    pub max_objects: usize,
    /// Minimum object score (default: 0.4)
    pub min_object_score: f64,
    /// Landmarks a face needs to count as a full face (default: 6)
    pub full_face_landmarks: usize,
}

impl Default for CompositeDetectorConfig {
    fn default() -> Self {
        Self {
            max_objects: 10,
            min_object_score: 0.4,
            full_face_landmarks: 6,
        }
    }
}

/// Face model plus object model, merged into one result.
pub struct CompositeDetector<F, O> {
    face: F,
    object: O,
    config: CompositeDetectorConfig,
}

impl<F: FaceModel, O: ObjectModel> CompositeDetector<F, O> {
    pub fn new(face: F, object: O) -> Self {
        Self::with_config(face, object, CompositeDetectorConfig::default())
    }

    pub fn with_config(face: F, object: O, config: CompositeDetectorConfig) -> Self {
        Self {
            face,
            object,
            config,
        }
    }

    fn face_region(&self, face: &FaceEstimate) -> DetectionRegion {
        let class = if face.landmark_count() == self.config.full_face_landmarks {
            SubjectClass::Face
        } else {
            SubjectClass::PartialFace
        };
        DetectionRegion::new(face.top_left, face.bottom_right, face.probability, class)
    }
}

impl<F: FaceModel, O: ObjectModel> SubjectDetector for CompositeDetector<F, O> {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn initialize(&mut self) -> MediaResult<()> {
        self.face.load()?;
        self.object.load()
    }

    fn detect(&mut self, image: &RgbImage) -> MediaResult<DetectionOutput> {
        let faces = self.face.estimate_faces(image)?;
        let objects = self.object.detect(
            image,
            self.config.max_objects,
            self.config.min_object_score,
        )?;

        let mut output = DetectionOutput::empty();
        for face in &faces {
            output.push(self.face_region(face));
        }
        for object in objects {
            output.push(DetectionRegion::from_xywh(
                object.bbox,
                object.score,
                class_for_label(&object.label),
            ));
        }

        debug!(
            faces = faces.len(),
            regions = output.len(),
            "Composite detection"
        );
        Ok(output)
    }
}

/// Detector that never finds anything. The solver then keeps a centred crop.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDetector;

impl SubjectDetector for NullDetector {
    fn name(&self) -> &'static str {
        "null"
    }

    fn initialize(&mut self) -> MediaResult<()> {
        Ok(())
    }

    fn detect(&mut self, _image: &RgbImage) -> MediaResult<DetectionOutput> {
        Ok(DetectionOutput::empty())
    }
}
