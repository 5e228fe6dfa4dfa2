//! Subject detection.
//!
//! | Piece | Role |
//! |-------|------|
//! | [`SubjectDetector`] | Interface the worker drives |
//! | [`CompositeDetector`] | Face model + object model, merged |
//! | [`NullDetector`] | Finds nothing; keeps the crop centred |
//! | [`DetectionHandle`] | Request/response channel to the worker thread |

pub mod object_classes;
pub mod providers;
pub mod worker;

pub use object_classes::{class_for_index, class_for_label, COCO_CLASSES};
pub use providers::{
    CompositeDetector, CompositeDetectorConfig, FaceEstimate, FaceModel, NullDetector,
    ObjectModel, ObjectPrediction, SubjectDetector,
};
pub use worker::DetectionHandle;
