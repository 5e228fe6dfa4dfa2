//! COCO label to subject class mapping.

use reframe_models::SubjectClass;

/// COCO class names (80 classes), in model output order.
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

const TRANSPORT_LABELS: &[&str] = &[
    "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
];

const ANIMAL_LABELS: &[&str] = &[
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe",
];

/// Map an object-detector label to a subject class.
///
/// Unknown labels are generic objects.
pub fn class_for_label(label: &str) -> SubjectClass {
    let label = label.trim();
    if label.eq_ignore_ascii_case("person") {
        SubjectClass::Person
    } else if TRANSPORT_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label)) {
        SubjectClass::Transport
    } else if ANIMAL_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label)) {
        SubjectClass::Animal
    } else {
        SubjectClass::Object
    }
}

/// Map a COCO class index to a subject class.
pub fn class_for_index(index: usize) -> SubjectClass {
    COCO_CLASSES
        .get(index)
        .map(|label| class_for_label(label))
        .unwrap_or(SubjectClass::Object)
}
