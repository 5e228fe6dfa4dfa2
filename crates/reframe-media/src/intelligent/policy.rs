//! Region-prioritization policy.
//!
//! Given the per-class maximum counts over a window of analyses, decide
//! which subject classes the crop should be built around. Rules are tried in
//! order and the first match wins:
//!
//! | Condition | Included classes |
//! |-----------|------------------|
//! | exactly one face of either kind | Face, PartialFace |
//! | a full face and more people than faces | Face |
//! | any human | Face, PartialFace, Person |
//! | any animal or vehicle | everything except Object |
//! | otherwise | everything |

use reframe_models::{ClassCounts, ClassSet, SubjectClass};

/// Pick the classes to frame.
pub fn included_classes(counts: &ClassCounts) -> ClassSet {
    use SubjectClass::*;

    let faces = counts.get(Face);
    let partial_faces = counts.get(PartialFace);
    let people = counts.get(Person);

    if faces + partial_faces == 1 {
        ClassSet::of(&[Face, PartialFace])
    } else if faces >= 1 && people > faces {
        // A presenter in front of a crowd: follow the clear face only.
        ClassSet::of(&[Face])
    } else if counts.contains_humans() {
        ClassSet::of(&[Face, PartialFace, Person])
    } else if counts.any_of(&[Animal, Transport]) {
        ClassSet::all().without(Object)
    } else {
        ClassSet::all()
    }
}
