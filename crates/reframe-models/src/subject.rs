//! Subject class definitions for detection results.
//!
//! Every detected region carries one of six subject classes. The declaration
//! order reflects how much the detectors are trusted (face detector first,
//! generic objects last); it says nothing about which class wins when
//! composing the crop. That decision belongs to the prioritization policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Detector-assigned category of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubjectClass {
    /// Face with the full landmark set.
    Face,
    /// Face where some landmarks were not found (profile, occluded).
    PartialFace,
    /// Whole-body person detection.
    Person,
    /// Any animal class of the object detector.
    Animal,
    /// Vehicles: cars, bikes, boats, planes, trains.
    Transport,
    /// Everything else the object detector knows about.
    Object,
}

impl SubjectClass {
    /// All classes, in trust order.
    pub const ALL: [SubjectClass; 6] = [
        SubjectClass::Face,
        SubjectClass::PartialFace,
        SubjectClass::Person,
        SubjectClass::Animal,
        SubjectClass::Transport,
        SubjectClass::Object,
    ];

    /// Wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectClass::Face => "FACE",
            SubjectClass::PartialFace => "PARTIAL_FACE",
            SubjectClass::Person => "PERSON",
            SubjectClass::Animal => "ANIMAL",
            SubjectClass::Transport => "TRANSPORT",
            SubjectClass::Object => "OBJECT",
        }
    }

    /// Returns true for the classes that represent people.
    pub fn is_human(&self) -> bool {
        matches!(
            self,
            SubjectClass::Face | SubjectClass::PartialFace | SubjectClass::Person
        )
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SubjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubjectClass {
    type Err = SubjectClassParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "face" => Ok(SubjectClass::Face),
            "partial_face" | "partialface" => Ok(SubjectClass::PartialFace),
            "person" => Ok(SubjectClass::Person),
            "animal" => Ok(SubjectClass::Animal),
            "transport" => Ok(SubjectClass::Transport),
            "object" => Ok(SubjectClass::Object),
            _ => Err(SubjectClassParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown subject class: {0}")]
pub struct SubjectClassParseError(String);

/// Number of detections per subject class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    counts: [u32; 6],
}

impl ClassCounts {
    /// All-zero counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for one class.
    #[inline]
    pub fn get(&self, class: SubjectClass) -> u32 {
        self.counts[class.index()]
    }

    /// Overwrite the count for one class.
    pub fn set(&mut self, class: SubjectClass, count: u32) {
        self.counts[class.index()] = count;
    }

    /// Add one detection of `class`.
    pub fn increment(&mut self, class: SubjectClass) {
        self.counts[class.index()] += 1;
    }

    /// Raise every count to at least the value in `other`.
    ///
    /// Used to aggregate a window of frames: a subject seen in any one frame
    /// counts once, instead of being summed across frames.
    pub fn merge_max(&mut self, other: &ClassCounts) {
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts.iter()) {
            *mine = (*mine).max(*theirs);
        }
    }

    /// Returns true if at least one of the given classes has a detection.
    pub fn any_of(&self, classes: &[SubjectClass]) -> bool {
        classes.iter().any(|c| self.get(*c) > 0)
    }

    /// Returns true if any human class (face, partial face, person) is present.
    pub fn contains_humans(&self) -> bool {
        self.any_of(&[
            SubjectClass::Face,
            SubjectClass::PartialFace,
            SubjectClass::Person,
        ])
    }

    /// Total number of detections across all classes.
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Iterate over `(class, count)` pairs in trust order.
    pub fn iter(&self) -> impl Iterator<Item = (SubjectClass, u32)> + '_ {
        SubjectClass::ALL.iter().map(move |c| (*c, self.get(*c)))
    }
}

impl FromIterator<(SubjectClass, u32)> for ClassCounts {
    fn from_iter<T: IntoIterator<Item = (SubjectClass, u32)>>(iter: T) -> Self {
        let mut counts = ClassCounts::new();
        for (class, count) in iter {
            counts.set(class, count);
        }
        counts
    }
}

/// A small set of subject classes, stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ClassSet(u8);

impl ClassSet {
    /// The empty set.
    pub const fn empty() -> Self {
        ClassSet(0)
    }

    /// Every subject class.
    pub const fn all() -> Self {
        ClassSet(0b11_1111)
    }

    /// Build a set from a slice of classes.
    pub fn of(classes: &[SubjectClass]) -> Self {
        classes.iter().fold(ClassSet::empty(), |set, c| set.with(*c))
    }

    /// Returns a copy with `class` added.
    pub fn with(self, class: SubjectClass) -> Self {
        ClassSet(self.0 | (1 << class.index()))
    }

    /// Returns a copy with `class` removed.
    pub fn without(self, class: SubjectClass) -> Self {
        ClassSet(self.0 & !(1 << class.index()))
    }

    /// Membership test.
    #[inline]
    pub fn contains(&self, class: SubjectClass) -> bool {
        self.0 & (1 << class.index()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate members in trust order.
    pub fn iter(&self) -> impl Iterator<Item = SubjectClass> + '_ {
        SubjectClass::ALL.iter().copied().filter(move |c| self.contains(*c))
    }
}

impl fmt::Display for ClassSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|c| c.as_str()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
