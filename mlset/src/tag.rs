//! Per-field sign classification
use serde::{Deserialize, Serialize};

/// Classification of a point (or element) relative to a single level-set field
///
/// [`Tag::Neg`], [`Tag::Pos`], and [`Tag::If`] are mutually exclusive and
/// jointly exhaustive.  [`Tag::Any`] is a wildcard, which only appears inside
/// a [`Descriptor`](crate::Descriptor) and is never produced by
/// classification.
#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Tag {
    /// Strictly negative side of the field
    Neg,
    /// Non-negative side of the field
    Pos,
    /// Interface (zero crossing) of the field
    If,
    /// Wildcard matching any classification
    Any,
}

static_assertions::const_assert_eq!(std::mem::size_of::<Tag>(), 1);

impl Tag {
    /// Flips `NEG <-> POS`, leaving `IF` and `ANY` unchanged
    pub fn flip(self) -> Self {
        match self {
            Tag::Neg => Tag::Pos,
            Tag::Pos => Tag::Neg,
            Tag::If => Tag::If,
            Tag::Any => Tag::Any,
        }
    }

    /// Coordinate-wise meet, used by intersection
    ///
    /// `ANY` is the identity; equal tags meet to themselves; any other pair
    /// has no common region and returns `None`.
    pub fn meet(self, other: Self) -> Option<Self> {
        match (self, other) {
            (Tag::Any, t) | (t, Tag::Any) => Some(t),
            (a, b) if a == b => Some(a),
            _ => None,
        }
    }

    /// Checks whether this tag is a sign constraint (`NEG` or `POS`)
    pub fn is_signed(self) -> bool {
        matches!(self, Tag::Neg | Tag::Pos)
    }

    /// Conservative test used by the discrete classifier
    ///
    /// `self` is the descriptor's tag; `class` is the element classification.
    /// A cut element (`IF`) can never be ruled out.
    pub fn admits(self, class: Tag) -> bool {
        debug_assert_ne!(class, Tag::Any, "ANY is not a classification");
        match (self, class) {
            (Tag::Any, _) | (_, Tag::If) => true,
            (t, c) => t == c,
        }
    }

    /// Classifies a single value with an interface band of half-width `eps`
    pub fn of_value(v: f64, eps: f64) -> Self {
        if v.abs() <= eps {
            Tag::If
        } else if v < 0.0 {
            Tag::Neg
        } else {
            Tag::Pos
        }
    }

    /// Classifies a set of nodal values on one element
    ///
    /// Returns `NEG` if every value is strictly negative, `POS` if every value
    /// is non-negative (zero counts as non-negative), and `IF` otherwise.
    pub fn of_nodal_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut neg = false;
        let mut pos = false;
        for v in values {
            if v < 0.0 {
                neg = true;
            } else {
                pos = true;
            }
            if neg && pos {
                return Tag::If;
            }
        }
        match (neg, pos) {
            (true, false) => Tag::Neg,
            (false, true) => Tag::Pos,
            // Degenerate element with no vertices; it can't be ruled out
            _ => Tag::If,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn flip_is_involution() {
        for t in Tag::iter() {
            assert_eq!(t.flip().flip(), t);
        }
        assert_eq!(Tag::Neg.flip(), Tag::Pos);
        assert_eq!(Tag::If.flip(), Tag::If);
    }

    #[test]
    fn meet_table() {
        for t in Tag::iter() {
            assert_eq!(Tag::Any.meet(t), Some(t));
            assert_eq!(t.meet(Tag::Any), Some(t));
            assert_eq!(t.meet(t), Some(t));
        }
        assert_eq!(Tag::Neg.meet(Tag::Pos), None);
        assert_eq!(Tag::If.meet(Tag::Neg), None);
        assert_eq!(Tag::Pos.meet(Tag::If), None);
    }

    #[test]
    fn nodal_classification() {
        assert_eq!(Tag::of_nodal_values([-1.0, -0.5, -2.0]), Tag::Neg);
        assert_eq!(Tag::of_nodal_values([1.0, 0.5, 2.0]), Tag::Pos);
        assert_eq!(Tag::of_nodal_values([0.0, 0.5, 2.0]), Tag::Pos);
        assert_eq!(Tag::of_nodal_values([0.0, -0.5, 2.0]), Tag::If);
        assert_eq!(Tag::of_nodal_values([0.0, -0.5, -2.0]), Tag::If);
    }

    #[test]
    fn display() {
        assert_eq!(Tag::Neg.to_string(), "NEG");
        assert_eq!(Tag::If.to_string(), "IF");
        assert_eq!("ANY".parse::<Tag>().unwrap(), Tag::Any);
    }
}
