//! Region descriptors: one [`Tag`] per level-set field
//!
//! A [`Descriptor`] is the atomic unit of the region algebra.  It describes the
//! intersection, over every field in a family, of that field's constraint:
//! ```
//! use mlset::{Descriptor, Tag};
//!
//! // Inside field 0, outside field 1, anything for field 2
//! let d = Descriptor::from([Tag::Neg, Tag::Pos, Tag::Any]);
//! assert_eq!(d.arity(), 3);
//! assert_eq!(d.codim(), 0);
//! assert_eq!(d.to_string(), "(NEG, POS, ANY)");
//! ```
use crate::{Error, set::RegionSet, tag::Tag};
use serde::{Deserialize, Serialize};

/// Ordered sequence of tags, one per level-set field
///
/// Descriptors implement structural equality, ordering, and hashing, so they
/// can be used directly as map keys.
#[derive(
    Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Descriptor(Vec<Tag>);

impl<const N: usize> From<[Tag; N]> for Descriptor {
    fn from(tags: [Tag; N]) -> Self {
        Self(tags.to_vec())
    }
}

impl From<Vec<Tag>> for Descriptor {
    fn from(tags: Vec<Tag>) -> Self {
        Self(tags)
    }
}

impl FromIterator<Tag> for Descriptor {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::ops::Index<usize> for Descriptor {
    type Output = Tag;
    fn index(&self, i: usize) -> &Tag {
        &self.0[i]
    }
}

impl std::fmt::Display for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, t) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{t}")?;
        }
        write!(f, ")")
    }
}

impl Descriptor {
    /// Builds a descriptor with the same tag on every one of `k` fields
    pub fn uniform(k: usize, tag: Tag) -> Self {
        Self(vec![tag; k])
    }

    /// Builds the universe descriptor `ANY^k`
    pub fn any(k: usize) -> Self {
        Self::uniform(k, Tag::Any)
    }

    /// Returns the number of level-set fields
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// Returns the number of `IF` tags
    pub fn codim(&self) -> usize {
        self.0.iter().filter(|t| **t == Tag::If).count()
    }

    /// Returns the underlying tags
    pub fn tags(&self) -> &[Tag] {
        &self.0
    }

    /// Iterates over tags in field order
    pub fn iter(&self) -> impl Iterator<Item = Tag> + '_ {
        self.0.iter().copied()
    }

    /// Checks whether any coordinate is the `ANY` wildcard
    pub fn has_wildcard(&self) -> bool {
        self.0.contains(&Tag::Any)
    }

    /// Returns the indices of `IF` coordinates
    pub fn interfaces(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == Tag::If)
            .map(|(i, _)| i)
    }

    /// Returns a copy of this descriptor with coordinate `i` replaced
    ///
    /// # Panics
    /// If `i` is out of range
    pub fn with(&self, i: usize, tag: Tag) -> Self {
        let mut out = self.clone();
        out.0[i] = tag;
        out
    }

    /// Complement of this descriptor, following De Morgan's law
    ///
    /// Every signed coordinate contributes one descriptor in which it is
    /// flipped and every other signed (or wildcard) coordinate is `ANY`.
    /// `IF` coordinates are kept in every term, so codimension is preserved.
    pub fn complement(&self) -> RegionSet {
        let mut out = RegionSet::empty(self.arity());
        for (i, t) in self.0.iter().enumerate() {
            if !t.is_signed() {
                continue;
            }
            let d = self
                .0
                .iter()
                .enumerate()
                .map(|(j, u)| match (j == i, u) {
                    (true, u) => u.flip(),
                    (false, Tag::If) => Tag::If,
                    (false, _) => Tag::Any,
                })
                .collect();
            out.insert_unchecked(d);
        }
        out
    }

    /// Coordinate-wise meet of two descriptors
    ///
    /// Returns `Ok(None)` if the descriptors describe disjoint regions.
    pub fn meet(&self, other: &Self) -> Result<Option<Self>, Error> {
        self.check_arity(other)?;
        Ok(self
            .0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| a.meet(*b))
            .collect::<Option<Vec<Tag>>>()
            .map(Self))
    }

    /// Concatenates two descriptors over disjoint field families
    pub fn concat(&self, other: &Self) -> Self {
        Self(self.0.iter().chain(&other.0).copied().collect())
    }

    /// Returns every boundary candidate of this descriptor
    ///
    /// For each coordinate that is not already `IF`, emits a copy with that
    /// coordinate set to `IF`.
    pub fn boundary_pieces(&self) -> impl Iterator<Item = Self> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, t)| **t != Tag::If)
            .map(|(i, _)| self.with(i, Tag::If))
    }

    /// Expands every `ANY` tag into both `NEG` and `POS`
    ///
    /// The resulting descriptors are wildcard-free and have the same
    /// codimension as `self`.
    pub fn expand_wildcards(&self) -> Vec<Self> {
        let mut out = vec![Self(Vec::with_capacity(self.arity()))];
        for t in &self.0 {
            out = match t {
                Tag::Any => out
                    .into_iter()
                    .flat_map(|d| {
                        [Tag::Neg, Tag::Pos].map(|s| {
                            let mut d = d.clone();
                            d.0.push(s);
                            d
                        })
                    })
                    .collect(),
                t => {
                    for d in &mut out {
                        d.0.push(*t);
                    }
                    out
                }
            };
        }
        out
    }

    /// Checks whether a point with the given field values lies in the region
    ///
    /// Values within `eps` of zero are classified as `IF`.
    pub fn contains(&self, values: &[f64], eps: f64) -> Result<bool, Error> {
        if values.len() != self.arity() {
            return Err(Error::ArityMismatch(self.arity(), values.len()));
        }
        Ok(self
            .0
            .iter()
            .zip(values)
            .all(|(t, v)| *t == Tag::Any || *t == Tag::of_value(*v, eps)))
    }

    /// Conservative may-contribute test against an element classification
    ///
    /// `class` must have one entry per field, none of which is `ANY`.
    pub fn admits(&self, class: &[Tag]) -> bool {
        debug_assert_eq!(class.len(), self.arity());
        self.0.iter().zip(class).all(|(t, c)| t.admits(*c))
    }

    pub(crate) fn check_arity(&self, other: &Self) -> Result<(), Error> {
        if self.arity() != other.arity() {
            Err(Error::ArityMismatch(self.arity(), other.arity()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use Tag::*;

    #[test]
    fn codim() {
        assert_eq!(Descriptor::from([Neg, If, Any]).codim(), 1);
        assert_eq!(Descriptor::from([If, If]).codim(), 2);
        assert_eq!(Descriptor::any(4).codim(), 0);
    }

    #[test]
    fn complement_descriptor() {
        let d = Descriptor::from([Neg, Pos, Any]);
        let c = d.complement();
        let expected = RegionSet::from_descriptors(
            3,
            [
                Descriptor::from([Pos, Any, Any]),
                Descriptor::from([Any, Neg, Any]),
            ],
        )
        .unwrap();
        assert_eq!(c, expected);
    }

    #[test]
    fn complement_keeps_interface() {
        let d = Descriptor::from([If, Neg]);
        let c = d.complement();
        assert_eq!(c.len(), 1);
        assert!(c.contains_descriptor(&Descriptor::from([If, Pos])));
        assert_eq!(c.codim(), Some(1));
    }

    #[test]
    fn meet() {
        let a = Descriptor::from([Neg, Any, If]);
        let b = Descriptor::from([Any, Pos, If]);
        assert_eq!(a.meet(&b).unwrap(), Some(Descriptor::from([Neg, Pos, If])));

        let c = Descriptor::from([Pos, Any, Any]);
        assert_eq!(a.meet(&c).unwrap(), None);

        let d = Descriptor::from([Neg, Any, Neg]);
        assert_eq!(a.meet(&d).unwrap(), None);

        let e = Descriptor::from([Neg]);
        assert_eq!(a.meet(&e), Err(Error::ArityMismatch(3, 1)));
    }

    #[test]
    fn boundary_pieces() {
        let d = Descriptor::from([Neg, If, Any]);
        let b: Vec<_> = d.boundary_pieces().collect();
        assert_eq!(
            b,
            vec![Descriptor::from([If, If, Any]), Descriptor::from([Neg, If, If])]
        );
    }

    #[test]
    fn expand_wildcards() {
        let d = Descriptor::from([Any, If, Any]);
        let e = d.expand_wildcards();
        assert_eq!(e.len(), 4);
        assert!(e.iter().all(|d| !d.has_wildcard() && d.codim() == 1));
        assert!(e.contains(&Descriptor::from([Neg, If, Pos])));

        let plain = Descriptor::from([Neg, Pos]);
        assert_eq!(plain.expand_wildcards(), vec![plain]);
    }

    #[test]
    fn point_membership() {
        let d = Descriptor::from([Neg, Any, If]);
        assert!(d.contains(&[-1.0, 3.0, 0.0], 1e-12).unwrap());
        assert!(!d.contains(&[1.0, 3.0, 0.0], 1e-12).unwrap());
        assert!(!d.contains(&[-1.0, 3.0, 0.5], 1e-12).unwrap());
        assert!(d.contains(&[-1.0], 1e-12).is_err());
    }

    #[test]
    fn admits_cut_elements() {
        let d = Descriptor::from([Neg, Pos, Any]);
        assert!(d.admits(&[Neg, Pos, Neg]));
        assert!(d.admits(&[If, If, Pos]));
        assert!(!d.admits(&[Pos, If, Neg]));
    }
}
