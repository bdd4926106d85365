//! Region sets and the symbolic region algebra
//!
//! A [`RegionSet`] is a deduplicated union of [`Descriptor`]s over the same
//! level-set family.  Sets are combined with the usual boolean operations:
//! ```
//! use mlset::{Descriptor, RegionSet, Tag::*};
//!
//! let a = RegionSet::new(Descriptor::from([Neg, Any]));
//! let b = RegionSet::new(Descriptor::from([Any, Neg]));
//!
//! let both = a.intersect(&b)?;
//! assert_eq!(both, RegionSet::new(Descriptor::from([Neg, Neg])));
//!
//! let either = a.union(&b)?;
//! assert_eq!(either.len(), 2);
//!
//! // Boundaries increase codimension by one
//! let edges = both.boundary()?;
//! assert_eq!(edges.codim(), Some(1));
//! assert_eq!(edges.len(), 2);
//! # Ok::<(), mlset::Error>(())
//! ```
//!
//! Sets may carry a [`CompressionContext`], in which case every set derived
//! from them is pruned against the context's snapshot before being returned;
//! see [`RegionSet::compress`].
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    Error, descriptor::Descriptor, oracle::CompressionContext, tag::Tag,
};

/// Deduplicated union of [`Descriptor`]s sharing one arity and codimension
///
/// Deserialized sets are checked the same way as
/// [`RegionSet::from_descriptors`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawRegionSet")]
pub struct RegionSet {
    arity: usize,
    descriptors: BTreeSet<Descriptor>,

    /// Optional persistent compression context
    #[serde(skip)]
    context: Option<Arc<CompressionContext>>,
}

/// Unchecked serialized form of a [`RegionSet`]
#[derive(Deserialize)]
struct RawRegionSet {
    arity: usize,
    descriptors: Vec<Descriptor>,
}

impl TryFrom<RawRegionSet> for RegionSet {
    type Error = Error;
    fn try_from(raw: RawRegionSet) -> Result<Self, Error> {
        Self::from_descriptors(raw.arity, raw.descriptors)
    }
}

impl PartialEq for RegionSet {
    fn eq(&self, other: &Self) -> bool {
        self.arity == other.arity && self.descriptors == other.descriptors
    }
}

impl Eq for RegionSet {}

impl std::fmt::Display for RegionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, d) in self.descriptors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "}}")
    }
}

impl From<Descriptor> for RegionSet {
    fn from(d: Descriptor) -> Self {
        Self::new(d)
    }
}

impl<'a> IntoIterator for &'a RegionSet {
    type Item = &'a Descriptor;
    type IntoIter = std::collections::btree_set::Iter<'a, Descriptor>;
    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}

/// Returns the shared codimension of a collection of descriptors
///
/// Returns `Ok(None)` for an empty collection.
fn uniform_codim<'a, I>(iter: I) -> Result<Option<usize>, Error>
where
    I: IntoIterator<Item = &'a Descriptor>,
{
    let mut out = None;
    for d in iter {
        let c = d.codim();
        match out {
            None => out = Some(c),
            Some(prev) if prev != c => {
                return Err(Error::CodimensionMismatch(prev, c));
            }
            Some(_) => (),
        }
    }
    Ok(out)
}

impl RegionSet {
    /// Builds a set containing a single descriptor
    pub fn new(d: Descriptor) -> Self {
        let arity = d.arity();
        Self {
            arity,
            descriptors: [d].into(),
            context: None,
        }
    }

    /// Builds an empty set over `k` fields
    pub fn empty(k: usize) -> Self {
        Self {
            arity: k,
            descriptors: BTreeSet::new(),
            context: None,
        }
    }

    /// Builds the universe `{ANY^k}`
    pub fn universe(k: usize) -> Self {
        Self::new(Descriptor::any(k))
    }

    /// Builds a set from a list of descriptors over `k` fields
    ///
    /// Every descriptor must have arity `k`, and all descriptors must share a
    /// codimension.
    pub fn from_descriptors<I>(k: usize, iter: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = Descriptor>,
    {
        let mut out = Self::empty(k);
        for d in iter {
            if d.arity() != k {
                return Err(Error::ArityMismatch(k, d.arity()));
            }
            out.descriptors.insert(d);
        }
        uniform_codim(&out.descriptors)?;
        Ok(out)
    }

    /// Inserts a descriptor without checking arity or codimension
    pub(crate) fn insert_unchecked(&mut self, d: Descriptor) {
        debug_assert_eq!(d.arity(), self.arity);
        self.descriptors.insert(d);
    }

    /// Returns the number of level-set fields
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Returns the number of descriptors
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Checks whether the set contains no descriptors
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Iterates over descriptors in a deterministic order
    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter()
    }

    /// Returns the shared codimension, or `None` if the set is empty
    pub fn codim(&self) -> Option<usize> {
        self.descriptors.iter().next().map(|d| d.codim())
    }

    /// Checks whether the given descriptor is a member of this set
    pub fn contains_descriptor(&self, d: &Descriptor) -> bool {
        self.descriptors.contains(d)
    }

    /// Checks whether every descriptor of `self` is also in `other`
    pub fn is_subset(&self, other: &Self) -> bool {
        self.arity == other.arity
            && self.descriptors.is_subset(&other.descriptors)
    }

    /// Checks whether a point with the given field values lies in the region
    ///
    /// Values within `eps` of zero are classified as `IF`.
    pub fn contains(&self, values: &[f64], eps: f64) -> Result<bool, Error> {
        if values.len() != self.arity {
            return Err(Error::ArityMismatch(self.arity, values.len()));
        }
        for d in &self.descriptors {
            if d.contains(values, eps)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns the compression context, if one is bound
    pub fn context(&self) -> Option<&Arc<CompressionContext>> {
        self.context.as_ref()
    }

    /// Binds a persistent compression context and compresses against it
    ///
    /// This is how a caller re-establishes a context after the level-set
    /// family has been updated.  Returns the number of discarded descriptors.
    pub fn rebind(
        &mut self,
        context: Arc<CompressionContext>,
    ) -> Result<usize, Error> {
        let n = context.compress(self)?;
        self.context = Some(context);
        Ok(n)
    }

    /// Drops the compression context, returning it
    pub fn detach(&mut self) -> Option<Arc<CompressionContext>> {
        self.context.take()
    }

    pub(crate) fn set_context(&mut self, context: Arc<CompressionContext>) {
        self.context = Some(context);
    }

    pub(crate) fn retain<F: FnMut(&Descriptor) -> bool>(&mut self, f: F) {
        self.descriptors.retain(f)
    }

    fn check_arity(&self, other: &Self) -> Result<(), Error> {
        if self.arity != other.arity {
            Err(Error::ArityMismatch(self.arity, other.arity))
        } else {
            Ok(())
        }
    }

    /// Picks a context for a set derived from `self` and `other`
    ///
    /// The left-hand operand's context wins.
    fn merged_context(&self, other: &Self) -> Option<Arc<CompressionContext>> {
        self.context.clone().or_else(|| other.context.clone())
    }

    /// Attaches a context to a freshly derived set, compressing it
    fn derived(
        mut self,
        context: Option<Arc<CompressionContext>>,
    ) -> Result<Self, Error> {
        if let Some(ctx) = context {
            ctx.compress(&mut self)?;
            self.context = Some(ctx);
        }
        Ok(self)
    }

    /// Complement within the set's codimension
    ///
    /// Descriptors are grouped by the positions of their `IF` tags; within
    /// each group the complement is the intersection of the descriptors'
    /// complements (De Morgan).  The complement of the empty set is the
    /// universe.
    pub fn complement(&self) -> Result<Self, Error> {
        if self.is_empty() {
            return Self::universe(self.arity).derived(self.context.clone());
        }
        let mut groups: BTreeMap<Vec<usize>, Vec<&Descriptor>> =
            BTreeMap::new();
        for d in &self.descriptors {
            groups.entry(d.interfaces().collect()).or_default().push(d);
        }

        let mut out = Self::empty(self.arity);
        for ds in groups.values() {
            let mut acc = ds[0].complement();
            for d in &ds[1..] {
                if acc.is_empty() {
                    break;
                }
                acc = acc.intersect_raw(&d.complement())?;
            }
            out.descriptors.extend(acc.descriptors);
        }
        out.derived(self.context.clone())
    }

    /// Union of two sets of the same arity and codimension
    pub fn union(&self, other: &Self) -> Result<Self, Error> {
        self.check_arity(other)?;
        if let (Some(a), Some(b)) = (self.codim(), other.codim()) {
            if a != b {
                return Err(Error::CodimensionMismatch(a, b));
            }
        }
        let out = Self {
            arity: self.arity,
            descriptors: self
                .descriptors
                .union(&other.descriptors)
                .cloned()
                .collect(),
            context: None,
        };
        out.derived(self.merged_context(other))
    }

    /// Pairwise intersection, without context handling
    fn intersect_raw(&self, other: &Self) -> Result<Self, Error> {
        self.check_arity(other)?;
        let mut out = Self::empty(self.arity);
        for a in &self.descriptors {
            for b in &other.descriptors {
                if let Some(m) = a.meet(b)? {
                    out.descriptors.insert(m);
                }
            }
        }
        uniform_codim(&out.descriptors)?;
        Ok(out)
    }

    /// Intersection of two sets of the same arity
    ///
    /// Every pair of descriptors is met coordinate-wise; pairs with
    /// conflicting tags are discarded.  Returns
    /// [`Error::CodimensionMismatch`] if the surviving descriptors do not
    /// share a codimension.
    pub fn intersect(&self, other: &Self) -> Result<Self, Error> {
        self.intersect_raw(other)?
            .derived(self.merged_context(other))
    }

    /// Replaces `self` with `self | other` (the algebra's `|=`)
    pub fn union_assign(&mut self, other: &Self) -> Result<(), Error> {
        *self = self.union(other)?;
        Ok(())
    }

    /// Replaces `self` with `self & other` (the algebra's `&=`)
    pub fn intersect_assign(&mut self, other: &Self) -> Result<(), Error> {
        *self = self.intersect(other)?;
        Ok(())
    }

    /// Boundary of this set, with codimension increased by one
    pub fn boundary(&self) -> Result<Self, Error> {
        uniform_codim(&self.descriptors)?;
        let mut out = Self::empty(self.arity);
        for d in &self.descriptors {
            out.descriptors.extend(d.boundary_pieces());
        }
        out.derived(self.context.clone())
    }

    /// Region where either family's constraint holds
    ///
    /// `self` is over `m` fields and `other` over a disjoint family of `n`
    /// fields; the result is over `m + n` fields.  Compression contexts are
    /// not carried over, since neither describes the combined family.
    pub fn tensor_union(&self, other: &Self) -> Result<Self, Error> {
        if let (Some(a), Some(b)) = (self.codim(), other.codim()) {
            if a != b {
                return Err(Error::CodimensionMismatch(a, b));
            }
        }
        let left_pad = Descriptor::any(other.arity);
        let right_pad = Descriptor::any(self.arity);
        let mut out = Self::empty(self.arity + other.arity);
        out.descriptors
            .extend(self.descriptors.iter().map(|a| a.concat(&left_pad)));
        out.descriptors
            .extend(other.descriptors.iter().map(|b| right_pad.concat(b)));
        Ok(out)
    }

    /// Region where both families' constraints hold
    ///
    /// Returns the Cartesian concatenation `{a ++ b}` over `m + n` fields.
    pub fn tensor_intersect(&self, other: &Self) -> Result<Self, Error> {
        let mut out = Self::empty(self.arity + other.arity);
        for a in &self.descriptors {
            for b in &other.descriptors {
                out.descriptors.insert(a.concat(b));
            }
        }
        uniform_codim(&out.descriptors)?;
        Ok(out)
    }

    /// Expands every `ANY` tag into `NEG` and `POS`
    ///
    /// This is the conversion into a plain set of concrete descriptors, as
    /// consumed by quadrature; the region described is unchanged.
    pub fn expand_wildcards(&self) -> Self {
        let mut out = Self::empty(self.arity);
        for d in &self.descriptors {
            out.descriptors.extend(d.expand_wildcards());
        }
        out.context = self.context.clone();
        out
    }

    /// Returns the tag at field `i` shared by every descriptor, if any
    pub fn common_tag(&self, i: usize) -> Option<Tag> {
        let mut iter = self.descriptors.iter().map(|d| d[i]);
        let first = iter.next()?;
        iter.all(|t| t == first).then_some(first)
    }
}

impl std::ops::BitAnd for &RegionSet {
    type Output = Result<RegionSet, Error>;
    fn bitand(self, rhs: &RegionSet) -> Self::Output {
        self.intersect(rhs)
    }
}

impl std::ops::BitOr for &RegionSet {
    type Output = Result<RegionSet, Error>;
    fn bitor(self, rhs: &RegionSet) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::Not for &RegionSet {
    type Output = Result<RegionSet, Error>;
    fn not(self) -> Self::Output {
        self.complement()
    }
}
