//! Module containing the `mlset` universal error type
use crate::descriptor::Descriptor;
use thiserror::Error;

/// Universal error type for `mlset`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Operands are defined over different numbers of level-set fields
    #[error("arity mismatch: {0} fields vs {1} fields")]
    ArityMismatch(usize, usize),

    /// Operands (or the result of an operation) mix codimensions
    #[error("codimension mismatch: {0} vs {1}")]
    CodimensionMismatch(usize, usize),

    /// A normal was requested for a piece without exactly one `IF` tag
    #[error("boundary piece {0} does not have exactly one interface tag")]
    AmbiguousBoundaryPiece(Descriptor),

    /// The level-set family changed after the compression context was bound
    #[error(
        "compression context is stale (snapshot generation {0}, family is at \
         generation {1})"
    )]
    StaleCompressionContext(u64, u64),

    /// The cut-quadrature provider could not answer a realizability query
    #[error("cut-quadrature provider unavailable: {0}")]
    OracleUnavailable(String),

    /// Field index exceeds the number of fields in the family
    #[error("field index ({0}) exceeds field count ({1})")]
    BadFieldIndex(usize, usize),

    /// Nodal value slice does not match the vertex count
    #[error("field has {0} nodal values but the mesh has {1} vertices")]
    BadFieldLength(usize, usize),

    /// Element index exceeds the mesh's element count
    #[error("element index ({0}) exceeds element count ({1})")]
    BadElement(usize, usize),

    /// Marker set is not sized to the mesh's element count
    #[error("marker set has {0} entries but the mesh has {1} elements")]
    BadMarkerLength(usize, usize),

    /// Vertex index exceeds the mesh's vertex count
    #[error("vertex index ({0}) exceeds vertex count ({1})")]
    BadVertex(usize, usize),

    /// A level-set family must contain at least one field
    #[error("level-set family is empty")]
    EmptyFamily,

    /// Could not build a worker thread pool
    #[error("could not build thread pool: {0}")]
    ThreadPool(String),
}
