//! Error types for the session layer.

/// Errors that can occur while projecting wire data into display state.
///
/// A projection error aborts the whole event it came from: the reducer
/// never applies half a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    /// A composite card string without the `"<rank> of <suit>"` shape.
    #[error("card `{0}` is not in `<rank> of <suit>` form")]
    UnparsableCard(String),

    /// A structured card with an empty rank or suit.
    #[error("card has an empty rank or suit")]
    EmptyCardField,
}
