//! Record identity contract.

/// A record handed out by a data provider.
///
/// The engine never mutates records; it only reads their identity to build
/// acknowledgements and passes them (by reference) to the registered listener.
/// `Clone` is needed so a filtered batch can be handed to a batch listener
/// while the original batch stays available to the error handler.
pub trait EventIdAware: Clone + Send + Sync + 'static {
    /// Event identifier, used in diagnostics.
    fn event_id(&self) -> &str;

    /// Numeric identity copied into the acknowledgement.
    fn id(&self) -> i64;
}
