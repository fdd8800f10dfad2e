/// Capability every registered metric exposes to the registry.
///
/// Variant operations (`increment`, `add`, ...) live on the concrete types;
/// the registry only ever needs to name, render and reset a metric.
/// Implementations must tolerate all of these being called concurrently with
/// their own update methods.
pub trait Metric: Send + Sync + 'static {
    /// Builds a fresh metric in its initial state.
    fn with_name(name: String) -> Self
    where
        Self: Sized;

    fn name(&self) -> &str;

    /// Current value as it appears in a flushed record.
    fn render(&self) -> String;

    /// Returns the metric to its initial state atomically.
    fn reset(&self);
}
