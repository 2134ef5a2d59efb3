/// Router Module Index
///
/// Endpoints this service answers itself, grouped by the capability the
/// gate requires for them. Anything not routed here falls through to the
/// renderer proxy.

/// Outside the gate: monitoring only.
pub mod public;

/// Behind the gate, any signed-in member.
pub mod authenticated;

/// Behind the gate, ADMIN only (`/api/admin` is classified as such).
pub mod admin;
