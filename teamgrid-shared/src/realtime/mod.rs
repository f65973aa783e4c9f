/// Process-local realtime notification fan-out
///
/// # Modules
///
/// - `events`: Lifecycle event payloads pushed to connected clients
/// - `registry`: The per-user connection registry

pub mod events;
pub mod registry;

pub use events::LifecycleEvent;
pub use registry::{ConnectionRegistry, SubscriptionGuard};
