pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{AuthError, Capability, ResolvedIdentity, SignUpOutcome};
pub use router::auth_routes;
pub use services::identity::IdentityResolver;
pub use services::profile::{ProfileDirectory, StaticProfileDirectory, SupabaseProfileDirectory};
pub use services::session::{
    IdentityProvider, SessionManager, SignOutHook, SupabaseIdentityProvider,
};
