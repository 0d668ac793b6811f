pub mod handlers;
pub mod models;
pub mod repository;
pub mod router;
pub mod services;

pub use models::{LoadOutcome, PracticeError, ValidationError};
pub use repository::{
    BackendFactory, InMemoryRepository, PracticeRepository, RepositoryError, RepositoryFactory,
    SupabaseRepository,
};
pub use router::practice_routes;
pub use services::store::{CollectionStore, StoreSnapshot};
pub use services::view::{Projection, View, ViewRouter};
pub use services::workspace::{Workspace, WorkspaceRegistry};
pub use handlers::PracticeState;
