pub mod coordinator;
pub mod impersonation;
pub mod store;
pub mod validation;
pub mod view;
pub mod workspace;
