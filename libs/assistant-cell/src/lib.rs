pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use handlers::AssistantState;
pub use models::{AssistantError, GeneratedText};
pub use router::assistant_routes;
pub use services::assistant::AssistantService;
pub use services::gemini::{GeminiClient, TextGenerator};
