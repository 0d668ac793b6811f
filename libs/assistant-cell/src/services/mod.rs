pub mod assistant;
pub mod gemini;
