pub mod auth_worker;
pub mod llm_worker;
pub mod session_worker;
pub use auth_worker::AuthWorker;
pub use llm_worker::LLMWorker;
pub use session_worker::SessionWorker;
