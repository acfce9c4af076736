pub mod agent;
pub mod gemini;
pub mod openai;
pub mod prompt;
pub mod session;

pub use agent::{AgentBridge, TableAgent};
pub use gemini::GeminiAgent;
pub use openai::OpenAiAgent;
pub use prompt::TableContext;
pub use session::{is_exit_command, log_session_end, QueryLoop, QueryOutcome};
