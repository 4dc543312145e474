pub mod error;
pub mod message;
pub mod session;

pub use error::ChatError;
pub use message::{ChatMessage, GREETING, Role};
pub use session::{ChatSession, SESSION_ID_LEN, new_session_id};
