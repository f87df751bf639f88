pub mod protocol;
pub mod server;
pub mod session;

pub use protocol::{NonBinaryKind, StreamEvent, classify, is_malformed_frame};
pub use server::RecorderServer;
pub use session::{ConnectionSession, SessionStatus};
