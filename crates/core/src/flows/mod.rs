pub mod session;
pub mod states;

pub use session::{FormState, QuoteSession};
pub use states::{SessionEvent, SessionState};
