pub mod protocol;
pub mod gemini;

pub use protocol::{HostPageAdapter, ReplyMarkup};
pub use gemini::GeminiPage;
