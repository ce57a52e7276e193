pub mod browser;

pub use browser::BrowserSession;
