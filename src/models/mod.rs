pub mod analytics;
pub mod chat;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod health;
pub mod messages;

pub use analytics::*;
pub use chat::*;
pub use diagnostics::*;
pub use domain::*;
pub use error::*;
pub use health::*;
pub use messages::*;
