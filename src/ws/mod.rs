pub mod connctx;
pub mod docsession;
pub mod hub;
pub mod presence;
pub mod rooms;

pub use connctx::{ConnCtx, ConnectionRegistry, ConnectionSender, Purpose};
pub use hub::{Delivery, DisconnectOutcome, Hub};
