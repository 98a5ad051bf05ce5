pub mod handler;
pub mod msg_chat_handler;
pub mod msg_domain_handler;
pub mod msg_editor_handler;
pub mod msg_ping_handler;

pub use handler::websocket_handler;
