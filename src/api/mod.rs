//! Messages endpoint: wire types and the HTTP client.

pub mod client;
pub mod types;

pub use client::{HttpMessagesClient, MessagesApi};
pub use types::{
    Citation, ContentBlock, ContentItem, Message, MessageContent, MessagesRequest,
    MessagesResponse, Role, Usage,
};
