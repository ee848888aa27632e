pub mod client;
pub mod message;

pub use client::{AccessToken, GraphClient};
pub use message::SendMailRequest;

pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
