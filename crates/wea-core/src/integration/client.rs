//! The downstream send capability.
//!
//! A [`Client`] is the connection handle that delivered an event. Handlers
//! reach it through [`MessageContext::client`](crate::MessageContext::client)
//! to answer; its wire format is opaque to the engine.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::foundation::Element;

/// A chat connection able to send messages.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use wea_core::{Client, ClientResult, Element};
///
/// struct StdoutClient;
///
/// #[async_trait]
/// impl Client for StdoutClient {
///     fn self_uin(&self) -> u32 {
///         10000
///     }
///
///     async fn send_private_message(&self, user: u32, elements: Vec<Element>) -> ClientResult<()> {
///         println!("-> {user}: {elements:?}");
///         Ok(())
///     }
///
///     async fn send_group_message(&self, group: u32, elements: Vec<Element>) -> ClientResult<()> {
///         println!("-> group {group}: {elements:?}");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Client: Send + Sync + 'static {
    /// Returns the uin of the logged-in account.
    fn self_uin(&self) -> u32;

    /// Sends a private message to `user_uin`.
    async fn send_private_message(&self, user_uin: u32, elements: Vec<Element>)
    -> ClientResult<()>;

    /// Sends a message to the group `group_uin`.
    async fn send_group_message(&self, group_uin: u32, elements: Vec<Element>)
    -> ClientResult<()>;
}

/// A shared, type-erased client.
pub type BoxedClient = Arc<dyn Client>;
