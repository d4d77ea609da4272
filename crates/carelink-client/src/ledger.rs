//! Backend collaborator seam.
//!
//! The portal backend owns chat history, membership, and the authoritative
//! seen ledger; this trait is the only way the session reaches it. The
//! provided transport driver calls it when executing
//! [`crate::CoordinatorAction::FetchSnapshot`] and
//! [`crate::CoordinatorAction::PushSeen`]; tests substitute scripted
//! implementations.

use async_trait::async_trait;
use carelink_proto::{ChatId, ChatInfo, ChatMember, UnseenMap, UserId};

use crate::error::LedgerError;

/// The REST-backed collaborators consumed by the session.
#[async_trait]
pub trait SeenLedger: Send + Sync {
    /// Fetch the chats the user belongs to (`GET /chat/{userID}`).
    async fn fetch_directory(&self, user_id: UserId) -> Result<Vec<ChatInfo>, LedgerError>;

    /// Fetch the authoritative unseen snapshot (`GET /chat/seen/{userID}`).
    async fn fetch_unseen(&self, user_id: UserId) -> Result<UnseenMap, LedgerError>;

    /// Acknowledge a chat as seen (`PUT /chat/seen?userId=&chatId=`).
    async fn mark_seen(&self, user_id: UserId, chat_id: ChatId) -> Result<(), LedgerError>;

    /// Fetch a chat's member list, on demand.
    async fn fetch_members(&self, chat_id: ChatId) -> Result<Vec<ChatMember>, LedgerError>;
}
