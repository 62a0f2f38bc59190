//! 记忆层：每个 Agent 的邮箱与对话历史

pub mod conversation;
pub mod mailbox;

pub use conversation::{ConversationMemory, HistoryEntry, Message, Role};
pub use mailbox::{Channel, Mailbox, MailboxRegistry, SpeechMessage};
