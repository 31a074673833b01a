pub mod commands;
pub mod config;
pub mod conversation;
pub mod design_history;
pub mod history;
pub mod session;
pub mod shortcuts;

pub use commands::{Command, CommandError, LetterCase, Outcome, SelectionChange, StyleAction};
pub use config::EditorConfig;
pub use conversation::{Conversation, ConversationError, Message, RequestTicket, Role, WireMessage};
pub use design_history::{DesignEntry, DesignHistory};
pub use history::{History, HistoryError, HistoryState};
pub use session::{Editor, EditorError, EditorObserver, NoopObserver};
pub use shortcuts::{ShortcutAction, ShortcutMap};
