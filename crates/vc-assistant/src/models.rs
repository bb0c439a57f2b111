//! Local models for the pitch conversation.
//!
//! The hosted service owns the real conversation log; these types are the local
//! read-through view of it (chat history) plus the attachment routing rules that
//! decide which remote capability an uploaded file is handed to.
pub mod attachment;
pub mod message;
