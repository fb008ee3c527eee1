pub mod chat;
pub mod cite;
pub mod commands;
pub mod docs;
pub mod highlight;
pub mod llm;
pub mod state;
