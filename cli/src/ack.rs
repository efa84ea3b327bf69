//! [`AckSink`] over stdout: debounced interrupt/cancel acknowledgements (spec §4.8), printed
//! straight to the terminal instead of sent through a chat transport.

use async_trait::async_trait;
use supervisor_core::run_manager::AckSink;

pub struct StdoutAck;

#[async_trait]
impl AckSink for StdoutAck {
    async fn ack(&self, chat_id: &str, text: &str) {
        println!("[{chat_id}] {text}");
    }
}
