pub mod webhook_server;

pub use webhook_server::{AppState, WebhookServer, WebhookServerTrait};
