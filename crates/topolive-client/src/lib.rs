//! Network adapters for the topolive session: the analyzer REST API over
//! reqwest, the websocket transport over tokio-tungstenite, and in-memory
//! mocks of both.

pub mod api;
pub mod mock;
pub mod ws;

pub use api::HttpApi;
pub use ws::WsTransport;
