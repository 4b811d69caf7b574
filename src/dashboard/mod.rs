//! Dashboard HTTP server.
//!
//! ```text
//! ┌──────────┐   HTTP   ┌─────────────────────────────────────────────┐
//! │ Browser  │ ───────> │  server.rs   (router, ServerConfig, assets) │
//! │ (app.js) │ <─────── │    ├─ shell.rs    page + tab/form fragments │
//! └──────────┘ WebSocket│    ├─ api.rs      REST routes, AppState     │
//!                       │    └─ commands.rs named UI commands         │
//!                       │           │                                 │
//!                       │           v                                 │
//!                       │  plan::PlanMutator / views::*View           │
//!                       │           │                                 │
//!                       │           v                                 │
//!                       │  store::DocumentStore                       │
//!                       └─────────────────────────────────────────────┘
//! ```
//!
//! | Module     | Responsibility                                           |
//! |------------|----------------------------------------------------------|
//! | `api`      | `AppState`, `ApiError`, REST handlers                    |
//! | `commands` | `CommandRegistry` dispatch for `POST /api/commands`      |
//! | `shell`    | Page shell, `render_tab`, dialog forms                   |
//! | `ws`       | `WsMessage` change notifications + `broadcast_message()` |
//! | `embedded` | Stylesheet and client script (`rust-embed`)              |
//!
//! Every write broadcasts a [`ws::WsMessage`]; open pages re-fetch the
//! affected tab.

pub mod api;
pub mod commands;
pub mod embedded;
pub mod server;
pub mod shell;
pub mod ws;

pub use api::{AppState, SharedState};
pub use server::{ServerConfig, build_router, start_server};
