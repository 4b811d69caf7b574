//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled          |
//! |----------|---------------------------|
//! | `serve`  | `Serve`                   |
//! | `init`   | `Init`                    |
//! | `plan`   | `Plan show`, `Plan repair`|
//! | `config` | `Config`                  |

pub mod config;
pub mod init;
pub mod plan;
pub mod serve;

pub use config::cmd_config;
pub use init::cmd_init;
pub use plan::cmd_plan;
pub use serve::{ServeArgs, cmd_serve};
