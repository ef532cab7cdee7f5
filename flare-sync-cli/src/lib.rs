//! flare-sync 命令行
//!
//! 二进制入口见 `main.rs`，这里只暴露命令行定义与解析。

pub mod cli;

pub use cli::{build, env_name, resolve};
