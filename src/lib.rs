//! # Multi Search
//!
//! Operator-defined search schemes for chat commands.
//!
//! Each scheme maps a command prefix (e.g. `!!g`) to one or more URL
//! templates. Users type a keyword and get back clickable search links,
//! either privately or broadcast to everyone. Schemes are plain
//! directories under the plugin data root, each with its own metadata
//! file and language files.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  data root   │──▶│   Scheme    │──▶│     Host     │
//! │ <scheme>/    │   │ meta + lang │   │ commands,    │
//! │  meta, lang/ │   │ + search    │   │ translations │
//! └──────────────┘   └──────▲──────┘   └──────────────┘
//!                           │
//!                   ┌───────┴────────┐
//!                   │ SchemeRegistry │  !!ms list | new | reload
//!                   └────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML application configuration |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`text`] | Styled, clickable message text |
//! | [`command`] | Declarative command grammar and dispatch |
//! | [`host`] | Host runtime interface |
//! | [`task`] | Named background threads |
//! | [`metadata`] | Per-scheme persisted configuration |
//! | [`locale`] | Language files and translation store |
//! | [`search`] | Command layout and URL expansion |
//! | [`scheme`] | One search scheme |
//! | [`registry`] | Scheme discovery and admin commands |
//! | [`console`] | Terminal host |

pub mod command;
pub mod config;
pub mod console;
pub mod host;
pub mod locale;
pub mod logging;
pub mod metadata;
pub mod registry;
pub mod scheme;
pub mod search;
pub mod task;
pub mod text;
