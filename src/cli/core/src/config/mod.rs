/* src/cli/core/src/config/mod.rs */

mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use loader::{CONFIG_FILE, find_bertui_config, load_bertui_config, parse_bertui_config, resolve_config};
pub use types::{
  AppShellSection, BertuiConfig, BuildSection, MetaSection, MiddlewareSection, RedirectRule,
};
