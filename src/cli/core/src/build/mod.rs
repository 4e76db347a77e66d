/* src/cli/core/src/build/mod.rs */

pub mod assets;
pub mod bundle;
pub mod css;
pub mod html;
pub mod report;
pub mod run;
pub mod sitemap;
pub mod types;

pub use run::run_build;
