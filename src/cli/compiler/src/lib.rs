/* src/cli/compiler/src/lib.rs */

// Build pipeline core shared by `bertui dev` and `bertui build`:
// route discovery, per-file source rewriting, CSS module scoping,
// partial-hydration classification and server-island extraction.

pub mod cache;
pub mod classify;
pub mod compile;
pub mod css_module;
pub mod env;
mod error;
mod hash;
pub mod island;
pub mod layouts;
pub mod loading;
pub mod paths;
pub mod router_gen;
pub mod routes;
pub mod transform;

pub use cache::{CacheStats, ContentCache};
pub use classify::{AnalyzedRoute, Feature, HydrationMode, HydrationReport, MarkerKind, classify};
pub use compile::{CompileOptions, CompileReport, IslandPage, ProjectLayout, compile_project};
pub use css_module::{CssModuleMapping, scope_css};
pub use error::{CompileError, IslandRejection};
pub use island::extract_static_html;
pub use layouts::{Layout, LayoutSet};
pub use loading::{LoadingComponent, LoadingSet};
pub use router_gen::{RouterModule, generate_router};
pub use routes::{Route, RouteKind, discover_routes};
pub use transform::{Dialect, TransformContext, Transpiler, transform_source};

/// Literal export statement that marks a page as a server island.
pub const SERVER_ISLAND_MARKER: &str = "export const render = \"server\"";

/// Module specifier user code imports navigation primitives from.
pub const ROUTER_SPECIFIER: &str = "bertui/router";

/// Framework stylesheet import; styles are combined by the CSS build instead.
pub const STYLES_SPECIFIER: &str = "bertui/styles";

/// File name of the generated router module at the compiled root.
pub const ROUTER_MODULE: &str = "router.js";

/// Env var prefixes exposed to client code when the config does not override them.
pub const DEFAULT_ENV_PREFIXES: &[&str] = &["BERTUI_", "PUBLIC_"];
