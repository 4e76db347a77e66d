/* src/cli/core/src/server/mod.rs */

// Pieces shared by the dev server and the preview server.

pub mod files;
pub mod middleware;
pub mod mime;
