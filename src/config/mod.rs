//! Tiered configuration.
//!
//! Settings come from four tiers, merged field by field:
//! 1. **Defaults** - compiled in
//! 2. **Project** - `$CWD/project-progress/`
//! 3. **User** - `~/.project-progress/`
//! 4. **Environment** - variables below
//!
//! `config.yaml` and `prompts.yaml` are deep-merged across tiers.
//!
//! ## Environment Variables
//! - `PROJECT_PROGRESS_CONFIG_PATH` - Explicit config file (skips the tiers)
//! - `PROJECT_PROGRESS_DB_PATH` - Database path
//! - `PROJECT_PROGRESS_USER_DIR` - User config dir (default: `~/.project-progress`)
//! - `PROJECT_PROGRESS_PROJECT_DIR` - Project config dir (default: `./project-progress`)

mod loader;
mod merge;
mod types;

pub use loader::{
    CONFIG_PATH_ENV, ConfigLoader, ConfigPaths, ConfigTier, DB_PATH_ENV, PROJECT_DIR_ENV, USER_DIR_ENV,
};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
