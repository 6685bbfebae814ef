// -
// Layer names

/// Layer that receives writes when no layer name is given
pub const DEFAULT_LAYER_NAME: &str = "default";

/// Layer mounted for a live (reloading) bootstrap file
pub const DEFAULT_FILE_LAYER_NAME: &str = "default-conf-file";

/// Layer mounted for the remote store's default key
pub const DEFAULT_REMOTE_LAYER_NAME: &str = "default-conf-remote";

// -
// Key paths

/// Empty path addressing the whole document
pub const ROOT_KEY: &str = "";

/// Key path separator
pub(crate) const PATH_SEPARATOR: char = '.';

/// Key consulted in the default layers to pick the source used by `load`
pub const DEFAULT_CONF_SOURCE_KEY: &str = "default_conf_source";

// -
// Source names

/// Name under which the file source is registered during bootstrap
pub const FILE_SOURCE_NAME: &str = "file";

/// Name under which the remote store source is registered by default
pub const REMOTE_SOURCE_NAME: &str = "remote";

// -
// Bootstrap

/// Environment variable prefix for bootstrap settings
pub(crate) const ENV_PREFIX: &str = "LAYERCONF";

/// Upper bound of name buffers kept by a context's view pool
pub(crate) const DEFAULT_VIEW_POOL_CAPACITY: usize = 64;
