//! Canonical directory resolution for the coordination core.
//!
//! Two locations matter: the **lock directory** (where the Lock Store
//! default-resolves its single lock file, at `<os-tempdir>/mcp-kit-
//! <port>.lock`) and the **config directory** (where `mcp-kit-server`
//! optionally reads a TOML override file). Both honour `MCP_KIT_HOME` first,
//! matching the source codebase's `ATM_HOME` precedent, so tests and custom
//! deployments can redirect everything into a single temp directory.
//!
//! # Precedence
//!
//! 1. `MCP_KIT_HOME` environment variable (if set and non-empty)
//! 2. The platform default (`std::env::temp_dir()` for the lock directory,
//!    `dirs::config_dir()` for the config directory)

use std::path::PathBuf;

/// Root override directory from `MCP_KIT_HOME`, if set to a non-empty value.
fn home_override() -> Option<PathBuf> {
    let raw = std::env::var("MCP_KIT_HOME").ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

/// Directory the Lock Store uses when no explicit `lock_dir` override is
/// configured. Defaults to the OS temp directory, same as the original
/// `<os-tempdir>/mcp-kit-<port>.lock` path.
pub fn default_lock_dir() -> PathBuf {
    home_override().unwrap_or_else(std::env::temp_dir)
}

/// Directory `mcp-kit-server` looks in for an optional `config.toml`.
/// Falls back to the temp directory on platforms where the platform config
/// directory cannot be determined, same fallback discipline as the lock
/// directory.
pub fn default_config_dir() -> PathBuf {
    if let Some(dir) = home_override() {
        return dir;
    }
    dirs::config_dir()
        .map(|d| d.join("mcp-kit"))
        .unwrap_or_else(std::env::temp_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn default_lock_dir_honours_mcp_kit_home() {
        let original = std::env::var("MCP_KIT_HOME").ok();
        unsafe { std::env::set_var("MCP_KIT_HOME", "/custom/lockdir") };
        assert_eq!(default_lock_dir(), PathBuf::from("/custom/lockdir"));
        unsafe {
            match original {
                Some(v) => std::env::set_var("MCP_KIT_HOME", v),
                None => std::env::remove_var("MCP_KIT_HOME"),
            }
        }
    }

    #[test]
    #[serial]
    fn default_lock_dir_falls_back_to_temp_dir() {
        let original = std::env::var("MCP_KIT_HOME").ok();
        unsafe { std::env::remove_var("MCP_KIT_HOME") };
        assert_eq!(default_lock_dir(), std::env::temp_dir());
        unsafe {
            if let Some(v) = original {
                std::env::set_var("MCP_KIT_HOME", v);
            }
        }
    }

    #[test]
    #[serial]
    fn default_lock_dir_ignores_blank_override() {
        let original = std::env::var("MCP_KIT_HOME").ok();
        unsafe { std::env::set_var("MCP_KIT_HOME", "   ") };
        assert_eq!(default_lock_dir(), std::env::temp_dir());
        unsafe {
            match original {
                Some(v) => std::env::set_var("MCP_KIT_HOME", v),
                None => std::env::remove_var("MCP_KIT_HOME"),
            }
        }
    }

    #[test]
    #[serial]
    fn default_config_dir_honours_mcp_kit_home() {
        let original = std::env::var("MCP_KIT_HOME").ok();
        unsafe { std::env::set_var("MCP_KIT_HOME", "/custom/confdir") };
        assert_eq!(default_config_dir(), PathBuf::from("/custom/confdir"));
        unsafe {
            match original {
                Some(v) => std::env::set_var("MCP_KIT_HOME", v),
                None => std::env::remove_var("MCP_KIT_HOME"),
            }
        }
    }
}
