//! # Tool Path Resolver
//!
//! This module finds the external tools the transcoder shells out to:
//! - `HandBrakeCLI` (the encoder)
//! - `ffprobe` (duration and dimension probe)
//!
//! Lookup order: explicit environment override (`HANDBRAKE_CLI`, `FFPROBE`),
//! bundled `TOOLS_DIR/<platform>/`, then the system `PATH`.

use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const HANDBRAKE: &str = "HandBrakeCLI";
pub const FFPROBE: &str = "ffprobe";

/// Tool path resolver for bundled and system-installed tools
pub struct ToolPathResolver {
    /// Base directory where tools are bundled
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    /// Create a new path resolver
    pub fn new() -> Self {
        let tools_dir = env::var_os("TOOLS_DIR")
            .map(PathBuf::from)
            .filter(|dir| dir.is_dir());

        if let Some(ref dir) = tools_dir {
            debug!("Using bundled tools directory: {:?}", dir);
        }

        Self { tools_dir }
    }

    /// Resolver that only looks inside the given tools directory and PATH
    pub fn with_tools_dir(tools_dir: PathBuf) -> Self {
        Self { tools_dir: Some(tools_dir) }
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        if let Some(path) = Self::env_override(tool_name) {
            debug!("Using {} from environment: {:?}", tool_name, path);
            return Some(path);
        }

        if let Some(ref tools_dir) = self.tools_dir {
            let bundled_path = Self::bundled_tool_path(tools_dir, tool_name);
            if Self::is_executable(&bundled_path) {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled_path);
                return Some(bundled_path);
            }
        }

        if let Some(system_path) = Self::find_in_system_path(tool_name) {
            debug!("Using system tool: {} -> {:?}", tool_name, system_path);
            return Some(system_path);
        }

        warn!("Tool not found: {}", tool_name);
        None
    }

    /// Get path to the HandBrake command line encoder
    pub fn handbrake(&self) -> Option<PathBuf> {
        self.resolve_tool(HANDBRAKE)
    }

    /// Get path to ffprobe
    pub fn ffprobe(&self) -> Option<PathBuf> {
        self.resolve_tool(FFPROBE)
    }

    fn env_override(tool_name: &str) -> Option<PathBuf> {
        let var = match tool_name {
            HANDBRAKE => "HANDBRAKE_CLI",
            FFPROBE => "FFPROBE",
            _ => return None,
        };
        env::var_os(var).map(PathBuf::from)
    }

    /// Expected path for a bundled tool: `tools/{platform}/{tool_name}[.exe]`
    fn bundled_tool_path(tools_dir: &Path, tool_name: &str) -> PathBuf {
        let platform = if cfg!(target_os = "macos") {
            "darwin"
        } else {
            env::consts::OS
        };
        tools_dir
            .join(platform)
            .join(format!("{}{}", tool_name, env::consts::EXE_SUFFIX))
    }

    /// Find tool in system PATH
    fn find_in_system_path(tool_name: &str) -> Option<PathBuf> {
        let tool_with_ext = format!("{}{}", tool_name, env::consts::EXE_SUFFIX);
        env::split_paths(&env::var_os("PATH")?)
            .map(|dir| dir.join(&tool_with_ext))
            .find(|path| path.is_file())
    }

    /// Whether a path points to something that can be executed. Bare names are
    /// looked up in PATH.
    pub fn is_executable(path: &Path) -> bool {
        if path.components().count() == 1 {
            if let Some(name) = path.to_str() {
                return Self::find_in_system_path(name).is_some() || path.is_file();
            }
        }
        path.is_file()
    }

    /// Installation hint shown when a tool is missing
    pub fn install_instructions(tool_name: &str) -> String {
        let hint = match (tool_name, env::consts::OS) {
            (HANDBRAKE, "linux") => "sudo apt-get install handbrake-cli",
            (HANDBRAKE, "macos") => "brew install handbrake",
            (FFPROBE, "linux") => "sudo apt-get install ffmpeg",
            (FFPROBE, "macos") => "brew install ffmpeg",
            _ => "install it and make sure it is in PATH",
        };
        format!(
            "{} is required for transcoding. To install, run:\n  {}\n(or point {} at the binary)",
            tool_name,
            hint,
            match tool_name {
                HANDBRAKE => "HANDBRAKE_CLI",
                FFPROBE => "FFPROBE",
                _ => "TOOLS_DIR",
            }
        )
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_tool_is_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let bundled = ToolPathResolver::bundled_tool_path(dir.path(), "some-bundled-tool");
        std::fs::create_dir_all(bundled.parent().unwrap()).unwrap();
        std::fs::write(&bundled, b"#!/bin/sh\n").unwrap();

        let resolver = ToolPathResolver::with_tools_dir(dir.path().to_path_buf());
        assert_eq!(resolver.resolve_tool("some-bundled-tool"), Some(bundled));
    }

    #[test]
    fn test_unknown_tool_is_not_found() {
        let resolver = ToolPathResolver::with_tools_dir(PathBuf::from("/definitely/not/here"));
        assert_eq!(resolver.resolve_tool("no-such-tool-a8f3"), None);
    }

    #[test]
    fn test_install_instructions_mention_tool() {
        let text = ToolPathResolver::install_instructions(HANDBRAKE);
        assert!(text.contains("HandBrakeCLI"));
        assert!(text.contains("HANDBRAKE_CLI"));
    }

    #[test]
    fn test_missing_absolute_path_is_not_executable() {
        assert!(!ToolPathResolver::is_executable(Path::new("/definitely/not/here/ffprobe")));
    }
}
