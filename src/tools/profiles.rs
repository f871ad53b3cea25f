//! Tool profiles and groups for access control.
//!
//! `TournamentEngine` hands each worker [`ToolProfile::Worker`] instead of
//! the MainAgent's registry view, since every tournament worker is its own
//! `AgentCore` with a restricted tool set.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Logical grouping of tools by capability area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolGroup {
    /// Filesystem tools (read, write, list, delete).
    Fs,
    /// Code/process execution tools.
    Execution,
    /// Control-plane tools (`complete_task`, `manage_context`).
    Control,
    /// Tournament-only tools (`reveal`).
    Tournament,
}

impl ToolGroup {
    pub fn tools(&self) -> &'static [&'static str] {
        match self {
            ToolGroup::Fs => &["file_read", "file_write", "file_list", "file_delete"],
            ToolGroup::Execution => &["run_process", "patch"],
            ToolGroup::Control => &["complete_task", "manage_context"],
            ToolGroup::Tournament => &["reveal"],
        }
    }

    pub fn from_tool_name(name: &str) -> Option<ToolGroup> {
        for group in [ToolGroup::Fs, ToolGroup::Execution, ToolGroup::Control, ToolGroup::Tournament] {
            if group.tools().contains(&name) {
                return Some(group);
            }
        }
        None
    }
}

/// Predefined tool access profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolProfile {
    /// Read-only filesystem access plus control tools. Used for workers that
    /// only critique or synthesize, never mutate the workspace.
    Minimal,
    /// Fs + Execution + Control + `reveal`. The default tournament worker
    /// profile — every tournament worker needs `reveal` to publish artifacts.
    Worker,
    /// Fs + Execution + Control, no `reveal` (that tool only makes sense
    /// inside a tournament stage). Used by the MainAgent.
    #[default]
    Full,
}

impl ToolProfile {
    pub fn allowed_groups(&self) -> Vec<ToolGroup> {
        match self {
            ToolProfile::Minimal => vec![ToolGroup::Control],
            ToolProfile::Worker => vec![
                ToolGroup::Fs,
                ToolGroup::Execution,
                ToolGroup::Control,
                ToolGroup::Tournament,
            ],
            ToolProfile::Full => vec![ToolGroup::Fs, ToolGroup::Execution, ToolGroup::Control],
        }
    }

    pub fn allowed_tools(&self) -> HashSet<&'static str> {
        let mut tools: HashSet<&'static str> = self
            .allowed_groups()
            .iter()
            .flat_map(|g| g.tools().iter().copied())
            .collect();

        // Minimal still allows read/list even though Fs as a group is withheld.
        if *self == ToolProfile::Minimal {
            tools.insert("file_read");
            tools.insert("file_list");
        }

        tools
    }

    /// Whether `tool_name` is visible under this profile. Unknown (custom)
    /// tools are allowed by default.
    pub fn is_tool_allowed(&self, tool_name: &str) -> bool {
        if ToolGroup::from_tool_name(tool_name).is_none() {
            return true;
        }
        self.allowed_tools().contains(tool_name)
    }
}

impl std::fmt::Display for ToolProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolProfile::Minimal => write!(f, "minimal"),
            ToolProfile::Worker => write!(f, "worker"),
            ToolProfile::Full => write!(f, "full"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_excludes_mutating_fs_tools() {
        let p = ToolProfile::Minimal;
        assert!(p.is_tool_allowed("file_read"));
        assert!(p.is_tool_allowed("file_list"));
        assert!(!p.is_tool_allowed("file_write"));
        assert!(!p.is_tool_allowed("run_process"));
    }

    #[test]
    fn worker_includes_reveal() {
        let p = ToolProfile::Worker;
        assert!(p.is_tool_allowed("file_write"));
        assert!(p.is_tool_allowed("run_process"));
        assert!(p.is_tool_allowed("reveal"));
    }

    #[test]
    fn full_excludes_reveal() {
        let p = ToolProfile::Full;
        for name in ["file_read", "file_write", "run_process", "complete_task"] {
            assert!(p.is_tool_allowed(name));
        }
        assert!(!p.is_tool_allowed("reveal"));
    }

    #[test]
    fn unknown_tool_allowed_by_default() {
        assert!(ToolProfile::Minimal.is_tool_allowed("custom_tool_xyz"));
    }
}
