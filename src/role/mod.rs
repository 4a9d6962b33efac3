//! Role registry
//!
//! A role is a named system instruction that frames how the model should
//! answer. Built-in roles (default, shell, describe-shell, code) are
//! process-constant and never touch disk; custom roles persist as one
//! JSON file per role under the roles directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::ShaiError;

/// Which family a role belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleKind {
    Default,
    Shell,
    DescribeShell,
    Code,
    #[default]
    Custom,
}

/// A named system instruction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Role {
    pub name: String,
    pub role_text: String,
    #[serde(skip, default)]
    pub kind: RoleKind,
}

/// What the CLI flags selected, parsed at the boundary so that
/// downstream code never counts booleans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSelector {
    Default,
    Shell,
    DescribeShell,
    Code,
    Named(String),
}

impl RoleSelector {
    /// Parse the assistance flags plus an optional explicit role name.
    /// At most one of the three flags may be set; an explicit name wins
    /// over flag-derived defaults.
    pub fn from_flags(
        shell: bool,
        describe_shell: bool,
        code: bool,
        explicit: Option<String>,
    ) -> Result<Self, ShaiError> {
        if [shell, describe_shell, code].iter().filter(|f| **f).count() > 1 {
            return Err(ShaiError::Configuration(
                "only one of --shell, --describe-shell and --code can be used at a time"
                    .to_string(),
            ));
        }
        if let Some(name) = explicit {
            return Ok(RoleSelector::Named(name));
        }
        Ok(if shell {
            RoleSelector::Shell
        } else if describe_shell {
            RoleSelector::DescribeShell
        } else if code {
            RoleSelector::Code
        } else {
            RoleSelector::Default
        })
    }
}

/// Names reserved by the built-in roles.
pub const BUILTIN_NAMES: [&str; 4] = ["default", "shell", "describe-shell", "code"];

/// Resolves roles and manages the durable custom-role storage.
pub struct RoleRegistry {
    roles_dir: PathBuf,
}

impl RoleRegistry {
    pub fn new(roles_dir: impl Into<PathBuf>) -> Result<Self, ShaiError> {
        let roles_dir = roles_dir.into();
        std::fs::create_dir_all(&roles_dir)
            .map_err(|e| ShaiError::Storage(format!("cannot create roles directory: {e}")))?;
        Ok(Self { roles_dir })
    }

    /// Resolve a selector to exactly one role. Deterministic and total
    /// for built-in selectors; a named selector consults durable storage.
    pub fn resolve(&self, selector: &RoleSelector) -> Result<Role, ShaiError> {
        match selector {
            RoleSelector::Default => Ok(builtin(RoleKind::Default)),
            RoleSelector::Shell => Ok(builtin(RoleKind::Shell)),
            RoleSelector::DescribeShell => Ok(builtin(RoleKind::DescribeShell)),
            RoleSelector::Code => Ok(builtin(RoleKind::Code)),
            RoleSelector::Named(name) => self.show(name),
        }
    }

    /// Persist a new custom role. Refuses to shadow a built-in or an
    /// existing custom role unless `overwrite` is confirmed.
    pub fn create(&self, name: &str, role_text: &str, overwrite: bool) -> Result<(), ShaiError> {
        validate_name(name)?;

        let taken = BUILTIN_NAMES.contains(&name) || self.role_path(name).exists();
        if taken && !overwrite {
            return Err(ShaiError::Conflict(format!("role '{name}' already exists")));
        }

        let role = Role {
            name: name.to_string(),
            role_text: role_text.to_string(),
            kind: RoleKind::Custom,
        };
        let content = serde_json::to_string_pretty(&role)
            .map_err(|e| ShaiError::Storage(e.to_string()))?;
        std::fs::write(self.role_path(name), content)
            .map_err(|e| ShaiError::Storage(format!("cannot write role '{name}': {e}")))?;

        tracing::debug!(role = name, "created custom role");
        Ok(())
    }

    /// Load a custom role by name.
    pub fn show(&self, name: &str) -> Result<Role, ShaiError> {
        let path = self.role_path(name);
        if !path.exists() {
            return Err(ShaiError::NotFound(format!(
                "role '{name}' not found; create it with --create-role {name}"
            )));
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ShaiError::Storage(format!("cannot read role '{name}': {e}")))?;
        let role: Role = serde_json::from_str(&content)
            .map_err(|e| ShaiError::Storage(format!("role '{name}' is corrupt: {e}")))?;
        Ok(role)
    }

    /// Names of all persisted custom roles, sorted.
    pub fn list(&self) -> Result<Vec<String>, ShaiError> {
        let mut names = Vec::new();
        let entries = std::fs::read_dir(&self.roles_dir)
            .map_err(|e| ShaiError::Storage(format!("cannot read roles directory: {e}")))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn role_path(&self, name: &str) -> PathBuf {
        self.roles_dir.join(format!("{name}.json"))
    }
}

fn validate_name(name: &str) -> Result<(), ShaiError> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ShaiError::Configuration(format!(
            "invalid role name '{name}': use letters, digits, '-' and '_'"
        )))
    }
}

/// Construct a built-in role. Shell-facing texts interpolate the host
/// operating system and login shell so the model targets the right
/// dialect.
pub fn builtin(kind: RoleKind) -> Role {
    let os = os_name();
    let shell = shell_name();
    let (name, role_text) = match kind {
        RoleKind::Default => (
            "default",
            format!(
                "You are a command-line assistant on {os} using {shell}.\n\
                 Answer as briefly as possible, in plain text without markdown.\n\
                 Expand step by step only when asked for detail."
            ),
        ),
        RoleKind::Shell => (
            "shell",
            format!(
                "You translate task descriptions into shell commands.\n\
                 Output a single {shell} command for {os} and nothing else.\n\
                 Do not explain the command and do not wrap it in markdown or quotes.\n\
                 Chain multiple steps with && when the task needs them.\n\
                 If details are missing, choose the most common interpretation."
            ),
        ),
        RoleKind::DescribeShell => (
            "describe-shell",
            format!(
                "You explain shell commands for {shell} on {os}.\n\
                 Start with a terse one-sentence summary of what the command does,\n\
                 then cover each flag and argument. Plain text only."
            ),
        ),
        RoleKind::Code => (
            "code",
            "You write code.\n\
             Output only code, with no commentary and no markdown fences.\n\
             Infer the most likely language when none is specified.\n\
             If details are missing, implement the most sensible version."
                .to_string(),
        ),
        RoleKind::Custom => unreachable!("custom roles come from storage"),
    };
    Role {
        name: name.to_string(),
        role_text,
        kind,
    }
}

fn os_name() -> String {
    match std::env::consts::OS {
        "linux" => "Linux".to_string(),
        "macos" => "macOS".to_string(),
        "windows" => "Windows".to_string(),
        "freebsd" => "FreeBSD".to_string(),
        other => other.to_string(),
    }
}

fn shell_name() -> String {
    if cfg!(windows) {
        let comspec = std::env::var("COMSPEC").unwrap_or_default();
        let name = basename(&comspec).trim_end_matches(".exe").to_lowercase();
        if name.is_empty() {
            "cmd".to_string()
        } else {
            name
        }
    } else {
        std::env::var("SHELL")
            .ok()
            .map(|s| basename(&s).to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "sh".to_string())
    }
}

fn basename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> (TempDir, RoleRegistry) {
        let tmp = TempDir::new().unwrap();
        let registry = RoleRegistry::new(tmp.path().join("roles")).unwrap();
        (tmp, registry)
    }

    #[test]
    fn selector_rejects_every_multi_flag_combination() {
        let combos = [
            (true, true, false),
            (true, false, true),
            (false, true, true),
            (true, true, true),
        ];
        for (shell, describe, code) in combos {
            let result = RoleSelector::from_flags(shell, describe, code, None);
            assert!(
                matches!(result, Err(ShaiError::Configuration(_))),
                "expected rejection for {shell}/{describe}/{code}"
            );
        }
    }

    #[test]
    fn selector_is_deterministic_for_single_flags() {
        assert_eq!(
            RoleSelector::from_flags(false, false, false, None).unwrap(),
            RoleSelector::Default
        );
        assert_eq!(
            RoleSelector::from_flags(true, false, false, None).unwrap(),
            RoleSelector::Shell
        );
        assert_eq!(
            RoleSelector::from_flags(false, true, false, None).unwrap(),
            RoleSelector::DescribeShell
        );
        assert_eq!(
            RoleSelector::from_flags(false, false, true, None).unwrap(),
            RoleSelector::Code
        );
    }

    #[test]
    fn explicit_name_overrides_flags() {
        let selector =
            RoleSelector::from_flags(true, false, false, Some("reviewer".to_string())).unwrap();
        assert_eq!(selector, RoleSelector::Named("reviewer".to_string()));
    }

    #[test]
    fn builtin_resolution_never_touches_storage() {
        let (tmp, registry) = registry();
        let role = registry.resolve(&RoleSelector::Shell).unwrap();
        assert_eq!(role.kind, RoleKind::Shell);
        assert!(role.role_text.contains("shell command"));
        // storage stays empty
        assert!(std::fs::read_dir(tmp.path().join("roles")).unwrap().next().is_none());
    }

    #[test]
    fn create_show_list_round_trip() {
        let (_tmp, registry) = registry();
        registry
            .create("reviewer", "You review code for bugs.", false)
            .unwrap();

        let role = registry.show("reviewer").unwrap();
        assert_eq!(role.name, "reviewer");
        assert_eq!(role.role_text, "You review code for bugs.");
        assert_eq!(role.kind, RoleKind::Custom);

        assert_eq!(registry.list().unwrap(), vec!["reviewer".to_string()]);

        let resolved = registry
            .resolve(&RoleSelector::Named("reviewer".to_string()))
            .unwrap();
        assert_eq!(resolved.role_text, role.role_text);
    }

    #[test]
    fn duplicate_create_conflicts_unless_overwritten() {
        let (_tmp, registry) = registry();
        registry.create("mentor", "first", false).unwrap();

        let err = registry.create("mentor", "second", false).unwrap_err();
        assert!(matches!(err, ShaiError::Conflict(_)));

        registry.create("mentor", "second", true).unwrap();
        assert_eq!(registry.show("mentor").unwrap().role_text, "second");
    }

    #[test]
    fn builtin_names_conflict_too() {
        let (_tmp, registry) = registry();
        let err = registry.create("shell", "mine", false).unwrap_err();
        assert!(matches!(err, ShaiError::Conflict(_)));
    }

    #[test]
    fn unknown_role_is_not_found() {
        let (_tmp, registry) = registry();
        let err = registry
            .resolve(&RoleSelector::Named("ghost".to_string()))
            .unwrap_err();
        assert!(matches!(err, ShaiError::NotFound(_)));
    }

    #[test]
    fn path_like_names_are_rejected() {
        let (_tmp, registry) = registry();
        let err = registry.create("../escape", "text", false).unwrap_err();
        assert!(matches!(err, ShaiError::Configuration(_)));
    }

    #[test]
    fn list_is_sorted_and_restartable() {
        let (_tmp, registry) = registry();
        registry.create("zeta", "z", false).unwrap();
        registry.create("alpha", "a", false).unwrap();
        assert_eq!(registry.list().unwrap(), vec!["alpha", "zeta"]);
        // a second enumeration sees the same thing
        assert_eq!(registry.list().unwrap(), vec!["alpha", "zeta"]);
    }
}
