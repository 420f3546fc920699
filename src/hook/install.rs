//! Git hook installation.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use dialoguer::Confirm;
use git2::Repository;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::HookError;

const NULL_SHA: &str = "0000000000000000000000000000000000000000";

/// Which hook to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum HookKind {
    /// Comment after every local commit.
    PostCommit,
    /// Comment for every ref about to be pushed.
    PrePush,
}

impl HookKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            HookKind::PostCommit => "post-commit",
            HookKind::PrePush => "pre-push",
        }
    }

    /// Shell script invoking `executable run`.
    pub fn script(&self, executable: &Path, config_path: Option<&Path>) -> String {
        let exe = shell_quote(&executable.to_string_lossy());
        let config = config_path
            .map(|p| format!(" --config {}", shell_quote(&p.to_string_lossy())))
            .unwrap_or_default();

        match self {
            HookKind::PostCommit => format!(
                "#!/bin/sh\n\
                 # jira-update post-commit hook\n\
                 base=$(git rev-parse -q --verify HEAD~1 || echo {NULL_SHA})\n\
                 {exe} run --base-ref \"$base\" --head-ref HEAD{config} || true\n"
            ),
            HookKind::PrePush => format!(
                "#!/bin/sh\n\
                 # jira-update pre-push hook\n\
                 while read local_ref local_sha remote_ref remote_sha; do\n\
                 \x20 case \"$local_sha\" in *[!0]*) ;; *) continue ;; esac\n\
                 \x20 {exe} run --base-ref \"$remote_sha\" --head-ref \"$local_sha\"{config} || true\n\
                 done\n\
                 exit 0\n"
            ),
        }
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Install a hook for the current executable.
///
/// An existing hook is replaced only with `force` or after interactive
/// confirmation, and is kept as `<name>.bak`.
pub fn install_hook(
    repo_path: &Path,
    kind: HookKind,
    config_path: Option<&Path>,
    force: bool,
) -> Result<PathBuf, HookError> {
    let executable = env::current_exe().map_err(HookError::ExecutableNotFound)?;
    install_hook_with(repo_path, kind, &executable, config_path, |path| {
        force || confirm_replace(path)
    })
}

fn confirm_replace(path: &Path) -> bool {
    Confirm::new()
        .with_prompt(format!("{} already exists. Replace it?", path.display()))
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// Install a hook invoking `executable`, asking `allow_replace` before
/// touching an existing hook.
pub fn install_hook_with(
    repo_path: &Path,
    kind: HookKind,
    executable: &Path,
    config_path: Option<&Path>,
    allow_replace: impl FnOnce(&Path) -> bool,
) -> Result<PathBuf, HookError> {
    let repo = Repository::discover(repo_path)
        .map_err(|_| HookError::NotARepository(repo_path.to_path_buf()))?;
    let hooks_dir = repo.path().join("hooks");
    let hook_path = hooks_dir.join(kind.file_name());

    let write_failed = |path: &Path, source| HookError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(&hooks_dir).map_err(|e| write_failed(&hooks_dir, e))?;

    if hook_path.exists() {
        if !allow_replace(&hook_path) {
            return Err(HookError::AlreadyExists(hook_path));
        }
        let backup = hooks_dir.join(format!("{}.bak", kind.file_name()));
        fs::copy(&hook_path, &backup).map_err(|e| write_failed(&backup, e))?;
        debug!("Backed up existing hook to {}", backup.display());
    }

    let script = kind.script(executable, config_path);
    let mut file = NamedTempFile::new_in(&hooks_dir).map_err(|e| write_failed(&hooks_dir, e))?;
    file.write_all(script.as_bytes())
        .map_err(|e| write_failed(file.path(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(fs::Permissions::from_mode(0o755))
            .map_err(|e| write_failed(file.path(), e))?;
    }

    file.persist(&hook_path)
        .map_err(|e| write_failed(&hook_path, e.error))?;

    info!("Installed {} hook at {}", kind.file_name(), hook_path.display());
    Ok(hook_path)
}
