//! Best-effort ownership and permission fixups
//!
//! Target libraries are written by the engine as whatever user the consumer
//! runs as; media servers often read them as another. When `[ownership]` is
//! configured, each target root gets a recursive chown (and optional chmod)
//! after reconciliation. Failures are reported to the caller, which logs
//! and moves on; a fixup never fails a run.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use mirrorq_core::OwnershipFixer;
use mirrorq_domain::{MirrorqError, OwnershipConfig, Result};
use tokio::process::Command;
use tracing::debug;

const FIXUP_TIMEOUT: Duration = Duration::from_secs(120);

/// Ownership fixer shelling out to coreutils.
#[derive(Debug, Clone)]
pub struct SubprocessOwnershipFixer {
    config: OwnershipConfig,
    chown: String,
    chmod: String,
}

impl SubprocessOwnershipFixer {
    pub fn new(config: OwnershipConfig) -> Self {
        Self { config, chown: "chown".into(), chmod: "chmod".into() }
    }

    #[cfg(test)]
    fn with_commands(mut self, chown: &str, chmod: &str) -> Self {
        self.chown = chown.to_string();
        self.chmod = chmod.to_string();
        self
    }

    async fn run_tool(&self, tool: &str, spec: &str, root: &Path) -> Result<()> {
        let output = tokio::time::timeout(
            FIXUP_TIMEOUT,
            Command::new(tool).arg("-R").arg(spec).arg(root).output(),
        )
        .await
        .map_err(|_| {
            MirrorqError::Internal(format!("{tool} timed out on {}", root.display()))
        })?
        .map_err(|err| MirrorqError::Internal(format!("failed to run {tool}: {err}")))?;

        if !output.status.success() {
            return Err(MirrorqError::Internal(format!(
                "{tool} exited with {:?} on {}",
                output.status.code(),
                root.display()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl OwnershipFixer for SubprocessOwnershipFixer {
    async fn fix(&self, root: &Path) -> Result<()> {
        debug!(root = %root.display(), owner = %self.config.owner_spec(), "fixing ownership");
        self.run_tool(&self.chown, &self.config.owner_spec(), root).await?;
        if let Some(mode) = &self.config.mode {
            self.run_tool(&self.chmod, mode, root).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OwnershipConfig {
        OwnershipConfig { user: "media".into(), group: Some("media".into()), mode: None }
    }

    #[tokio::test]
    async fn succeeds_when_tools_succeed() {
        let fixer = SubprocessOwnershipFixer::new(config()).with_commands("true", "true");
        fixer.fix(Path::new("/tmp")).await.unwrap();
    }

    #[tokio::test]
    async fn reports_tool_failure() {
        let fixer = SubprocessOwnershipFixer::new(config()).with_commands("false", "true");
        let err = fixer.fix(Path::new("/tmp")).await.unwrap_err();
        assert!(matches!(err, MirrorqError::Internal(_)));
    }

    #[tokio::test]
    async fn chmod_runs_only_when_mode_is_configured() {
        let mut cfg = config();
        cfg.mode = Some("u=rwX,g=rX".into());
        // chown succeeds, chmod fails: the failure must surface.
        let fixer = SubprocessOwnershipFixer::new(cfg).with_commands("true", "false");
        assert!(fixer.fix(Path::new("/tmp")).await.is_err());

        // Without a mode the failing chmod is never invoked.
        let fixer = SubprocessOwnershipFixer::new(config()).with_commands("true", "false");
        fixer.fix(Path::new("/tmp")).await.unwrap();
    }
}
