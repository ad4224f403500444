//! The in-memory safe object and its lifecycle operations.

use std::path::PathBuf;

use rand_core::OsRng;

use crate::agent_client::AgentClient;
use crate::buffer::{SensitiveBuffer, METADATA_MAX, PASSWORD_MAX};
use crate::config;
use crate::error::{Error, Result};
use crate::prompt::PasswordPrompt;
use crate::storage;
use crate::workspace;

bitflags::bitflags! {
    pub struct OpenFlags: u32 {
        const CREATE = 0b01;
        const FORCE  = 0b10;
    }
}

/// Everything a safe operation needs: where the workspace lives, the
/// master passphrase buffer (filled lazily via the prompt), an optional
/// agent connection, and the prompt collaborator itself.
pub struct Context<'a> {
    pub workspace_root: PathBuf,
    pub master_password: SensitiveBuffer,
    pub agent: Option<&'a mut dyn AgentClient>,
    pub prompt: &'a mut dyn PasswordPrompt,
}

impl<'a> Context<'a> {
    pub fn new(
        workspace_root: PathBuf,
        agent: Option<&'a mut dyn AgentClient>,
        prompt: &'a mut dyn PasswordPrompt,
    ) -> Self {
        Context { workspace_root, master_password: SensitiveBuffer::new(PASSWORD_MAX), agent, prompt }
    }

    fn ensure_master_password(&mut self, confirm: bool, purpose: &str) -> Result<()> {
        if self.master_password.is_empty() {
            let pw = self.prompt.prompt(confirm, purpose)?;
            self.master_password.set(pw.as_bytes())?;
        }
        Ok(())
    }

    fn kdf_params(&mut self, name: &str) -> (u64, u64) {
        let safe_path = self.workspace_root.join(name);
        let start_dir = safe_path.parent().unwrap_or(&self.workspace_root);
        match config::load(&self.workspace_root, start_dir, self.master_password.payload()) {
            Ok(cfg) => (cfg.opslimit, cfg.memlimit),
            Err(_) => (storage::OPSLIMIT_DEFAULT, storage::MEMLIMIT_DEFAULT),
        }
    }
}

pub struct Safe {
    pub name: String,
    pub is_open: bool,
    pub password: Option<SensitiveBuffer>,
    pub metadata: Option<SensitiveBuffer>,
}

impl Safe {
    pub fn new(name: &str) -> Result<Self> {
        if name.len() >= libc::PATH_MAX as usize {
            return Err(Error::Errno(libc::ENAMETOOLONG));
        }
        Ok(Safe { name: name.to_string(), is_open: false, password: None, metadata: None })
    }

    fn path(&self, ctx: &Context) -> Result<PathBuf> {
        workspace::name_to_path(&ctx.workspace_root, &self.name)
    }

    pub fn open(&mut self, ctx: &mut Context, flags: OpenFlags) -> Result<()> {
        let path = self.path(ctx)?;

        if flags.contains(OpenFlags::CREATE) {
            workspace::ensure_parent_dirs(&path)?;
            if path.exists() {
                return Err(Error::Errno(libc::EEXIST));
            }
            self.password = Some(SensitiveBuffer::new(PASSWORD_MAX));
            self.metadata = Some(SensitiveBuffer::new(METADATA_MAX));
            self.is_open = true;
            return Ok(());
        }

        if !path.exists() {
            return Err(Error::Errno(libc::ENOENT));
        }

        if !flags.contains(OpenFlags::FORCE) {
            if let Some(agent) = ctx.agent.as_deref_mut() {
                match agent.search(&self.name) {
                    Ok(Some(cached)) => {
                        self.password = Some(SensitiveBuffer::from_bytes(PASSWORD_MAX, &cached.password));
                        self.metadata = Some(SensitiveBuffer::from_bytes(METADATA_MAX, &cached.metadata));
                        self.is_open = true;
                        return Ok(());
                    }
                    Ok(None) => {
                        log::debug!("agent has no cached entry for {}, falling back to storage", self.name);
                    }
                    Err(e) => {
                        log::debug!("agent search for {} failed ({}), falling back to storage", self.name, e);
                    }
                }
            }
        }

        ctx.ensure_master_password(false, &self.name)?;
        let (password, metadata) = storage::open(&path, ctx.master_password.payload())?;
        self.password = Some(SensitiveBuffer::from_bytes(PASSWORD_MAX, &password));
        self.metadata = Some(SensitiveBuffer::from_bytes(METADATA_MAX, &metadata));
        self.is_open = true;
        Ok(())
    }

    pub fn save(&mut self, ctx: &mut Context) -> Result<()> {
        if !self.is_open {
            return Err(Error::EInternal);
        }
        ctx.ensure_master_password(true, &self.name)?;

        let password = self.password.as_ref().ok_or(Error::EInternal)?.payload().to_vec();
        let metadata = self.metadata.as_ref().ok_or(Error::EInternal)?.payload().to_vec();

        if let Some(agent) = ctx.agent.as_deref_mut() {
            if let Err(e) = agent.store(&self.name, &password, &metadata, None) {
                log::debug!("best-effort agent refresh for {} failed: {}", self.name, e);
            }
        }

        let (opslimit, memlimit) = ctx.kdf_params(&self.name);
        let path = self.path(ctx)?;
        let mut rng = OsRng;
        storage::save(&path, ctx.master_password.payload(), &password, &metadata, opslimit, memlimit, &mut rng)
    }

    pub fn close(&mut self) {
        self.password = None;
        self.metadata = None;
        self.is_open = false;
    }

    pub fn delete(&mut self, ctx: &mut Context) -> Result<()> {
        if !self.is_open {
            return Err(Error::EInternal);
        }
        if let Some(agent) = ctx.agent.as_deref_mut() {
            match agent.discard(&self.name) {
                Ok(_) | Err(Error::Errno(libc::ENOENT)) => {}
                Err(e) => log::debug!("agent discard for {} failed: {}", self.name, e),
            }
        }
        let path = self.path(ctx)?;
        std::fs::remove_file(path)?;
        Ok(())
    }

    pub fn rename(&mut self, ctx: &mut Context, new_name: &str) -> Result<()> {
        if !self.is_open {
            return Err(Error::EInternal);
        }
        let old_name = self.name.clone();
        let old_path = self.path(ctx)?;
        let new_path = workspace::name_to_path(&ctx.workspace_root, new_name)?;

        if let Some(agent) = ctx.agent.as_deref_mut() {
            let password = self.password.as_ref().ok_or(Error::EInternal)?.payload().to_vec();
            let metadata = self.metadata.as_ref().ok_or(Error::EInternal)?.payload().to_vec();
            match agent.discard(&old_name) {
                Ok(_) | Err(Error::Errno(libc::ENOENT)) => {}
                Err(e) => log::debug!("agent discard for {} during rename failed: {}", old_name, e),
            }
            if let Err(e) = agent.store(new_name, &password, &metadata, None) {
                log::debug!("agent store for {} during rename failed: {}", new_name, e);
            }
        }

        workspace::ensure_parent_dirs(&new_path)?;
        std::fs::rename(&old_path, &new_path)?;
        self.name = new_name.to_string();
        Ok(())
    }

    pub fn store(&mut self, ctx: &mut Context, timeout_seconds: u64) -> Result<()> {
        if !self.is_open {
            return Err(Error::EInternal);
        }
        let agent = ctx.agent.as_deref_mut().ok_or(Error::EInput)?;
        let password = self.password.as_ref().ok_or(Error::EInternal)?.payload().to_vec();
        let metadata = self.metadata.as_ref().ok_or(Error::EInternal)?.payload().to_vec();
        agent.store(&self.name, &password, &metadata, Some(timeout_seconds))
    }
}
