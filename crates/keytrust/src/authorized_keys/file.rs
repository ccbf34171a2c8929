/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Materialisation of the `authorized_keys` and `authorized_principals`
//! files from the key store.

use super::stanza::{authorized_string, MARKER};
use crate::audit;
use crate::config::{AppConfig, SshConfig};
use crate::dal::{KeyStore, KeyStoreExt};
use crate::error::{KeyError, ResultExt};
use crate::models::PublicKey;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Serialises every write to either file within the process.
static FILE_LOCK: Mutex<()> = parking_lot::const_mutex(());

#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Which of the two managed files an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManagedFile {
    Keys,
    Principals,
}

/// Writes stored SSH keys to the files read by the system SSH server.
#[derive(Debug, Clone)]
pub struct AuthorizedKeysWriter {
    ssh: SshConfig,
    app: AppConfig,
}

impl AuthorizedKeysWriter {
    pub fn new(ssh: SshConfig, app: AppConfig) -> Self {
        Self { ssh, app }
    }

    fn enabled(&self, file: ManagedFile) -> bool {
        if self.ssh.start_builtin_server {
            return false;
        }
        match file {
            ManagedFile::Keys => self.ssh.create_authorized_keys_file,
            ManagedFile::Principals => self.ssh.create_authorized_principals_file,
        }
    }

    fn path(&self, file: ManagedFile) -> PathBuf {
        match file {
            ManagedFile::Keys => self.ssh.keys_file(),
            ManagedFile::Principals => self.ssh.principals_file(),
        }
    }

    /// The stanza written for `key`.
    pub fn authorized_string(&self, key: &PublicKey) -> String {
        authorized_string(&self.ssh.authorized_keys_command_template, &self.app, key)
    }

    /// Append stanzas for newly added keys to `authorized_keys`.
    ///
    /// Must be called after the keys are committed and outside any store
    /// transaction. Keys deleted in the meantime are skipped.
    pub fn append_public_keys(
        &self,
        store: &dyn KeyStore,
        keys: &[PublicKey],
    ) -> Result<(), KeyError> {
        if !self.enabled(ManagedFile::Keys) || keys.is_empty() {
            return Ok(());
        }

        let _guard = FILE_LOCK.lock();
        let keys = store.read(|q| {
            let mut live = Vec::with_capacity(keys.len());
            for key in keys {
                if q.public_key_by_id(key.id)?.is_some() {
                    live.push(key);
                }
            }
            Ok(live)
        })?;
        if keys.is_empty() {
            return Ok(());
        }
        self.ensure_root()?;

        let path = self.path(ManagedFile::Keys);
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FILE_MODE);
        }
        let mut file = options
            .open(&path)
            .map_err(KeyError::from)
            .with_context(|| format!("opening {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = file.metadata()?.permissions();
            let mode = permissions.mode() & 0o777;
            if mode & !FILE_MODE != 0 {
                tracing::warn!(
                    "{} has unusual permission flags {:o}, setting to {:o}",
                    path.display(),
                    mode,
                    FILE_MODE
                );
                permissions.set_mode(FILE_MODE);
                file.set_permissions(permissions)?;
            }
        }

        for key in keys {
            file.write_all(self.authorized_string(key).as_bytes())?;
        }
        file.sync_all()?;
        Ok(())
    }

    /// Regenerate `authorized_keys` from every non-principal key.
    pub fn rewrite_all_public_keys(&self, store: &dyn KeyStore) -> Result<(), KeyError> {
        self.rewrite(store, ManagedFile::Keys)
    }

    /// Regenerate `authorized_principals` from every principal key.
    pub fn rewrite_all_principal_keys(&self, store: &dyn KeyStore) -> Result<(), KeyError> {
        self.rewrite(store, ManagedFile::Principals)
    }

    fn rewrite(&self, store: &dyn KeyStore, file: ManagedFile) -> Result<(), KeyError> {
        if !self.enabled(file) {
            return Ok(());
        }

        // The snapshot is taken under the lock so rewrites land in store order.
        let _guard = FILE_LOCK.lock();
        let principals = file == ManagedFile::Principals;
        let keys = store.read(|q| q.authorized_public_keys(principals))?;

        self.ensure_root()?;
        let path = self.path(file);
        let dir = path
            .parent()
            .ok_or_else(|| KeyError::Io(std::io::Error::other("authorized keys path has no parent")))?;

        let mut temp = NamedTempFile::new_in(dir)
            .map_err(KeyError::from)
            .with_context(|| format!("creating temporary file in {}", dir.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp.as_file()
                .set_permissions(fs::Permissions::from_mode(FILE_MODE))?;
        }

        if self.ssh.authorized_keys_backup && path.exists() {
            let backup = backup_path(&path);
            fs::copy(&path, &backup)
                .map_err(KeyError::from)
                .with_context(|| format!("backing up {}", path.display()))?;
            tracing::debug!("Backed up {} to {}", path.display(), backup.display());
        }

        for key in &keys {
            temp.write_all(self.authorized_string(key).as_bytes())?;
        }
        copy_foreign_lines(&path, temp.as_file_mut())?;

        temp.as_file().sync_all()?;
        temp.persist(&path)
            .map_err(|e| KeyError::Io(e.error))
            .with_context(|| format!("replacing {}", path.display()))?;

        audit::log_authorized_file_rewritten(principals, &path.display().to_string(), keys.len());
        Ok(())
    }

    fn ensure_root(&self) -> Result<(), KeyError> {
        let root = &self.ssh.root_path;
        if root.as_os_str().is_empty() || root.exists() {
            return Ok(());
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(root).map_err(|e| {
            tracing::error!("Unable to create {}: {}", root.display(), e);
            KeyError::from(e)
        })
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!("_{}.gitea_bak", chrono::Utc::now().timestamp()));
    PathBuf::from(name)
}

/// Copy every line of `path` that is not part of one of our stanzas.
fn copy_foreign_lines(path: &Path, out: &mut fs::File) -> Result<(), KeyError> {
    let existing = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let mut lines = BufReader::new(existing).lines();
    while let Some(line) = lines.next() {
        let line = line?;
        if line.starts_with(MARKER) {
            // Drop the key entry that follows the marker.
            lines.next().transpose()?;
            continue;
        }
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
    }
    Ok(())
}
