use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Guard ensuring a single tracker writes into a data directory
///
/// Two trackers sharing a data directory would interleave journal lines and race
/// on the CSV reports. The lock is an advisory `flock` on `<dir>/<name>.lock`,
/// released when the guard is dropped.
pub struct InstanceLock {
    lock_file: File,
    lock_path: PathBuf,
}

impl InstanceLock {
    pub fn acquire(dir: &Path, name: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create lock directory {:?}", dir))?;
        let lock_path = Self::lock_path(dir, name);

        // No truncate: the holder's PID must stay readable until the lock is won
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {:?}", lock_path))?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            let result = unsafe { libc::flock(lock_file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
            if result != 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::WouldBlock {
                    let holder = Self::holder_pid(dir, name)
                        .map(|pid| format!(" (PID {})", pid))
                        .unwrap_or_default();
                    anyhow::bail!(
                        "Another fencewatch instance is already using {}{}",
                        dir.display(),
                        holder
                    );
                }
                return Err(err).context("Failed to acquire lock");
            }
        }

        let pid = std::process::id();
        lock_file.set_len(0).context("Failed to truncate lock file")?;
        let mut writer = lock_file
            .try_clone()
            .context("Failed to clone file handle")?;
        writeln!(writer, "{}", pid).context("Failed to write PID to lock file")?;

        info!("Acquired instance lock at {}", lock_path.display());
        debug!("Process ID: {}", pid);

        Ok(Self {
            lock_file,
            lock_path,
        })
    }

    fn lock_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.lock", name))
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }

    /// PID recorded by the current or last holder, if any
    pub fn holder_pid(dir: &Path, name: &str) -> Option<u32> {
        std::fs::read_to_string(Self::lock_path(dir, name))
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            unsafe {
                libc::flock(self.lock_file.as_raw_fd(), libc::LOCK_UN);
            }
        }

        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            eprintln!("Failed to remove lock file: {}", e);
        } else {
            debug!("Released instance lock at {}", self.lock_path.display());
        }
    }
}
