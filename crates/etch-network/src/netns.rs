//! Network namespace execution contexts.
//!
//! A network namespace is a per-thread attribute. Work that must see the
//! host's interfaces runs on a dedicated OS thread that switches into the
//! target namespace, drives its own single-threaded runtime, and switches
//! back before it exits. Nothing else is ever scheduled on that thread, so no
//! unrelated task can observe the foreign namespace.

use std::fs::File;
use std::future::Future;
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};

use etch_common::{EtchError, EtchResult};
use rustix::thread::{LinkNameSpaceType, move_into_link_name_space};

/// Namespace file of the calling thread.
const THREAD_NETNS: &str = "/proc/thread-self/ns/net";

/// Holds the thread's original namespace and restores it on drop.
struct NetnsGuard {
    original: File,
    target: PathBuf,
}

impl NetnsGuard {
    /// Switch the current thread into the namespace at `target`.
    fn enter(target: &Path) -> EtchResult<Self> {
        let original = File::open(THREAD_NETNS).map_err(|e| EtchError::Namespace {
            path: PathBuf::from(THREAD_NETNS),
            source: e,
        })?;
        let namespace = File::open(target).map_err(|e| EtchError::Namespace {
            path: target.to_path_buf(),
            source: e,
        })?;

        move_into_link_name_space(namespace.as_fd(), Some(LinkNameSpaceType::Network)).map_err(
            |e| EtchError::Namespace {
                path: target.to_path_buf(),
                source: e.into(),
            },
        )?;

        tracing::debug!(netns = %target.display(), "Entered network namespace");

        Ok(Self {
            original,
            target: target.to_path_buf(),
        })
    }
}

impl Drop for NetnsGuard {
    fn drop(&mut self) {
        match move_into_link_name_space(self.original.as_fd(), Some(LinkNameSpaceType::Network)) {
            Ok(()) => {
                tracing::debug!(netns = %self.target.display(), "Left network namespace");
            }
            Err(e) => {
                // The thread is discarded right after this, so the wrong
                // namespace cannot leak into other work.
                tracing::warn!(
                    netns = %self.target.display(),
                    error = %e,
                    "Failed to restore original network namespace"
                );
            }
        }
    }
}

/// Run `task` inside the network namespace at `netns`.
///
/// The future returned by `task` is created and polled on a dedicated OS
/// thread with a current-thread runtime, so it does not need to be `Send`.
/// The original namespace is restored on every exit path, including panics,
/// before the thread terminates.
///
/// # Errors
///
/// Returns [`EtchError::Namespace`] if the namespace cannot be entered, or
/// whatever error `task` produces.
pub async fn run_in_netns<F, Fut, T>(netns: impl Into<PathBuf>, task: F) -> EtchResult<T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = EtchResult<T>>,
    T: Send + 'static,
{
    let netns = netns.into();
    let (tx, rx) = tokio::sync::oneshot::channel();

    std::thread::Builder::new()
        .name("etch-netns".to_string())
        .spawn(move || {
            let result = enter_and_run(&netns, task);
            let _ = tx.send(result);
        })
        .map_err(|e| EtchError::Internal {
            message: format!("Failed to spawn namespace worker: {e}"),
        })?;

    rx.await.map_err(|_| EtchError::Internal {
        message: "Namespace worker exited without a result".to_string(),
    })?
}

fn enter_and_run<F, Fut, T>(netns: &Path, task: F) -> EtchResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = EtchResult<T>>,
{
    let _guard = NetnsGuard::enter(netns)?;

    // Declared after the guard so sockets close before the namespace is restored.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(task())
}
