//! Runtime utilities that abstract over the underlying async executor.
//!
//! Downstream crates never build a Tokio runtime themselves; hosts that are
//! not async (CLI shims, FFI entry points) use [`block_on`].

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh current-thread runtime.
///
/// Returns an error instead of panicking when the runtime cannot be built
/// (for example when the process has exhausted its file descriptors).
pub fn block_on<F>(future: F) -> std::io::Result<F::Output>
where
    F: std::future::Future,
{
    let runtime = Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}

/// Returns `true` when called from inside a running runtime.
pub fn in_runtime() -> bool {
    Handle::try_current().is_ok()
}
