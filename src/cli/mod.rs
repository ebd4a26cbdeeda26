//! CLI command implementations.

pub mod flush;
pub mod inspect;
pub mod page_key;
pub mod reset;
pub mod run;

use crate::config::Config;
use crate::error::Result;
use crate::storage::FileBackend;
use std::future::Future;

/// Open the file backend described by `config`.
///
/// # Errors
///
/// Returns an error if the state directory cannot be created.
pub fn open_store(config: &Config) -> Result<FileBackend> {
    Ok(FileBackend::new(config.storage.path.clone(), &config.storage.key)?
        .with_quota(config.storage.quota_bytes))
}

/// Run an async command on a single-threaded runtime.
///
/// The runtime is shut down without waiting on a pending stdin read.
///
/// # Errors
///
/// Returns an error if the runtime cannot be started, or whatever `fut`
/// returns.
pub fn block_on<T>(fut: impl Future<Output = Result<T>>) -> Result<T> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(fut);
    runtime.shutdown_background();
    result
}
