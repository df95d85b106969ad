/// Errors a single Checker tick can raise outside of per-expectation work.
///
/// Per-expectation evaluation failures are logged and skipped rather than
/// returned here (SPEC_FULL.md §7): this type exists for the failures that
/// stop the whole tick, which today is only a Store failure surfaced while
/// listing enabled expectations.
#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    #[error(transparent)]
    Store(#[from] rewire_store::StoreError),
}
