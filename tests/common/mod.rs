pub mod builders;

use std::sync::OnceLock;

use litani::store::StoreRoot;
use tempfile::TempDir;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

static TRACING: OnceLock<()> = OnceLock::new();

/// Install a capturing subscriber once per test binary.
///
/// Output goes through the test writer, so only failing tests print
/// their logs (unless `-- --nocapture`). `RUST_LOG` overrides the
/// default `info` level.
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy();

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// A store root isolated in a scratch directory. Keep the `TempDir`
/// alive for the duration of the test.
pub fn scratch_store() -> (TempDir, StoreRoot) {
    let dir = tempfile::tempdir().expect("creating scratch dir");
    let root = StoreRoot::new(dir.path().join("litani"));
    (dir, root)
}
