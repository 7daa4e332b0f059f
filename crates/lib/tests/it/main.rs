/*! Integration tests for servicehub.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - identity: the identity adapter against the in-process provider
 * - session: the session store and its merge rules
 * - guard: route classification and the guard's decision procedure
 * - prompt: the sign-in overlay and the credential form
 * - storage: the durable file store
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("servicehub=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod helpers;
mod identity;
mod prompt;
