/// Entry point for the Raw Monitor.
///
/// Monitors one raw cgroup container, logging its spec, its subcontainer
/// events and periodic resource usage samples. Logging is configured through
/// `RUST_LOG`.
///
/// # Errors
///
/// Returns an error if initialization fails (e.g., invalid environment
/// variables, no cgroup v1 hierarchy or unreadable container hints).
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug ROOTFS_MOUNT_PATH=/rootfs RAW_CONTAINER_NAME=/docker cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    raw_monitor::run().await
}
