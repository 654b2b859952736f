//! Raw Monitor: observes plain cgroup v1 containers ("raw" containers) that
//! are not managed by any known runtime.
//!
//! The library resolves a container's directory in every mounted cgroup
//! hierarchy, derives its resource spec, samples its usage, enumerates its
//! subcontainers and reports their creation and deletion as they happen.
pub mod cgroup;
pub mod config;
pub mod container;
pub mod error;
pub mod fsinfo;
pub mod fsutil;
pub mod hints;
pub mod machine;
pub mod mountinfo;
pub mod network;
pub mod raw;

use container::{ListType, SubcontainerEvent};

/// Runs the Raw Monitor application.
///
/// Builds a handler for the configured container, logs its spec and
/// subcontainers, follows subcontainer events and samples stats on every
/// housekeeping tick until Ctrl-C is received.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid environment configuration (e.g., a relative `RAW_CONTAINER_NAME`).
/// - No cgroup v1 hierarchy mounted below the rootfs.
/// - Malformed container hints.
/// - Failure to install the inotify watches.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;
    log::debug!("Final rootfs: {}", config.rootfs.display());

    let factory = raw::RawFactory::from_config(&config)?;
    for mount in factory.subsystems().mounts() {
        log::debug!(
            "Cgroup hierarchy at {} ({})",
            mount.mount_point.display(),
            mount.subsystems.join(",")
        );
    }

    let mut handler = factory.new_handler(config.container_name.clone());
    if !handler.exists() {
        log::warn!(
            "Container `{}` has no directory in any cgroup hierarchy",
            handler.container_reference()
        );
    }

    let spec = handler.spec()?;
    log::info!(
        "Spec of `{}`: {}",
        handler.container_reference(),
        serde_json::to_string(&spec)?
    );

    for child in handler.list_containers(ListType::Recursive)? {
        log::info!("Found subcontainer `{child}`");
    }

    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel::<SubcontainerEvent>(64);
    handler.watch_subcontainers(events_tx).await?;
    log::debug!(
        "Started watching subcontainers of `{}`",
        handler.container_reference()
    );
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => log::info!("Subcontainer event: {json}"),
                Err(err) => log::error!("failed to serialize subcontainer event: {}", err),
            }
        }
    });

    let mut interval = tokio::time::interval(config.housekeeping_interval);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    log::error!("failed to listen for Ctrl-C: {}", err);
                }
                break;
            }
        }

        let before = std::time::Instant::now();
        let sample = tokio::task::block_in_place(|| handler.stats());
        log::trace!("stats() took {} nanoseconds", before.elapsed().as_nanos());
        match sample {
            Ok(stats) => match serde_json::to_string(&stats) {
                Ok(json) => log::debug!("Stats of `{}`: {json}", handler.container_reference()),
                Err(err) => log::error!("failed to serialize stats: {}", err),
            },
            Err(err) => {
                log::error!("failed to collect stats: {}", error::error_chain(&err))
            }
        }
    }

    handler.stop_watching_subcontainers().await?;
    log::debug!("Stopped watching subcontainers");
    Ok(())
}
