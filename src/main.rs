//! Launchpad - headless load-order session
//!
//! Seeds an in-memory storage from `Launchpad Data/loadorder.yaml`, attaches a
//! store and a launchpad page to it, and prints the rows. With
//! `move <from> <to>` it also performs one reorder through the same path a
//! drag-and-drop takes, and prints the rows again.
//!
//! # Execution Flow
//!
//! 1. Load settings from `Launchpad Data/launchpad.yaml` (+ `LAUNCHPAD_*` env)
//! 2. Initialize logging → logs/launchpad.<date>
//! 3. Create a tokio runtime; a background task logs every storage event
//! 4. Build storage → store → page → reorder coordinator
//! 5. Optionally apply one move
//! 6. Log metrics, tear the page down, shut the runtime down

use anyhow::{Context, Result, bail};
use launchpad::services::MarkupTransform;
use launchpad::{
    APP_NAME, BindingLifecycleManager, ConfigManager, LaunchpadPage, MemoryStorage, Metrics,
    OrderedCollectionStore, ReorderCoordinator, VERSION, ViewItemProjector,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

fn main() -> Result<()> {
    let config_manager = ConfigManager::new("Launchpad Data")?;
    let settings = config_manager.load_settings()?;

    let _log_guard = launchpad::logging::setup_logging_with_console(
        &settings.log_dir,
        APP_NAME,
        settings.debug_mode,
        true,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let requested_move = parse_move(std::env::args().skip(1).collect())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("launchpad-worker")
        .build()?;

    let snapshot = config_manager.load_snapshot()?;
    let storage = Arc::new(MemoryStorage::from_snapshot(
        snapshot,
        settings.broadcast_capacity,
    ));

    // Async consumers see every storage event through the broadcast mirror
    let mut events = storage.subscribe();
    runtime.spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::info!("Storage event: {:?}", event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event listener lagged, skipped {} events", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let metrics = Arc::new(Metrics::new());
    let projector = ViewItemProjector::from_settings(Arc::new(MarkupTransform::new()), &settings);
    let store = OrderedCollectionStore::attach(storage.clone(), projector, metrics.clone());
    let manager = BindingLifecycleManager::from_settings(metrics.clone(), &settings);
    let page = LaunchpadPage::new(store.clone(), manager);
    let coordinator = ReorderCoordinator::new(store.clone(), metrics.clone());

    print_rows(&page);

    if let Some((from, to)) = requested_move {
        let id = store
            .item_at(from)
            .map(|item| item.id().to_string())
            .with_context(|| format!("No addon at row {} of {}", from, store.count()))?;

        coordinator.begin_drag(&id)?;
        let outcome = coordinator.drop_at(Some(to))?;
        println!("\n{:?}\n", outcome);
        print_rows(&page);
    }

    metrics.log_summary();
    let report = page.teardown();
    store.detach();
    tracing::info!("Page torn down: {:?}", report);

    // Dropping the last storage handle closes the event channel
    drop(coordinator);
    drop(page);
    drop(store);
    drop(storage);
    runtime.shutdown_timeout(Duration::from_secs(5));

    tracing::info!("Session complete");
    Ok(())
}

/// `move <from> <to>`, or nothing.
fn parse_move(args: Vec<String>) -> Result<Option<(usize, usize)>> {
    match args.as_slice() {
        [] => Ok(None),
        [command, from, to] if command == "move" => {
            let from = from.parse().with_context(|| format!("Invalid row: {}", from))?;
            let to = to.parse().with_context(|| format!("Invalid row: {}", to))?;
            Ok(Some((from, to)))
        }
        _ => bail!("usage: {} [move <from> <to>]", APP_NAME),
    }
}

fn print_rows(page: &LaunchpadPage) {
    let enabled = if page.addons_enabled().get() { "on" } else { "off" };
    println!("Add-ons ({})", enabled);

    page.section(|section| {
        for (index, row) in section.rows().iter().enumerate() {
            let widgets = row.widgets();
            let mark = if widgets.toggle_active().get() { 'x' } else { ' ' };
            let warning = if widgets.warning_visible().get() { " (!)" } else { "" };
            println!(
                "{:>3} [{}] {}{}  {}",
                index,
                mark,
                widgets.title().get(),
                warning,
                widgets.subtitle().get()
            );
        }
    });
}
