//! Subcommand execution
//!
//! Every command prints its result as JSON on stdout. A refused or canceled
//! action prints `null` and still exits successfully; backend failures exit
//! non-zero.

use anyhow::Context;
use capgate::{AssetSync, Gate, GateConfig, GatePresets, MemoryAssetStore, SyncOptions};
use serde::Serialize;
use std::io::Read;
use std::sync::Arc;

use crate::cli::{Cli, Command, PickArgs};
use crate::device::{Device, DeviceProfile};

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => GateConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => GateConfig::default(),
    };

    let mut profile = match &cli.device {
        Some(path) => DeviceProfile::load(path)?,
        None => DeviceProfile::default(),
    };
    profile.apply_overrides(&cli.statuses);
    if let Some(dir) = cli.library {
        profile.library_dir = Some(dir);
    }

    let device = Device::from_profile(&profile, &config)?;
    let store = Arc::new(MemoryAssetStore::new());
    let gate = GatePresets::interactive(Arc::clone(&device.permissions), config)
        .library(device.library.clone())
        .picker(device.picker.clone())
        .location(device.location.clone())
        .store(store.clone())
        .build()?;

    let result = dispatch(&gate, &device, &store, cli.command).await;
    // Recovery dialogs run in the background; let them finish before exit
    gate.settle().await;
    result
}

async fn dispatch(
    gate: &Gate,
    device: &Device,
    store: &MemoryAssetStore,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::SaveUrl { url } => {
            let saved = gate.camera_roll().save_from_url(&url).await?;
            print_json(&saved)
        }
        Command::SavePayload { payload } => {
            let payload = read_payload(payload)?;
            let saved = gate.camera_roll().save_from_payload(&payload).await?;
            print_json(&saved)
        }
        Command::ToBase64 { url } => {
            let encoded = gate.camera_roll().image_to_base64(&url).await?;
            print_json(&encoded)
        }
        Command::Pick(args) => pick(gate, &args).await,
        Command::Locate => {
            let position = gate.geolocation().read_current_location().await?;
            print_json(&position)
        }
        Command::Recents => match gate.media_picker().list_recent_assets().await? {
            Some(_) => print_json(&store.assets()),
            None => print_json(&None::<()>),
        },
        Command::Watch {
            debounce_ms,
            no_initial,
        } => {
            let options = SyncOptions {
                debounce_ms: debounce_ms.or(gate.config().sync.debounce_ms),
                sync_on_start: !no_initial,
            };
            watch(gate, device, store, options).await
        }
    }
}

async fn pick(gate: &Gate, args: &PickArgs) -> anyhow::Result<()> {
    let overrides = args.overrides();
    let picker = gate.image_picker();
    let picked = if args.camera {
        picker.pick_from_camera(Some(&overrides)).await?
    } else {
        picker.pick_from_gallery(Some(&overrides)).await?
    };
    print_json(&picked)
}

async fn watch(
    gate: &Gate,
    device: &Device,
    store: &MemoryAssetStore,
    options: SyncOptions,
) -> anyhow::Result<()> {
    let mut updates = store.subscribe();
    device.library.watch()?;
    let sync = AssetSync::start(gate.media_picker(), options);
    tracing::info!(library = %device.library.root().display(), "Watching library, Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let assets = updates.borrow_and_update().clone();
                print_json(&assets)?;
            }
        }
    }

    sync.shutdown().await;
    device.library.unwatch();
    Ok(())
}

fn read_payload(payload: String) -> anyhow::Result<String> {
    if payload != "-" {
        return Ok(payload);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read payload from stdin")?;
    Ok(buf.trim().to_string())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
