// SPDX-License-Identifier: MPL-2.0

//! Demo program: run the event bridge against a simulated hub.
//!
//! A background thread plays the hub's dispatch thread, firing sensor
//! readings, device commands and raw frames. The main task prints the
//! typed events, a device snapshot and any sensor liveness alerts.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=tellstick_bridge=debug cargo run --example simulated_hub
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tellstick_bridge::bridge::{BridgeConfig, EventBridge, SnapshotEntry};
use tellstick_bridge::event::{Event, OverflowPolicy, RawDeviceFrame};
use tellstick_bridge::hub::{MemoryDevice, MemoryHub};
use tellstick_bridge::monitor::{SensorMonitor, SensorMonitorConfig};
use tellstick_bridge::readings::SensorReadings;
use tellstick_bridge::types::{DimLevel, EventClass, LastCommand, Method};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let hub = Arc::new(MemoryHub::with_devices([
        MemoryDevice::new(1, "Hallway lamp", Method::TurnOn | Method::TurnOff)
            .with_last_command(LastCommand::TurnOn, ""),
        MemoryDevice::new(2, "Living room dimmer", Method::TurnOn | Method::TurnOff | Method::Dim)
            .with_last_command(LastCommand::Dim, "128"),
        MemoryDevice::new(3, "Door bell", Method::Bell.into()),
    ]));

    let config = BridgeConfig::default()
        .with_queue_capacity(64)?
        .with_overflow(EventClass::RawDevice, OverflowPolicy::DropNewest);
    let bridge = EventBridge::new(Arc::clone(&hub), config);
    let mut events = bridge.events()?;
    bridge.start()?;

    println!("Devices:");
    for entry in &bridge.snapshot()? {
        match entry {
            SnapshotEntry::Device(device) => {
                let state = device.state();
                println!(
                    "  {:>3} {:<20} [{}] on={} level={}",
                    device.id,
                    device.name,
                    device.supported_methods,
                    state.on,
                    state.level
                );
            }
            SnapshotEntry::Unavailable { index, id } => {
                println!("  index {index} unavailable (id {id:?})");
            }
        }
    }

    let monitor = Arc::new(SensorMonitor::new(
        SensorMonitorConfig::default()
            .with_check_interval(Duration::from_millis(200))?
            .with_max_silence(Duration::from_millis(300))
            .with_sensors([135, 136]),
    ));
    let mut alerts = monitor.subscribe();
    let monitor_task = monitor.spawn();
    let readings = SensorReadings::new();

    let dispatch = {
        let hub = Arc::clone(&hub);
        thread::spawn(move || {
            hub.fire_sensor("fineoffset", "temperaturehumidity", 135, 1, "21.5", 1_700_000_000);
            hub.fire_sensor("fineoffset", "temperaturehumidity", 136, 2, "48", 1_700_000_000);
            hub.fire_raw(
                "class:command;protocol:arctech;model:selflearning;house:1234;unit:1;method:turnon;",
                0,
            );
            thread::sleep(Duration::from_millis(100));
            hub.fire_sensor("fineoffset", "temperaturehumidity", 135, 1, "21.7", 1_700_000_060);
            hub.fire_device_change(4, 1, 0);
        })
    };

    bridge.dim(2, DimLevel::new(200))?;
    let toggled = bridge.toggle(1)?;
    println!("Toggled device 1 with {toggled}");

    let deadline = tokio::time::sleep(Duration::from_millis(800));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            () = &mut deadline => break,
            Some(event) = events.recv() => {
                monitor.observe(&event);
                if readings.observe(&event) || !matches!(event, Event::Sensor { .. }) {
                    print_event(&event);
                }
                if event.requires_snapshot() {
                    println!("  device list changed, {} devices now", bridge.snapshot()?.len());
                }
            }
            Ok(alert) = alerts.recv() => {
                println!("ALERT: sensor {} silent for {:?}", alert.id, alert.silence);
            }
        }
    }

    dispatch.join().map_err(|_| "dispatch thread panicked")?;

    println!("Latest sensor readings:");
    for id in readings.sensor_ids() {
        for (data_type, reading) in readings.sensor(id) {
            println!("  {id:>3} {data_type:?} = {}", reading.value);
        }
    }
    monitor_task.shutdown();
    bridge.stop()?;

    println!(
        "Dropped raw frames: {}",
        bridge.dropped_events(EventClass::RawDevice)
    );
    Ok(())
}

fn print_event(event: &Event) {
    match event {
        Event::Sensor {
            device_id,
            data_type,
            value,
            ..
        } => {
            let unit = data_type.unit().unwrap_or("");
            println!("Sensor {device_id}: {data_type:?} = {value}{unit}");
        }
        Event::Device {
            device_id,
            method,
            data,
        } => println!("Device {device_id}: {method} {data}"),
        Event::DeviceChange {
            device_id,
            change_event,
            change_type,
        } => println!("Device {device_id} {change_event} ({change_type:?})"),
        Event::RawDevice { raw_data, .. } => {
            let frame = RawDeviceFrame::parse(raw_data);
            println!(
                "Raw frame: protocol={} method={}",
                frame.get("protocol").unwrap_or("?"),
                frame.get("method").unwrap_or("?")
            );
        }
    }
}
