// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the event bridge against the in-process hub.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tellstick_bridge::bridge::{BridgeConfig, EventBridge, HandleTable, SnapshotEntry, translator};
use tellstick_bridge::event::{Event, OverflowPolicy};
use tellstick_bridge::hub::{CallbackToken, DeviceArgs, MemoryDevice, MemoryHub, RawCallback};
use tellstick_bridge::types::{EventClass, LastCommand, Method, SensorDataType};
use tellstick_bridge::{BridgeState, Device, Error, HubErrorKind};

fn lamp_and_dimmer() -> Arc<MemoryHub> {
    Arc::new(MemoryHub::with_devices([
        MemoryDevice::new(1, "Lamp", Method::TurnOn | Method::TurnOff)
            .with_last_command(LastCommand::TurnOn, ""),
        MemoryDevice::new(2, "Dimmer", Method::TurnOn | Method::TurnOff | Method::Dim)
            .with_last_command(LastCommand::Dim, "128"),
    ]))
}

fn started(hub: &Arc<MemoryHub>, config: BridgeConfig) -> EventBridge<Arc<MemoryHub>> {
    let bridge = EventBridge::new(Arc::clone(hub), config);
    bridge.start().unwrap();
    bridge
}

// ============================================================================
// Registration
// ============================================================================

mod registration {
    use super::*;

    #[test]
    fn at_most_one_live_handle_per_class() {
        let table = HandleTable::new();
        for class in EventClass::ALL {
            table.put(class, CallbackToken::new(1)).unwrap();
            assert!(matches!(
                table.put(class, CallbackToken::new(2)),
                Err(Error::DuplicateRegistration { class: c }) if c == class
            ));
        }
        assert_eq!(table.len(), 4);

        table.take(EventClass::Sensor).unwrap();
        table.put(EventClass::Sensor, CallbackToken::new(3)).unwrap();
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn started_bridge_holds_one_registration_per_class() {
        let hub = lamp_and_dimmer();
        let bridge = started(&hub, BridgeConfig::default());

        assert_eq!(hub.callback_count(), 4);
        assert_eq!(bridge.handles().len(), 4);
        assert!(matches!(bridge.start(), Err(Error::AlreadyStarted)));
        assert_eq!(hub.callback_count(), 4);
    }
}

// ============================================================================
// Stop
// ============================================================================

mod stop {
    use super::*;

    #[test]
    fn stop_twice_has_no_further_effect() {
        let hub = lamp_and_dimmer();
        let bridge = started(&hub, BridgeConfig::default());

        bridge.stop().unwrap();
        let closes = hub.close_count();
        bridge.stop().unwrap();

        assert_eq!(bridge.state(), BridgeState::Stopped);
        assert_eq!(hub.close_count(), closes);
        assert_eq!(hub.callback_count(), 0);
    }

    #[test]
    fn no_delivery_after_stop() {
        let hub = lamp_and_dimmer();
        hub.deliver_after_unregister(true);
        let bridge = EventBridge::new(Arc::clone(&hub), BridgeConfig::default());
        let mut events = bridge.events().unwrap();
        bridge.start().unwrap();

        hub.fire_device(1, 1, "");
        bridge.stop().unwrap();

        hub.fire_device(1, 2, "");
        hub.fire_sensor("fineoffset", "temperature", 135, 1, "21.5", 0);
        hub.fire_device_change(3, 1, 0);
        hub.fire_raw("class:command;", 1);

        let received: Vec<Event> = events.by_ref().collect();
        assert_eq!(
            received,
            vec![Event::Device {
                device_id: 1,
                method: Method::TurnOn.into(),
                data: String::new(),
            }]
        );
        assert!(events.is_closed());
    }

    #[tokio::test]
    async fn async_stream_ends_after_stop() {
        let hub = lamp_and_dimmer();
        let bridge = EventBridge::new(Arc::clone(&hub), BridgeConfig::default());
        let mut events = bridge.events().unwrap();
        bridge.start().unwrap();

        let consumer = tokio::spawn(async move {
            let mut count = 0;
            while events.recv().await.is_some() {
                count += 1;
            }
            count
        });

        hub.fire_raw("class:command;protocol:arctech;", 1);
        hub.fire_raw("class:command;protocol:sartano;", 1);
        bridge.stop().unwrap();

        assert_eq!(consumer.await.unwrap(), 2);
    }
}

// ============================================================================
// Snapshot
// ============================================================================

mod snapshot {
    use super::*;

    #[test]
    fn lamp_and_dimmer_scenario() {
        let hub = lamp_and_dimmer();
        let bridge = started(&hub, BridgeConfig::default());

        let snapshot = bridge.snapshot().unwrap();
        assert_eq!(
            snapshot.entries(),
            &[
                SnapshotEntry::Device(Device {
                    id: 1,
                    name: "Lamp".to_string(),
                    supported_methods: Method::TurnOn | Method::TurnOff,
                    last_command: LastCommand::TurnOn,
                    last_value: String::new(),
                }),
                SnapshotEntry::Device(Device {
                    id: 2,
                    name: "Dimmer".to_string(),
                    supported_methods: Method::TurnOn | Method::TurnOff | Method::Dim,
                    last_command: LastCommand::Dim,
                    last_value: "128".to_string(),
                }),
            ]
        );
    }

    #[test]
    fn n_devices_give_n_entries() {
        let hub = Arc::new(MemoryHub::with_devices(
            (1..=5).map(|id| MemoryDevice::new(id, format!("Device {id}"), Method::TurnOn.into())),
        ));
        let bridge = started(&hub, BridgeConfig::default());

        let snapshot = bridge.snapshot().unwrap();
        assert_eq!(snapshot.len(), 5);
        assert_eq!(snapshot.unavailable().count(), 0);
    }

    #[test]
    fn vanished_device_keeps_its_position() {
        let hub = Arc::new(MemoryHub::with_devices(
            (1..=4).map(|id| MemoryDevice::new(id, format!("Device {id}"), Method::TurnOn.into())),
        ));
        let bridge = started(&hub, BridgeConfig::default());
        hub.vanish_after_count(2);

        let snapshot = bridge.snapshot().unwrap();
        assert_eq!(snapshot.len(), 4);
        assert_eq!(
            snapshot.entries()[2],
            SnapshotEntry::Unavailable { index: 2, id: None }
        );
        let ids: Vec<i32> = snapshot.devices().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 4]);

        // The next snapshot sees the hub without the device.
        assert_eq!(bridge.snapshot().unwrap().len(), 3);
    }

    #[test]
    fn lost_connection_mid_snapshot_is_an_error() {
        let hub = Arc::new(MemoryHub::with_devices(
            (1..=3).map(|id| MemoryDevice::new(id, format!("Device {id}"), Method::TurnOn.into())),
        ));
        let bridge = started(&hub, BridgeConfig::default());

        hub.fail_device_queries_with(2, HubErrorKind::BrokenPipe);
        assert!(matches!(
            bridge.snapshot(),
            Err(Error::Hub(e)) if e.kind == HubErrorKind::BrokenPipe
        ));

        hub.fail_device_queries_with(2, HubErrorKind::DeviceNotFound);
        let snapshot = bridge.snapshot().unwrap();
        assert_eq!(
            snapshot.entries()[1],
            SnapshotEntry::Unavailable { index: 1, id: Some(2) }
        );
        assert_eq!(bridge.state(), BridgeState::Running);
    }

    #[test]
    fn snapshot_after_stop_is_invalid() {
        let hub = lamp_and_dimmer();
        let bridge = started(&hub, BridgeConfig::default());
        bridge.stop().unwrap();
        assert!(matches!(
            bridge.snapshot(),
            Err(Error::InvalidState {
                state: BridgeState::Stopped,
                ..
            })
        ));
    }
}

// ============================================================================
// Events
// ============================================================================

mod events {
    use super::*;

    #[test]
    fn translation_is_deterministic() {
        let raw = RawCallback::Device(DeviceArgs {
            device_id: 4,
            method: 16,
            data: "77",
            callback_id: 9,
        });
        let first = translator::translate(&raw);
        for _ in 0..10 {
            assert_eq!(translator::translate(&raw), first);
        }
    }

    #[test]
    fn device_event_is_delivered_before_later_events() {
        let hub = lamp_and_dimmer();
        let bridge = EventBridge::new(Arc::clone(&hub), BridgeConfig::default());
        let mut events = bridge.events().unwrap();
        bridge.start().unwrap();

        hub.fire_device(1, Method::TurnOff.bit().cast_signed(), "");
        hub.fire_sensor("mandolyn", "temperaturehumidity", 11, 2, "40", 1_700_000_000);
        hub.fire_device(2, Method::TurnOn.bit().cast_signed(), "");

        assert_eq!(
            events.try_recv(),
            Some(Event::Device {
                device_id: 1,
                method: Method::TurnOff.into(),
                data: String::new(),
            })
        );
        assert!(matches!(
            events.try_recv(),
            Some(Event::Sensor {
                device_id: 11,
                data_type: SensorDataType::Humidity,
                ..
            })
        ));
        assert_eq!(events.try_recv().and_then(|e| e.device_id()), Some(2));
        assert!(events.try_recv().is_none());
    }

    #[test]
    fn drop_oldest_keeps_most_recent_capacity_events() {
        let capacity = 8;
        let hub = lamp_and_dimmer();
        let config = BridgeConfig::default()
            .with_queue_capacity(capacity)
            .unwrap()
            .with_overflow_all(OverflowPolicy::DropOldest);
        let bridge = EventBridge::new(Arc::clone(&hub), config);
        let mut events = bridge.events().unwrap();
        bridge.start().unwrap();

        for n in 0..capacity + 5 {
            hub.fire_raw(&format!("seq:{n};"), 1);
        }

        let retained: Vec<String> = events
            .drain()
            .into_iter()
            .map(|e| match e {
                Event::RawDevice { raw_data, .. } => raw_data,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        let expected: Vec<String> = (5..capacity + 5).map(|n| format!("seq:{n};")).collect();
        assert_eq!(retained, expected);
        assert_eq!(bridge.dropped_events(EventClass::RawDevice), 5);
    }

    #[test]
    fn drop_newest_keeps_first_events() {
        let hub = lamp_and_dimmer();
        let config = BridgeConfig::default()
            .with_queue_capacity(2)
            .unwrap()
            .with_overflow(EventClass::Sensor, OverflowPolicy::DropNewest);
        let bridge = EventBridge::new(Arc::clone(&hub), config);
        let mut events = bridge.events().unwrap();
        bridge.start().unwrap();

        for value in ["1", "2", "3"] {
            hub.fire_sensor("fineoffset", "temperature", 135, 1, value, 0);
        }

        let values: Vec<Option<f64>> = events.drain().iter().map(Event::sensor_value).collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0)]);
        assert_eq!(bridge.dropped_events(EventClass::Sensor), 1);
    }

    #[test]
    fn concurrent_callbacks_keep_per_source_order() {
        let hub = lamp_and_dimmer();
        let config = BridgeConfig::default().with_queue_capacity(4096).unwrap();
        let bridge = EventBridge::new(Arc::clone(&hub), config);
        let mut events = bridge.events().unwrap();
        bridge.start().unwrap();

        let producers: Vec<_> = (0..4)
            .map(|source| {
                let hub = Arc::clone(&hub);
                thread::spawn(move || {
                    for n in 0..250 {
                        if source % 2 == 0 {
                            hub.fire_device(source, 16, &n.to_string());
                        } else {
                            hub.fire_sensor("p", "m", source, 1, &n.to_string(), 0);
                        }
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        let received = events.drain();
        assert_eq!(received.len(), 1000);
        for source in 0..4 {
            let sequence: Vec<u32> = received
                .iter()
                .filter(|e| e.device_id() == Some(source))
                .map(|e| match e {
                    Event::Device { data, .. } => data.parse().unwrap(),
                    Event::Sensor { value, .. } => value.parse().unwrap(),
                    other => panic!("unexpected event {other:?}"),
                })
                .collect();
            assert_eq!(sequence, (0..250).collect::<Vec<u32>>());
        }
    }

    #[test]
    fn blocking_consumer_thread() {
        let hub = lamp_and_dimmer();
        let bridge = EventBridge::new(Arc::clone(&hub), BridgeConfig::default());
        let events = bridge.events().unwrap();
        bridge.start().unwrap();

        let consumer = thread::spawn(move || events.take(3).count());

        thread::sleep(Duration::from_millis(10));
        hub.fire_device_change(5, 1, 0);
        hub.fire_device_change(5, 2, 1);
        hub.fire_device_change(5, 3, 0);

        assert_eq!(consumer.join().unwrap(), 3);
    }
}

// ============================================================================
// Commands
// ============================================================================

mod commands {
    use super::*;

    #[test]
    fn toggle_round_trip_updates_snapshot() {
        let hub = lamp_and_dimmer();
        let bridge = started(&hub, BridgeConfig::default());

        assert_eq!(bridge.toggle(1).unwrap(), Method::TurnOff);
        assert_eq!(bridge.toggle(2).unwrap(), Method::TurnOff);

        let snapshot = bridge.snapshot().unwrap();
        assert!(!snapshot.get(1).unwrap().state().on);
        assert!(!snapshot.get(2).unwrap().state().on);
    }

    #[test]
    fn unsupported_command_is_a_hub_error() {
        let hub = lamp_and_dimmer();
        let bridge = started(&hub, BridgeConfig::default());

        let err = bridge
            .dim(1, tellstick_bridge::types::DimLevel::new(10))
            .unwrap_err();
        assert!(matches!(err, Error::Hub(_)));
        assert!(hub.is_connected());
    }
}

// ============================================================================
// Sensor readings
// ============================================================================

mod readings {
    use super::*;
    use tellstick_bridge::readings::SensorReadings;

    #[test]
    fn latest_reading_per_sensor_and_type() {
        let hub = lamp_and_dimmer();
        let bridge = EventBridge::new(Arc::clone(&hub), BridgeConfig::default());
        let events = bridge.events().unwrap();
        bridge.start().unwrap();

        hub.fire_sensor("fineoffset", "temperaturehumidity", 135, 1, "21.5", 100);
        hub.fire_sensor("fineoffset", "temperaturehumidity", 135, 2, "48", 100);
        hub.fire_sensor("fineoffset", "temperaturehumidity", 135, 1, "21.5", 160);
        hub.fire_sensor("fineoffset", "temperaturehumidity", 135, 1, "22.1", 220);
        bridge.stop().unwrap();

        let readings = SensorReadings::new();
        let changes = events.filter(|event| readings.observe(event)).count();

        assert_eq!(changes, 3);
        let temperature = readings.get(135, SensorDataType::Temperature).unwrap();
        assert_eq!(temperature.numeric(), Some(22.1));
        assert_eq!(temperature.timestamp, 220);
        assert_eq!(
            readings.get(135, SensorDataType::Humidity).unwrap().value,
            "48"
        );
    }
}
