// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Two independent managers observing the same light.

mod common;

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use common::{MemoryBroker, SimulatedDevice, discovered_manager, eventually};
use merosync::protocol::namespace;
use merosync::types::RgbColor;
use merosync::{CapabilityKind, DeviceDescriptor, DeviceEvent, LightCommand, UpdateSource};
use serde_json::json;

const BULB: &str = "1909061745158829082648e1e9001122";

fn bulb() -> (SimulatedDevice, DeviceDescriptor) {
    let abilities = [
        namespace::SYSTEM_ALL,
        namespace::CONTROL_TOGGLEX,
        namespace::CONTROL_LIGHT,
    ];
    let device = SimulatedDevice::new(BULB, &abilities);
    let descriptor = DeviceDescriptor::new(BULB, "Desk lamp", "msl120").with_abilities(abilities);
    (device, descriptor)
}

#[tokio::test]
async fn second_manager_sees_color_set_by_first() {
    let broker = MemoryBroker::new();
    let (device, descriptor) = bulb();
    broker.attach(&device);

    let a = discovered_manager(&broker, "app_a", vec![descriptor.clone()]).await;
    let b = discovered_manager(&broker, "app_b", vec![descriptor]).await;
    let mut b_events = b.subscribe();

    let lamp_a = a.device(BULB).unwrap();
    let lamp_b = b.device(BULB).unwrap();

    lamp_a
        .set_light_color(LightCommand::color(RgbColor::GREEN))
        .await
        .unwrap();
    assert_eq!(lamp_a.rgb_color(), Some(RgbColor::GREEN));

    let event = tokio::time::timeout(Duration::from_secs(2), b_events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event,
        DeviceEvent::state_changed(lamp_b.uuid().clone(), CapabilityKind::Light, UpdateSource::Push)
    );
    assert_eq!(lamp_b.rgb_color(), Some(RgbColor::GREEN));

    a.close().await.unwrap();
    b.close().await.unwrap();
}

#[tokio::test]
async fn interleaved_writers_converge_on_last_device_write() {
    let broker = MemoryBroker::new();
    let (device, descriptor) = bulb();
    broker.attach(&device);

    let a = discovered_manager(&broker, "app_a", vec![descriptor.clone()]).await;
    let b = discovered_manager(&broker, "app_b", vec![descriptor]).await;
    let lamp_a = a.device(BULB).unwrap();
    let lamp_b = b.device(BULB).unwrap();

    lamp_a
        .set_light_color(LightCommand::color(RgbColor::RED))
        .await
        .unwrap();
    lamp_b
        .set_light_color(LightCommand::color(RgbColor::BLUE))
        .await
        .unwrap();

    let observer = &lamp_a;
    assert!(eventually(move || async move { observer.rgb_color() == Some(RgbColor::BLUE) }).await);
    assert_eq!(lamp_b.rgb_color(), Some(RgbColor::BLUE));
    assert_eq!(device.rgb(), Some(i64::from(RgbColor::BLUE.to_packed())));

    a.close().await.unwrap();
    b.close().await.unwrap();
}

#[tokio::test]
async fn replayed_push_does_not_roll_back() {
    let broker = MemoryBroker::new();
    let (device, descriptor) = bulb();
    broker.attach(&device);

    let manager = discovered_manager(&broker, "app_replay", vec![descriptor]).await;
    let lamp = manager.device(BULB).unwrap();

    lamp.set_on_off(0, true).await.unwrap();
    assert_eq!(lamp.is_on(0), Some(true));

    // A stale notification from a minute ago.
    let stale = Utc::now() - TimeDelta::minutes(1);
    broker.push_from_at(
        &device,
        namespace::CONTROL_TOGGLEX,
        json!({"togglex": [{"channel": 0, "onoff": 0}]}),
        stale,
    );
    // A fresh one on another channel proves the stale push was routed.
    broker.push_from(
        &device,
        namespace::CONTROL_TOGGLEX,
        json!({"togglex": [{"channel": 1, "onoff": 1}]}),
    );

    let observer = &lamp;
    assert!(eventually(move || async move { observer.is_on(1) == Some(true) }).await);
    assert_eq!(lamp.is_on(0), Some(true));

    manager.close().await.unwrap();
}
