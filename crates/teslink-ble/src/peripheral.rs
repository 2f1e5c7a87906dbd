//! btleplug-backed peripheral link and device discovery.

use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::link::{GattLink, WriteCaps, WriteMode};
use crate::uuids::{advertisement_local_name, RX_CHARACTERISTIC_UUID, TX_CHARACTERISTIC_UUID};
use crate::TransportError;

/// How scan results are filtered.
///
/// `VinPrefixPromptFilter` defers final device selection to a UI layer; once
/// a device has been chosen the transport treats it exactly like
/// `VinPrefixValidation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    #[default]
    VinPrefixValidation,
    VinPrefixPromptFilter,
    Unfiltered,
}

/// A connected btleplug peripheral exposing the vehicle service.
pub struct BlePeripheralLink {
    peripheral: Peripheral,
    tx_characteristic: Characteristic,
    rx_characteristic: Characteristic,
    caps: WriteCaps,
    name: String,
    chunks: Option<mpsc::Receiver<Vec<u8>>>,
    notification_task: JoinHandle<()>,
}

impl BlePeripheralLink {
    /// Connect to `peripheral`, discover the vehicle characteristics, and
    /// subscribe to notifications.
    pub async fn establish(peripheral: Peripheral) -> Result<Self, TransportError> {
        peripheral.connect().await?;
        peripheral.discover_services().await?;

        let characteristics = peripheral.characteristics();
        let tx_characteristic = characteristics
            .iter()
            .find(|characteristic| characteristic.uuid == TX_CHARACTERISTIC_UUID)
            .cloned()
            .ok_or(TransportError::CharacteristicMissing("TX"))?;
        let rx_characteristic = characteristics
            .iter()
            .find(|characteristic| characteristic.uuid == RX_CHARACTERISTIC_UUID)
            .cloned()
            .ok_or(TransportError::CharacteristicMissing("RX"))?;

        let caps = WriteCaps {
            with_response: tx_characteristic.properties.contains(CharPropFlags::WRITE),
            without_response: tx_characteristic
                .properties
                .contains(CharPropFlags::WRITE_WITHOUT_RESPONSE),
        };

        peripheral.subscribe(&rx_characteristic).await?;
        let mut notifications = peripheral.notifications().await?;

        let (chunk_tx, chunk_rx) = mpsc::channel(256);
        let rx_uuid = rx_characteristic.uuid;
        // Forward RX notifications; when the stream ends (disconnect) the
        // dropped sender closes the chunk channel.
        let notification_task = tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                if notification.uuid != rx_uuid {
                    continue;
                }
                if chunk_tx.send(notification.value).await.is_err() {
                    break;
                }
            }
            debug!("notification stream ended");
        });

        let name = peripheral
            .properties()
            .await
            .ok()
            .flatten()
            .and_then(|properties| properties.local_name)
            .unwrap_or_else(|| "vehicle".to_string());
        info!(
            name,
            with_response = caps.with_response,
            without_response = caps.without_response,
            "GATT link established"
        );

        Ok(Self {
            peripheral,
            tx_characteristic,
            rx_characteristic,
            caps,
            name,
            chunks: Some(chunk_rx),
            notification_task,
        })
    }
}

impl GattLink for BlePeripheralLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_caps(&self) -> WriteCaps {
        self.caps
    }

    async fn write(&self, chunk: &[u8], mode: WriteMode) -> Result<(), TransportError> {
        let write_type = match mode {
            WriteMode::WithResponse => WriteType::WithResponse,
            WriteMode::WithoutResponse => WriteType::WithoutResponse,
        };
        self.peripheral
            .write(&self.tx_characteristic, chunk, write_type)
            .await?;
        Ok(())
    }

    fn take_chunks(&mut self) -> mpsc::Receiver<Vec<u8>> {
        self.chunks.take().expect("chunk stream already taken")
    }

    async fn close(&self) -> Result<(), TransportError> {
        let _ = self.peripheral.unsubscribe(&self.rx_characteristic).await;
        let result = self.peripheral.disconnect().await;
        self.notification_task.abort();
        result.map_err(Into::into)
    }
}

/// Scan for the vehicle advertising the VIN-derived local name and establish
/// a GATT link to it.
///
/// Under `Unfiltered` the first discovered device is accepted. The scan
/// fails with [`TransportError::NoDeviceFound`] after `timeout`.
pub async fn scan_for_vehicle(
    vin: &str,
    mode: DiscoveryMode,
    timeout: Duration,
) -> Result<BlePeripheralLink, TransportError> {
    let manager = Manager::new().await?;
    let adapter = manager
        .adapters()
        .await?
        .into_iter()
        .next()
        .ok_or(TransportError::NoAdapter)?;
    let peripheral = scan_with_adapter(&adapter, vin, mode, timeout).await?;
    BlePeripheralLink::establish(peripheral).await
}

async fn scan_with_adapter(
    adapter: &Adapter,
    vin: &str,
    mode: DiscoveryMode,
    timeout: Duration,
) -> Result<Peripheral, TransportError> {
    let mut events = adapter.events().await?;
    adapter.start_scan(ScanFilter::default()).await?;
    let prefix = advertisement_local_name(vin);
    debug!(prefix, ?mode, "scanning for vehicle");

    let deadline = tokio::time::Instant::now() + timeout;
    let result = loop {
        let event = match tokio::time::timeout_at(deadline, events.next()).await {
            Ok(Some(event)) => event,
            Ok(None) | Err(_) => break Err(TransportError::NoDeviceFound),
        };
        let CentralEvent::DeviceDiscovered(id) = event else {
            continue;
        };
        let Ok(peripheral) = adapter.peripheral(&id).await else {
            continue;
        };
        if accepts(&peripheral, mode, &prefix).await {
            break Ok(peripheral);
        }
    };
    let _ = adapter.stop_scan().await;
    result
}

async fn accepts(peripheral: &Peripheral, mode: DiscoveryMode, prefix: &str) -> bool {
    match mode {
        DiscoveryMode::Unfiltered => true,
        DiscoveryMode::VinPrefixValidation | DiscoveryMode::VinPrefixPromptFilter => {
            match peripheral.properties().await {
                Ok(Some(properties)) => properties
                    .local_name
                    .as_deref()
                    .map(|name| name.starts_with(prefix))
                    .unwrap_or(false),
                _ => false,
            }
        }
    }
}
