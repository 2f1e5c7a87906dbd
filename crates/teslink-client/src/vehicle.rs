//! Vehicle session façade.
//!
//! Owns one transport, one dispatcher, and the per-domain session states.
//! `connect` only wires the transport; the handshake runs lazily on the
//! first operation that needs an authenticated session. Key enrollment is
//! the exception: it requires no session because the vehicle authorizes it
//! through a physical NFC-card tap.

use std::collections::HashMap;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use teslink_ble::{scan_for_vehicle, BlePeripheralLink, BleTransport, GattLink};
use teslink_crypto::aes_gcm;
use teslink_crypto::hmac::hmac_sha256_verify;
use teslink_crypto::kdf::session_keys;
use teslink_crypto::p256::{EcPrivateKey, EcPublicKey};
use teslink_crypto::random::random_array;
use teslink_crypto::sha::sha256;
use teslink_proto::messages::{self, EncryptedCommand, StateCategory};
use teslink_proto::metadata::{Metadata, MetadataTag};
use teslink_proto::schema::carserver::{Response, VehicleData};
use teslink_proto::schema::keys::Role;
use teslink_proto::schema::signatures::SignatureType;
use teslink_proto::schema::universal::routable_message::Payload;
use teslink_proto::schema::universal::{Domain, FLAG_ENCRYPT_RESPONSE};
use teslink_proto::schema::vcsec::KeyFormFactor;
use teslink_proto::types::{RequestUuid, RoutingAddress};
use teslink_proto::ProtoError;

use crate::config::ClientConfig;
use crate::dispatch::{Delivery, Dispatcher, ResponseDecryptor};
use crate::error::ClientError;
use crate::session::SessionState;

/// Result of a successful state fetch.
#[derive(Debug)]
pub struct VehicleStateResult {
    pub category: StateCategory,
    /// Decrypted response plaintext as received.
    pub raw: Vec<u8>,
    pub response: Response,
    pub vehicle_data: Option<VehicleData>,
}

/// An authenticated command-and-state channel to one vehicle.
pub struct Vehicle<L: GattLink> {
    config: ClientConfig,
    transport: BleTransport<L>,
    dispatcher: Dispatcher,
    pump: JoinHandle<()>,
    routing_address: RoutingAddress,
    sessions: HashMap<Domain, SessionState>,
}

impl Vehicle<BlePeripheralLink> {
    /// Scan for the configured vehicle and wire up the transport.
    ///
    /// Performs no handshake; sessions are established lazily.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let link =
            scan_for_vehicle(&config.vin, config.discovery_mode, config.scan_timeout()).await?;
        Self::with_link(config, link)
    }
}

impl<L: GattLink> Vehicle<L> {
    /// Wire up an already-established GATT link.
    pub fn with_link(config: ClientConfig, link: L) -> Result<Self, ClientError> {
        config.validate()?;
        let mut transport = BleTransport::new(link, config.preferred_block_length, None);
        let dispatcher = Dispatcher::new();
        let pump = dispatcher.spawn_pump(transport.events());
        Ok(Self {
            config,
            transport,
            dispatcher,
            pump,
            routing_address: RoutingAddress::new(random_array()),
            sessions: HashMap::new(),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// The last counter consumed for `domain`, if a session exists.
    pub fn session_counter(&self, domain: Domain) -> Option<u32> {
        self.sessions.get(&domain).map(SessionState::counter)
    }

    /// Drop the session for `domain`, forcing a re-handshake on next use.
    pub fn reset_session(&mut self, domain: Domain) {
        self.sessions.remove(&domain);
    }

    /// Ensure an authenticated infotainment session exists.
    pub async fn ensure_session(&mut self, private_key: &EcPrivateKey) -> Result<(), ClientError> {
        self.ensure_session_for(Domain::Infotainment, private_key).await
    }

    /// Ensure an authenticated session exists for `domain`.
    pub async fn ensure_session_for(
        &mut self,
        domain: Domain,
        private_key: &EcPrivateKey,
    ) -> Result<(), ClientError> {
        if self.sessions.contains_key(&domain) {
            return Ok(());
        }
        self.handshake(domain, private_key).await
    }

    /// Fetch one category of vehicle state over an encrypted session.
    pub async fn get_state(
        &mut self,
        category: StateCategory,
        private_key: &EcPrivateKey,
    ) -> Result<VehicleStateResult, ClientError> {
        self.ensure_session_for(Domain::Infotainment, private_key).await?;
        let plaintext = messages::get_vehicle_data(category);
        let raw = self
            .send_encrypted(Domain::Infotainment, plaintext, FLAG_ENCRYPT_RESPONSE)
            .await?;
        let response = messages::decode_carserver_response(&raw)?;
        if let Some(reason) = messages::response_error(&response) {
            return Err(ClientError::VehicleReported(reason));
        }
        let vehicle_data = messages::response_vehicle_data(&response).cloned();
        Ok(VehicleStateResult {
            category,
            raw,
            response,
            vehicle_data,
        })
    }

    /// Ask the vehicle to enroll `public_key_raw` with the given role.
    ///
    /// Requires no authenticated session; returns once the transport has
    /// accepted the write. Approval happens physically on the vehicle.
    pub async fn send_add_key_request(
        &mut self,
        public_key_raw: &[u8],
        role: Role,
        form_factor: KeyFormFactor,
    ) -> Result<(), ClientError> {
        let payload = messages::add_key_request(public_key_raw, role, form_factor)?;
        let uuid = RequestUuid::new(random_array());
        let envelope =
            messages::unsigned_command(Domain::VehicleSecurity, &self.routing_address, &uuid, payload);
        self.transport.send(&envelope).await?;
        info!("key enrollment request sent; approval requires an NFC-card tap on the vehicle");
        Ok(())
    }

    /// Tear down the transport, failing all pending requests and dropping
    /// every session.
    pub async fn disconnect(&mut self) -> Result<(), ClientError> {
        self.sessions.clear();
        self.transport.close().await?;
        Ok(())
    }

    async fn handshake(
        &mut self,
        domain: Domain,
        private_key: &EcPrivateKey,
    ) -> Result<(), ClientError> {
        let client_public = private_key.public_key().to_uncompressed_bytes();
        let uuid = RequestUuid::new(random_array());
        debug!(?domain, %uuid, "requesting session info");
        let request =
            messages::session_info_request(domain, &client_public, &self.routing_address, &uuid);
        let delivery = self
            .dispatcher
            .send_and_await(
                &self.transport,
                &request,
                uuid,
                self.config.request_timeout(),
                None,
            )
            .await?;
        let message = match delivery {
            Delivery::Message(message) => message,
            Delivery::Plaintext(_) => unreachable!("no response handler was installed"),
        };

        let info_bytes = match message.payload {
            Some(Payload::SessionInfo(ref bytes)) => bytes.clone(),
            _ => return Err(ProtoError::MissingField("session_info").into()),
        };
        let tag = messages::session_info_tag(&message)?;
        let info = messages::decode_session_info(&info_bytes)?;

        let vehicle_public = EcPublicKey::from_sec1_bytes(&info.public_key)?;
        let shared = private_key.diffie_hellman(&vehicle_public);
        let keys = session_keys(&shared);

        // The tag covers serialized metadata followed by the session-info
        // bytes exactly as transmitted.
        let mut meta = Metadata::new();
        meta.add_u8(MetadataTag::SignatureType, SignatureType::Hmac as u8)?;
        meta.add(MetadataTag::Personalization, self.config.vin.as_bytes())?;
        meta.add(MetadataTag::Challenge, uuid.as_ref())?;
        let meta_bytes = meta.into_bytes();

        if hmac_sha256_verify(&keys.session_info_key, &[&meta_bytes, &info_bytes], &tag).is_err() {
            // `keys` zeroizes on drop; nothing derived is retained.
            warn!(?domain, "session info failed authentication");
            return Err(ClientError::Authentication(
                "session info authentication failed",
            ));
        }

        info!(
            ?domain,
            counter = info.counter,
            clock_time = info.clock_time,
            "session established"
        );
        self.sessions
            .insert(domain, SessionState::establish(domain, keys, &info, client_public));
        Ok(())
    }

    async fn send_encrypted(
        &mut self,
        domain: Domain,
        plaintext: Vec<u8>,
        flags: u32,
    ) -> Result<Vec<u8>, ClientError> {
        let (counter, expires_at, epoch, aes_key, client_public) = {
            let session = self.sessions.get_mut(&domain).ok_or(ClientError::NoSession)?;
            (
                session.next_counter(),
                session.command_expiry(self.config.command_ttl_secs),
                session.epoch().to_vec(),
                *session.aes_key(),
                *session.client_public_key(),
            )
        };

        let mut meta = Metadata::new();
        meta.add_u8(MetadataTag::SignatureType, SignatureType::AesGcmPersonalized as u8)?;
        meta.add_u8(MetadataTag::Domain, domain as u8)?;
        meta.add(MetadataTag::Personalization, self.config.vin.as_bytes())?;
        meta.add(MetadataTag::Epoch, &epoch)?;
        meta.add_u32(MetadataTag::ExpiresAt, expires_at)?;
        meta.add_u32(MetadataTag::Counter, counter)?;
        // Requests omit FLAGS when zero; response verification includes it
        // unconditionally.
        if flags != 0 {
            meta.add_u32(MetadataTag::Flags, flags)?;
        }
        let aad = sha256(&meta.into_bytes());

        let nonce: [u8; 12] = random_array();
        let ciphertext_with_tag = aes_gcm::encrypt(&aes_key, &nonce, &plaintext, &aad)?;
        let split = ciphertext_with_tag.len() - aes_gcm::TAG_LEN;
        let mut tag = [0u8; 16];
        tag.copy_from_slice(&ciphertext_with_tag[split..]);

        let uuid = RequestUuid::new(random_array());
        debug!(?domain, counter, expires_at, %uuid, "sending encrypted command");
        let envelope = messages::encrypted_command(EncryptedCommand {
            domain,
            routing_address: &self.routing_address,
            uuid: &uuid,
            ciphertext: ciphertext_with_tag[..split].to_vec(),
            flags,
            signer_public_key: &client_public,
            epoch: &epoch,
            nonce,
            counter,
            expires_at,
            tag,
        });

        let handler = ResponseDecryptor {
            aes_key,
            vin: self.config.vin.clone().into_bytes(),
            session_domain: domain,
            request_tag: tag,
        }
        .into_handler();

        let result = self
            .dispatcher
            .send_and_await(
                &self.transport,
                &envelope,
                uuid,
                self.config.request_timeout(),
                Some(handler),
            )
            .await;
        match result {
            Ok(Delivery::Plaintext(plaintext)) => Ok(plaintext),
            Ok(Delivery::Message(_)) => unreachable!("a response handler was installed"),
            Err(err @ ClientError::Authentication(_)) => {
                // Fatal for the session, not for the transport.
                warn!(?domain, "response failed authentication, invalidating session");
                self.sessions.remove(&domain);
                Err(err)
            }
            Err(err @ ClientError::Disconnected) => {
                self.sessions.clear();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

impl<L: GattLink> Drop for Vehicle<L> {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
