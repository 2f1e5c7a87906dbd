//! Request/response correlation over the framed transport.
//!
//! Outbound requests register their 16-byte UUID in a pending table; a pump
//! task decodes inbound transport messages and resolves the matching entry.
//! Responses may arrive in any order. Messages with unknown UUIDs and
//! undecodable notifications are logged and discarded without affecting the
//! connection. The pending table is the shared critical section between the
//! send paths and the pump; it sits behind a plain mutex that is never held
//! across an await.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use teslink_ble::{BleTransport, GattLink, TransportEvent};
use teslink_crypto::aes_gcm;
use teslink_crypto::sha::sha256;
use teslink_proto::metadata::{Metadata, MetadataTag};
use teslink_proto::schema::signatures::{signature_data, SignatureType};
use teslink_proto::schema::universal::routable_message::Payload;
use teslink_proto::schema::universal::{Domain, RoutableMessage};
use teslink_proto::types::RequestUuid;
use teslink_proto::{messages, ProtoError};

use crate::error::ClientError;

/// Post-match hook, used to authenticate and decrypt an encrypted response
/// before delivery.
pub type ResponseHandler =
    Box<dyn FnOnce(&RoutableMessage) -> Result<Vec<u8>, ClientError> + Send>;

/// What a resolved request delivers to its caller.
pub enum Delivery {
    /// Decrypted plaintext from the response handler.
    Plaintext(Vec<u8>),
    /// The raw decoded message, for requests without a handler.
    Message(Box<RoutableMessage>),
}

struct PendingRequest {
    respond_to: oneshot::Sender<Result<RoutableMessage, ClientError>>,
}

type PendingTable = Arc<Mutex<HashMap<[u8; 16], PendingRequest>>>;

/// UUID-keyed request multiplexer.
#[derive(Clone)]
pub struct Dispatcher {
    pending: PendingTable,
    connected: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Spawn the pump resolving inbound transport events against the
    /// pending table. Ends after the transport reports disconnection,
    /// failing every outstanding request.
    pub fn spawn_pump(&self, mut events: mpsc::Receiver<TransportEvent>) -> JoinHandle<()> {
        let pending = Arc::clone(&self.pending);
        let connected = Arc::clone(&self.connected);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    TransportEvent::Message(bytes) => Self::resolve(&pending, &bytes),
                    TransportEvent::Disconnected => break,
                }
            }
            connected.store(false, Ordering::SeqCst);
            let mut table = pending.lock().expect("pending table poisoned");
            for (_, request) in table.drain() {
                let _ = request.respond_to.send(Err(ClientError::Disconnected));
            }
            debug!("dispatcher pump stopped");
        })
    }

    fn resolve(pending: &PendingTable, bytes: &[u8]) {
        let message = match messages::decode_routable(bytes) {
            Ok(message) => message,
            Err(error) => {
                warn!(%error, len = bytes.len(), "dropping undecodable inbound message");
                return;
            }
        };
        // Responses echo the request UUID in `request_uuid`; fall back to
        // the message's own UUID for stacks that mirror it there.
        let correlation: [u8; 16] = match RequestUuid::try_from(message.request_uuid.as_slice())
            .or_else(|_| RequestUuid::try_from(message.uuid.as_slice()))
        {
            Ok(uuid) => uuid.into_bytes(),
            Err(_) => {
                debug!("dropping inbound message without correlation UUID");
                return;
            }
        };
        let entry = pending
            .lock()
            .expect("pending table poisoned")
            .remove(&correlation);
        match entry {
            Some(request) => {
                let _ = request.respond_to.send(Ok(message));
            }
            None => {
                debug!(
                    uuid = %RequestUuid::new(correlation),
                    "dropping inbound message for unknown request"
                );
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of outstanding requests (for tests and introspection).
    pub fn pending_len(&self) -> usize {
        self.pending.lock().expect("pending table poisoned").len()
    }

    /// Send `bytes` and await the response correlated by `uuid`.
    ///
    /// The pending entry is removed on match, timeout, submission failure,
    /// caller cancellation, or transport disconnect.
    pub async fn send_and_await<L: GattLink>(
        &self,
        transport: &BleTransport<L>,
        bytes: &[u8],
        uuid: RequestUuid,
        deadline: Duration,
        post_handler: Option<ResponseHandler>,
    ) -> Result<Delivery, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::Disconnected);
        }
        let (respond_to, response) = oneshot::channel();
        self.pending
            .lock()
            .expect("pending table poisoned")
            .insert(uuid.into_bytes(), PendingRequest { respond_to });
        // Removes the entry on every exit path; resolution already removed
        // it, making the cleanup a no-op.
        let _guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            uuid: uuid.into_bytes(),
        };

        transport.send(bytes).await?;

        let message = match tokio::time::timeout(deadline, response).await {
            Err(_) => return Err(ClientError::Timeout),
            Ok(Err(_)) => return Err(ClientError::Disconnected),
            Ok(Ok(Err(error))) => return Err(error),
            Ok(Ok(Ok(message))) => message,
        };
        match post_handler {
            Some(handler) => handler(&message).map(Delivery::Plaintext),
            None => Ok(Delivery::Message(Box::new(message))),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

struct PendingGuard {
    pending: PendingTable,
    uuid: [u8; 16],
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending
            .lock()
            .expect("pending table poisoned")
            .remove(&self.uuid);
    }
}

/// Authenticates and decrypts one encrypted response.
///
/// Bound to the request that produced it through the request's AES-GCM tag.
pub struct ResponseDecryptor {
    pub aes_key: [u8; 16],
    pub vin: Vec<u8>,
    pub session_domain: Domain,
    pub request_tag: [u8; 16],
}

impl ResponseDecryptor {
    pub fn into_handler(self) -> ResponseHandler {
        Box::new(move |message| self.decrypt(message))
    }

    fn decrypt(&self, message: &RoutableMessage) -> Result<Vec<u8>, ClientError> {
        let sig = match message
            .signature_data
            .as_ref()
            .and_then(|data| data.sig_type.as_ref())
        {
            Some(signature_data::SigType::AesGcmResponseData(sig)) => sig,
            _ => {
                return Err(ProtoError::MissingField("AES_GCM_response_data").into());
            }
        };
        let nonce: [u8; 12] =
            sig.nonce
                .as_slice()
                .try_into()
                .map_err(|_| ProtoError::InvalidFieldLength {
                    field: "response.nonce",
                    expected: 12,
                    actual: sig.nonce.len(),
                })?;
        let tag: [u8; 16] =
            sig.tag
                .as_slice()
                .try_into()
                .map_err(|_| ProtoError::InvalidFieldLength {
                    field: "response.tag",
                    expected: 16,
                    actual: sig.tag.len(),
                })?;
        let ciphertext = match message.payload {
            Some(Payload::ProtobufMessageAsBytes(ref ciphertext)) => ciphertext,
            _ => return Err(ProtoError::MissingField("protobuf_message_as_bytes").into()),
        };
        let domain = message
            .from_destination
            .as_ref()
            .and_then(|destination| destination.as_domain())
            .unwrap_or(self.session_domain);

        let aad = self.response_aad(domain, sig.counter, message.flags, message.fault())?;
        let mut ciphertext_with_tag = Vec::with_capacity(ciphertext.len() + tag.len());
        ciphertext_with_tag.extend_from_slice(ciphertext);
        ciphertext_with_tag.extend_from_slice(&tag);
        aes_gcm::decrypt(&self.aes_key, &nonce, &ciphertext_with_tag, &aad)
            .map_err(|_| ClientError::Authentication("response decryption failed"))
    }

    fn response_aad(
        &self,
        domain: Domain,
        counter: u32,
        flags: u32,
        fault: u32,
    ) -> Result<[u8; 32], ClientError> {
        let mut meta = Metadata::new();
        meta.add_u8(MetadataTag::SignatureType, SignatureType::AesGcmResponse as u8)?;
        meta.add_u8(MetadataTag::Domain, domain as u8)?;
        meta.add(MetadataTag::Personalization, &self.vin)?;
        meta.add_u32(MetadataTag::Counter, counter)?;
        // Unlike the request path, FLAGS is always bound here, even when
        // zero; the vehicle computes the response AAD the same way.
        meta.add_u32(MetadataTag::Flags, flags)?;
        let mut request_hash = [0u8; 17];
        request_hash[0] = SignatureType::AesGcmPersonalized as u8;
        request_hash[1..].copy_from_slice(&self.request_tag);
        meta.add(MetadataTag::RequestHash, &request_hash)?;
        meta.add_u32(MetadataTag::Fault, fault)?;
        Ok(sha256(&meta.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;
    use teslink_ble::testing::MockLink;
    use teslink_proto::schema::signatures::{AesGcmResponseData, SignatureData};
    use teslink_proto::schema::universal::routable_message;

    fn response_bytes(request_uuid: &[u8]) -> Vec<u8> {
        RoutableMessage {
            request_uuid: request_uuid.to_vec(),
            payload: Some(routable_message::Payload::ProtobufMessageAsBytes(vec![
                0xD0, 0xD1,
            ])),
            ..Default::default()
        }
        .encode_to_vec()
    }

    #[tokio::test]
    async fn test_matching_response_is_delivered() {
        let (link, handle) = MockLink::new();
        let mut transport = BleTransport::new(link, 185, None);
        let dispatcher = Dispatcher::new();
        let _pump = dispatcher.spawn_pump(transport.events());

        let uuid = RequestUuid::new([0x01; 16]);
        let responder = tokio::spawn({
            let handle_ref = handle;
            async move {
                handle_ref
                    .inject_message(&response_bytes(&[0x01; 16]), 20)
                    .await;
            }
        });

        let delivery = dispatcher
            .send_and_await(&transport, b"request", uuid, Duration::from_secs(10), None)
            .await
            .unwrap();
        responder.await.unwrap();
        match delivery {
            Delivery::Message(message) => {
                assert_eq!(message.request_uuid, vec![0x01; 16]);
            }
            Delivery::Plaintext(_) => panic!("expected raw message"),
        }
        assert_eq!(dispatcher.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_out_of_order_responses() {
        let (link, handle) = MockLink::new();
        let mut transport = BleTransport::new(link, 185, None);
        let dispatcher = Dispatcher::new();
        let _pump = dispatcher.spawn_pump(transport.events());
        let transport = Arc::new(transport);

        let u1 = RequestUuid::new([0x11; 16]);
        let u2 = RequestUuid::new([0x22; 16]);

        let first = tokio::spawn({
            let dispatcher = dispatcher.clone();
            let transport = Arc::clone(&transport);
            async move {
                dispatcher
                    .send_and_await(&transport, b"one", u1, Duration::from_secs(10), None)
                    .await
            }
        });
        let second = tokio::spawn({
            let dispatcher = dispatcher.clone();
            let transport = Arc::clone(&transport);
            async move {
                dispatcher
                    .send_and_await(&transport, b"two", u2, Duration::from_secs(10), None)
                    .await
            }
        });
        while dispatcher.pending_len() < 2 {
            tokio::task::yield_now().await;
        }

        // Answer the second request first.
        handle.inject_message(&response_bytes(&[0x22; 16]), 20).await;
        handle.inject_message(&response_bytes(&[0x11; 16]), 20).await;

        let Delivery::Message(m2) = second.await.unwrap().unwrap() else {
            panic!("expected raw message");
        };
        let Delivery::Message(m1) = first.await.unwrap().unwrap() else {
            panic!("expected raw message");
        };
        assert_eq!(m1.request_uuid, vec![0x11; 16]);
        assert_eq!(m2.request_uuid, vec![0x22; 16]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_removes_pending_entry() {
        let (link, _handle) = MockLink::new();
        let mut transport = BleTransport::new(link, 185, None);
        let dispatcher = Dispatcher::new();
        let _pump = dispatcher.spawn_pump(transport.events());

        let result = dispatcher
            .send_and_await(
                &transport,
                b"request",
                RequestUuid::new([0x09; 16]),
                Duration::from_secs(10),
                None,
            )
            .await;
        assert!(matches!(result, Err(ClientError::Timeout)));
        assert_eq!(dispatcher.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_fails_pending() {
        let (link, handle) = MockLink::new();
        let mut transport = BleTransport::new(link, 185, None);
        let dispatcher = Dispatcher::new();
        let _pump = dispatcher.spawn_pump(transport.events());
        let transport = Arc::new(transport);

        let request = tokio::spawn({
            let dispatcher = dispatcher.clone();
            let transport = Arc::clone(&transport);
            async move {
                dispatcher
                    .send_and_await(
                        &transport,
                        b"request",
                        RequestUuid::new([0x01; 16]),
                        Duration::from_secs(10),
                        None,
                    )
                    .await
            }
        });
        while dispatcher.pending_len() < 1 {
            tokio::task::yield_now().await;
        }

        handle.drop_connection();
        let result = request.await.unwrap();
        assert!(matches!(result, Err(ClientError::Disconnected)));
        assert!(!dispatcher.is_connected());
        assert_eq!(dispatcher.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_unknown_uuid_is_discarded() {
        let (link, handle) = MockLink::new();
        let mut transport = BleTransport::new(link, 185, None);
        let dispatcher = Dispatcher::new();
        let _pump = dispatcher.spawn_pump(transport.events());

        // Nothing pending: this message is logged and dropped.
        handle.inject_message(&response_bytes(&[0x77; 16]), 20).await;

        // A later request still resolves normally.
        let uuid = RequestUuid::new([0x33; 16]);
        let responder = tokio::spawn(async move {
            handle.inject_message(&response_bytes(&[0x33; 16]), 20).await;
        });
        let delivery = dispatcher
            .send_and_await(&transport, b"request", uuid, Duration::from_secs(10), None)
            .await
            .unwrap();
        responder.await.unwrap();
        assert!(matches!(delivery, Delivery::Message(_)));
    }

    #[tokio::test]
    async fn test_cancelled_request_removes_entry() {
        let (link, _handle) = MockLink::new();
        let mut transport = BleTransport::new(link, 185, None);
        let dispatcher = Dispatcher::new();
        let _pump = dispatcher.spawn_pump(transport.events());
        let transport = Arc::new(transport);

        let request = tokio::spawn({
            let dispatcher = dispatcher.clone();
            let transport = Arc::clone(&transport);
            async move {
                dispatcher
                    .send_and_await(
                        &transport,
                        b"request",
                        RequestUuid::new([0x05; 16]),
                        Duration::from_secs(10),
                        None,
                    )
                    .await
            }
        });
        while dispatcher.pending_len() < 1 {
            tokio::task::yield_now().await;
        }

        request.abort();
        let _ = request.await;
        assert_eq!(dispatcher.pending_len(), 0);
    }

    fn decryptor() -> ResponseDecryptor {
        ResponseDecryptor {
            aes_key: [0x07; 16],
            vin: b"5YJ3E1EA7JF000000".to_vec(),
            session_domain: Domain::Infotainment,
            request_tag: [0xCD; 16],
        }
    }

    #[test]
    fn test_response_aad_binds_zero_flags() {
        // The response AAD includes FLAGS unconditionally, unlike requests.
        let d = decryptor();
        let aad = d.response_aad(Domain::Infotainment, 1, 0, 0).unwrap();

        let mut meta = Metadata::new();
        meta.add_u8(MetadataTag::SignatureType, 9).unwrap();
        meta.add_u8(MetadataTag::Domain, 3).unwrap();
        meta.add(MetadataTag::Personalization, b"5YJ3E1EA7JF000000")
            .unwrap();
        meta.add_u32(MetadataTag::Counter, 1).unwrap();
        meta.add_u32(MetadataTag::Flags, 0).unwrap();
        let mut request_hash = vec![0x05];
        request_hash.extend_from_slice(&[0xCD; 16]);
        meta.add(MetadataTag::RequestHash, &request_hash).unwrap();
        meta.add_u32(MetadataTag::Fault, 0).unwrap();
        assert_eq!(aad, sha256(&meta.into_bytes()));
    }

    fn encrypted_response(
        d: &ResponseDecryptor,
        counter: u32,
        flags: u32,
        plaintext: &[u8],
    ) -> RoutableMessage {
        let aad = d.response_aad(Domain::Infotainment, counter, flags, 0).unwrap();
        let nonce = [0x09; 12];
        let ciphertext_with_tag =
            aes_gcm::encrypt(&d.aes_key, &nonce, plaintext, &aad).unwrap();
        let split = ciphertext_with_tag.len() - 16;
        RoutableMessage {
            payload: Some(routable_message::Payload::ProtobufMessageAsBytes(
                ciphertext_with_tag[..split].to_vec(),
            )),
            signature_data: Some(SignatureData {
                signer_identity: None,
                sig_type: Some(signature_data::SigType::AesGcmResponseData(
                    AesGcmResponseData {
                        nonce: nonce.to_vec(),
                        counter,
                        tag: ciphertext_with_tag[split..].to_vec(),
                    },
                )),
            }),
            flags,
            ..Default::default()
        }
    }

    #[test]
    fn test_decryptor_roundtrip_with_domain_fallback() {
        let d = decryptor();
        // No from_destination: the session domain is used for the AAD.
        let message = encrypted_response(&d, 5, 2, b"vehicle state");
        assert_eq!(d.decrypt(&message).unwrap(), b"vehicle state");
    }

    #[test]
    fn test_decryptor_rejects_tampered_flags() {
        let d = decryptor();
        let mut message = encrypted_response(&d, 5, 2, b"vehicle state");
        message.flags = 0;
        assert!(matches!(
            d.decrypt(&message),
            Err(ClientError::Authentication(_)),
        ));
    }

    #[test]
    fn test_decryptor_rejects_wrong_request_tag() {
        let d = decryptor();
        let message = encrypted_response(&d, 5, 2, b"vehicle state");
        let mut other = decryptor();
        other.request_tag = [0xCE; 16];
        assert!(matches!(
            other.decrypt(&message),
            Err(ClientError::Authentication(_)),
        ));
    }

    #[test]
    fn test_decryptor_requires_signature_data() {
        let d = decryptor();
        let message = RoutableMessage::default();
        assert!(matches!(
            d.decrypt(&message),
            Err(ClientError::Protocol(ProtoError::MissingField(_))),
        ));
    }

    #[test]
    fn test_decryptor_rejects_bad_nonce_length() {
        let d = decryptor();
        let mut message = encrypted_response(&d, 1, 2, b"x");
        if let Some(SignatureData {
            sig_type: Some(signature_data::SigType::AesGcmResponseData(ref mut sig)),
            ..
        }) = message.signature_data
        {
            sig.nonce = vec![0; 8];
        }
        assert!(matches!(
            d.decrypt(&message),
            Err(ClientError::Protocol(ProtoError::InvalidFieldLength { .. })),
        ));
    }
}
