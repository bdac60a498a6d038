//! JSON envelope codec for [`Message`].
//!
//! On the wire every message is `{"type": <kind>, "payload": <payload>}`.
//! Field names are camelCase so a JavaScript host can speak the same
//! protocol. Surfaces and bitmaps are never serialized: the payload carries
//! a `true` marker and the object itself travels in the transfer list.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::{InitPayload, Message, MessageKind, RenderPayload, TogglePayload};
use super::port::{PostedMessage, Transferable};
use crate::schema::{Color, Seed};

/// Protocol violations. All of them end the session on the receiving side.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("Unrecognized message kind {0:?}")]
    UnknownKind(String),
    #[error("Invalid {kind} payload: {source}")]
    Payload {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid {kind} payload: {reason}")]
    InconsistentPayload {
        kind: MessageKind,
        reason: &'static str,
    },
    #[error("{kind} message declares a {object} transfer that is missing")]
    MissingTransfer {
        kind: MessageKind,
        object: &'static str,
    },
    #[error("{kind} message carries {count} unexpected transferable(s)")]
    UnexpectedTransfer { kind: MessageKind, count: usize },
    #[error("Failed to encode {kind} message: {source}")]
    Encode {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} message is not valid in this direction")]
    WrongDirection(MessageKind),
    #[error("{0} message received before init")]
    NotInitialized(MessageKind),
    #[error("Init message received twice")]
    DuplicateInit,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct InitWire {
    width: u32,
    height: u32,
    cell_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dead_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alive_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tick_interval_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seed: Option<Seed>,
    #[serde(default, skip_serializing_if = "is_false")]
    surface: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ToggleWire {
    row: u32,
    col: u32,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RenderWire {
    Fps(u32),
    Frame { fps: u32, bitmap: bool },
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Serialize)]
struct OutgoingEnvelope<T> {
    #[serde(rename = "type")]
    kind: &'static str,
    payload: T,
}

fn envelope<T: Serialize>(kind: MessageKind, payload: T) -> Result<String, ProtocolError> {
    serde_json::to_string(&OutgoingEnvelope {
        kind: kind.as_str(),
        payload,
    })
    .map_err(|source| ProtocolError::Encode { kind, source })
}

/// Serialize a message, moving any surface or bitmap into the transfer list.
pub fn encode(message: Message) -> Result<PostedMessage, ProtocolError> {
    let kind = message.kind();
    let mut transfer = Vec::new();

    let data = match message {
        Message::Init(init) => {
            let has_surface = init.surface.is_some();
            if let Some(surface) = init.surface {
                transfer.push(Transferable::Surface(surface));
            }
            envelope(
                kind,
                InitWire {
                    width: init.width,
                    height: init.height,
                    cell_size: init.cell_size,
                    dead_color: init.dead_color,
                    alive_color: init.alive_color,
                    tick_interval_ms: init.tick_interval_ms,
                    seed: init.seed,
                    surface: has_surface,
                },
            )?
        }
        Message::Render(RenderPayload::Fps(fps)) => envelope(kind, RenderWire::Fps(fps))?,
        Message::Render(RenderPayload::Frame { fps, bitmap }) => {
            transfer.push(Transferable::Bitmap(bitmap));
            envelope(kind, RenderWire::Frame { fps, bitmap: true })?
        }
        Message::Toggle(TogglePayload { row, col }) => envelope(kind, ToggleWire { row, col })?,
        Message::Pause(paused) => envelope(kind, paused)?,
    };

    Ok(PostedMessage { data, transfer })
}

/// Parse and validate a posted message.
///
/// Unknown kinds, payloads that do not match their kind, and transfer lists
/// that do not match the payload's markers are all rejected.
pub fn decode(posted: PostedMessage) -> Result<Message, ProtocolError> {
    let PostedMessage { data, transfer } = posted;
    let envelope: Envelope = serde_json::from_str(&data).map_err(ProtocolError::Envelope)?;

    let kind = MessageKind::from_tag(&envelope.kind)
        .ok_or_else(|| ProtocolError::UnknownKind(envelope.kind.clone()))?;
    let payload_error = |source: serde_json::Error| ProtocolError::Payload { kind, source };
    let mut transfer = TransferList::new(kind, transfer);

    let message = match kind {
        MessageKind::Init => {
            let wire: InitWire = serde_json::from_value(envelope.payload).map_err(payload_error)?;
            let surface = if wire.surface {
                Some(transfer.take_surface()?)
            } else {
                None
            };
            Message::Init(InitPayload {
                width: wire.width,
                height: wire.height,
                cell_size: wire.cell_size,
                dead_color: wire.dead_color,
                alive_color: wire.alive_color,
                tick_interval_ms: wire.tick_interval_ms,
                seed: wire.seed,
                surface,
            })
        }
        MessageKind::Render => {
            let wire: RenderWire =
                serde_json::from_value(envelope.payload).map_err(payload_error)?;
            match wire {
                RenderWire::Fps(fps) => Message::Render(RenderPayload::Fps(fps)),
                RenderWire::Frame { fps, bitmap: true } => Message::Render(RenderPayload::Frame {
                    fps,
                    bitmap: transfer.take_bitmap()?,
                }),
                RenderWire::Frame { bitmap: false, .. } => {
                    return Err(ProtocolError::InconsistentPayload {
                        kind,
                        reason: "frame payload without a bitmap",
                    });
                }
            }
        }
        MessageKind::Toggle => {
            let ToggleWire { row, col } =
                serde_json::from_value(envelope.payload).map_err(payload_error)?;
            Message::Toggle(TogglePayload { row, col })
        }
        MessageKind::Pause => {
            let paused: bool = serde_json::from_value(envelope.payload).map_err(payload_error)?;
            Message::Pause(paused)
        }
    };

    transfer.finish()?;
    Ok(message)
}

struct TransferList {
    kind: MessageKind,
    items: Vec<Transferable>,
}

impl TransferList {
    fn new(kind: MessageKind, items: Vec<Transferable>) -> Self {
        Self { kind, items }
    }

    fn take_surface(&mut self) -> Result<super::surface::OffscreenSurface, ProtocolError> {
        let pos = self
            .items
            .iter()
            .position(|t| matches!(t, Transferable::Surface(_)));
        match pos.map(|i| self.items.remove(i)) {
            Some(Transferable::Surface(surface)) => Ok(surface),
            _ => Err(ProtocolError::MissingTransfer {
                kind: self.kind,
                object: "surface",
            }),
        }
    }

    fn take_bitmap(&mut self) -> Result<super::surface::ImageBitmap, ProtocolError> {
        let pos = self
            .items
            .iter()
            .position(|t| matches!(t, Transferable::Bitmap(_)));
        match pos.map(|i| self.items.remove(i)) {
            Some(Transferable::Bitmap(bitmap)) => Ok(bitmap),
            _ => Err(ProtocolError::MissingTransfer {
                kind: self.kind,
                object: "bitmap",
            }),
        }
    }

    fn finish(self) -> Result<(), ProtocolError> {
        if self.items.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedTransfer {
                kind: self.kind,
                count: self.items.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::port::channel;
    use crate::runtime::surface::OffscreenSurface;

    fn init(surface: Option<OffscreenSurface>) -> Message {
        Message::Init(InitPayload {
            width: 640,
            height: 360,
            cell_size: 2,
            dead_color: None,
            alive_color: Some(Color::rgb(0, 128, 0)),
            tick_interval_ms: None,
            seed: None,
            surface,
        })
    }

    #[test]
    fn test_envelope_shape() {
        let posted = encode(Message::Toggle(TogglePayload { row: 3, col: 4 })).unwrap();
        assert_eq!(posted.data, r#"{"type":"toggle","payload":{"row":3,"col":4}}"#);
        assert!(posted.transfer.is_empty());

        let posted = encode(Message::Pause(true)).unwrap();
        assert_eq!(posted.data, r#"{"type":"pause","payload":true}"#);

        let posted = encode(Message::Render(RenderPayload::Fps(60))).unwrap();
        assert_eq!(posted.data, r#"{"type":"render","payload":60}"#);
    }

    #[test]
    fn test_init_moves_surface_into_transfer_list() {
        let posted = encode(init(Some(OffscreenSurface::new(5, 5)))).unwrap();
        let value: Value = serde_json::from_str(&posted.data).unwrap();
        assert_eq!(value["payload"]["surface"], Value::Bool(true));
        assert_eq!(value["payload"]["cellSize"], 2);
        assert_eq!(value["payload"]["aliveColor"], "#008000");
        assert!(value["payload"].get("deadColor").is_none());
        assert_eq!(posted.transfer.len(), 1);

        match decode(posted).unwrap() {
            Message::Init(payload) => {
                assert_eq!((payload.width, payload.height), (640, 360));
                assert_eq!(payload.alive_color, Some(Color::rgb(0, 128, 0)));
                assert_eq!(payload.surface.map(|s| s.width()), Some(5));
            }
            other => panic!("expected init, got {other:?}"),
        }
    }

    #[test]
    fn test_frame_carries_bitmap() {
        let bitmap = OffscreenSurface::new(2, 3).transfer_to_image_bitmap();
        let posted = encode(Message::Render(RenderPayload::Frame { fps: 59, bitmap })).unwrap();
        assert_eq!(posted.data, r#"{"type":"render","payload":{"fps":59,"bitmap":true}}"#);

        match decode(posted).unwrap() {
            Message::Render(RenderPayload::Frame { fps, bitmap }) => {
                assert_eq!(fps, 59);
                assert_eq!((bitmap.width(), bitmap.height()), (2, 3));
            }
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let posted = PostedMessage::data(r#"{"type":"resize","payload":{"w":1}}"#);
        let err = decode(posted).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownKind(ref k) if k == "resize"));
    }

    #[test]
    fn test_payload_must_match_kind() {
        let err = decode(PostedMessage::data(r#"{"type":"pause","payload":{"row":1,"col":2}}"#))
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Payload {
                kind: MessageKind::Pause,
                ..
            }
        ));

        let err = decode(PostedMessage::data(r#"{"type":"toggle","payload":{"row":-1,"col":2}}"#))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Payload { .. }));

        let err = decode(PostedMessage::data(
            r#"{"type":"render","payload":{"fps":3,"bitmap":false}}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ProtocolError::InconsistentPayload { .. }));
    }

    #[test]
    fn test_transfer_list_must_match_markers() {
        let err = decode(PostedMessage::data(
            r#"{"type":"init","payload":{"width":1,"height":1,"cellSize":1,"surface":true}}"#,
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MissingTransfer {
                object: "surface",
                ..
            }
        ));

        let stray = PostedMessage {
            data: r#"{"type":"pause","payload":false}"#.into(),
            transfer: vec![Transferable::Surface(OffscreenSurface::new(1, 1))],
        };
        assert!(matches!(
            decode(stray).unwrap_err(),
            ProtocolError::UnexpectedTransfer { count: 1, .. }
        ));
    }

    #[test]
    fn test_malformed_envelope() {
        assert!(matches!(
            decode(PostedMessage::data("not json")).unwrap_err(),
            ProtocolError::Envelope(_)
        ));
        assert!(matches!(
            decode(PostedMessage::data(r#"{"payload":true}"#)).unwrap_err(),
            ProtocolError::Envelope(_)
        ));
    }

    #[test]
    fn test_order_is_preserved_across_port() {
        let (control, worker) = channel();
        control.post(encode(init(None)).unwrap()).unwrap();
        control
            .post(encode(Message::Toggle(TogglePayload { row: 3, col: 4 })).unwrap())
            .unwrap();
        control.post(encode(Message::Pause(true)).unwrap()).unwrap();

        let kinds: Vec<Message> = (0..3)
            .map(|_| decode(worker.recv().unwrap()).unwrap())
            .collect();
        assert!(matches!(kinds[0], Message::Init(_)));
        assert!(matches!(
            kinds[1],
            Message::Toggle(TogglePayload { row: 3, col: 4 })
        ));
        assert!(matches!(kinds[2], Message::Pause(true)));
    }
}
