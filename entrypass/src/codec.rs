//! Ticket codec: payload encoding, decoding and QR rendering.
//!
//! A ticket payload is `{reservationId, eventId, timestamp}` serialized as
//! compact JSON. That string is what the QR image carries and what a door
//! scanner hands back for validation. The rendered artifact is a
//! self-contained `data:image/png;base64,...` URL.
//!
//! Payloads are not signed: decoding only recovers structure.

use crate::environment::Clock;
use crate::types::{EventId, ReservationId};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;

/// Side length, in pixels, below which ticket images are never rendered
pub const TICKET_IMAGE_MIN_SIZE: u32 = 300;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Errors produced by the ticket codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input is not a serialized ticket payload
    #[error("Malformed ticket: {0}")]
    Malformed(String),

    /// The QR image could not be produced
    #[error("Failed to render ticket image: {0}")]
    Render(String),
}

/// Structured content of a ticket
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    /// Reservation the ticket admits
    pub reservation_id: ReservationId,
    /// Event the reservation belongs to
    pub event_id: EventId,
    /// Issuance time
    #[serde(rename = "timestamp", alias = "issuedAt")]
    pub issued_at: DateTime<Utc>,
}

impl TicketPayload {
    /// Serializes the payload to its transportable string form.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Render`] if serialization fails.
    pub fn to_transport(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(|e| CodecError::Render(e.to_string()))
    }
}

/// A freshly issued ticket
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedTicket {
    /// Structured payload
    pub payload: TicketPayload,
    /// Transportable payload string (what the QR code encodes)
    pub encoded: String,
    /// Scannable PNG image as a data URL
    pub artifact: String,
}

/// Encodes and decodes ticket payloads
#[derive(Clone)]
pub struct TicketCodec {
    clock: Arc<dyn Clock>,
}

impl TicketCodec {
    /// Creates a codec stamping issuance times from `clock`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Issues a ticket for a reservation.
    ///
    /// Every call stamps a fresh issuance time, so two encodes of the same
    /// reservation differ.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Render`] if the payload cannot be serialized or
    /// rendered as a QR image.
    pub fn encode(
        &self,
        reservation_id: ReservationId,
        event_id: EventId,
    ) -> Result<IssuedTicket, CodecError> {
        let payload = TicketPayload {
            reservation_id,
            event_id,
            issued_at: self.clock.now(),
        };
        let encoded = payload.to_transport()?;
        let artifact = render_qr(&encoded)?;

        tracing::debug!(
            reservation_id = %reservation_id,
            event_id = %event_id,
            artifact_len = artifact.len(),
            "Ticket encoded"
        );

        Ok(IssuedTicket {
            payload,
            encoded,
            artifact,
        })
    }

    /// Recovers the structured payload from scanned ticket data.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Malformed`] when the input is not a serialized
    /// payload with the expected fields. Raw image artifacts are rejected:
    /// they must be scanned first.
    pub fn decode(raw: &str) -> Result<TicketPayload, CodecError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CodecError::Malformed("ticket data is empty".to_string()));
        }
        if raw.starts_with("data:") {
            return Err(CodecError::Malformed(
                "ticket image must be scanned before validation".to_string(),
            ));
        }
        serde_json::from_str(raw).map_err(|e| CodecError::Malformed(e.to_string()))
    }
}

/// Renders `data` as a QR code PNG and returns it as a data URL.
///
/// High error correction, black on white, at least
/// [`TICKET_IMAGE_MIN_SIZE`] pixels per side.
///
/// # Errors
///
/// Returns [`CodecError::Render`] if the data does not fit a QR code or PNG
/// encoding fails.
pub fn render_qr(data: &str) -> Result<String, CodecError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::H)
        .map_err(|e| CodecError::Render(e.to_string()))?;

    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(TICKET_IMAGE_MIN_SIZE, TICKET_IMAGE_MIN_SIZE)
        .dark_color(Luma([0]))
        .light_color(Luma([255]))
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| CodecError::Render(e.to_string()))?;

    Ok(format!("{DATA_URL_PREFIX}{}", STANDARD.encode(&png)))
}
