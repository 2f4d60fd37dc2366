/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! Binary encoding of [`InternalMessage`] envelopes.
//!
//! # Wire Format (version 1)
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ Version (1 byte, currently 0x01)                           │
//! ├────────────────────────────────────────────────────────────┤
//! │ Field*                                                     │
//! │   Tag (1 byte)                                             │
//! │   Length (4 bytes, big-endian u32)                         │
//! │   Value (Length bytes)                                     │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Tag  | Field               | Value                        |
//! |------|---------------------|------------------------------|
//! | 0x01 | id                  | 16 bytes, UUID big-endian    |
//! | 0x02 | payload             | opaque bytes                 |
//! | 0x03 | payload type name   | UTF-8                        |
//! | 0x04 | receiver            | UTF-8 ref spec               |
//! | 0x05 | sender (optional)   | UTF-8 ref spec               |
//! | 0x06 | durable             | 1 byte, 0 or 1               |
//! | 0x07 | undeliverable       | 1 byte, 0 or 1               |
//!
//! Unknown tags are skipped so newer writers can add fields.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;
use uuid::Uuid;

use crate::common::ElasticError;
use crate::message::InternalMessage;
use crate::traits::ActorRefFactory;

/// Envelope format version byte.
pub const ENVELOPE_VERSION: u8 = 0x01;

/// Field tag: message id.
pub const TAG_ID: u8 = 0x01;
/// Field tag: payload bytes.
pub const TAG_PAYLOAD: u8 = 0x02;
/// Field tag: payload type name.
pub const TAG_PAYLOAD_TYPE: u8 = 0x03;
/// Field tag: receiver spec.
pub const TAG_RECEIVER: u8 = 0x04;
/// Field tag: sender spec.
pub const TAG_SENDER: u8 = 0x05;
/// Field tag: durable flag.
pub const TAG_DURABLE: u8 = 0x06;
/// Field tag: undeliverable flag.
pub const TAG_UNDELIVERABLE: u8 = 0x07;

const FIELD_HEADER_SIZE: usize = 5;

/// Encodes and decodes envelopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalMessageCodec;

impl InternalMessageCodec {
    /// Encodes `message`. The envelope's payload is only read.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Serialization`] when a field is longer than a `u32`
    /// length prefix can describe.
    pub fn encode(message: &InternalMessage) -> Result<Bytes, ElasticError> {
        let sender = message.sender().map(|s| s.spec().as_bytes());
        let receiver = message.receiver().spec().as_bytes();
        let type_name = message.payload_type_name().as_bytes();
        let payload = message.payload();

        let capacity = 1
            + FIELD_HEADER_SIZE * 7
            + 16
            + payload.len()
            + type_name.len()
            + receiver.len()
            + sender.map_or(0, <[u8]>::len)
            + 2;
        let mut buf = BytesMut::with_capacity(capacity);

        buf.put_u8(ENVELOPE_VERSION);
        put_field(&mut buf, TAG_ID, message.id().as_bytes())?;
        put_field(&mut buf, TAG_PAYLOAD, payload)?;
        put_field(&mut buf, TAG_PAYLOAD_TYPE, type_name)?;
        put_field(&mut buf, TAG_RECEIVER, receiver)?;
        if let Some(sender) = sender {
            put_field(&mut buf, TAG_SENDER, sender)?;
        }
        put_field(&mut buf, TAG_DURABLE, &[u8::from(message.is_durable())])?;
        put_field(&mut buf, TAG_UNDELIVERABLE, &[u8::from(message.is_undeliverable())])?;

        trace!(message_id = %message.id(), len = buf.len(), "encoded envelope");
        Ok(buf.freeze())
    }

    /// Decodes an envelope, resolving ref specs through `refs`.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Serialization`] for unknown versions, truncated
    /// fields, missing required fields or malformed values, and
    /// [`ElasticError::Addressing`] for unparsable ref specs.
    pub fn decode(bytes: &[u8], refs: &dyn ActorRefFactory) -> Result<InternalMessage, ElasticError> {
        let mut buf = bytes;
        if !buf.has_remaining() {
            return Err(ElasticError::Serialization("empty envelope".into()));
        }
        let version = buf.get_u8();
        if version != ENVELOPE_VERSION {
            return Err(ElasticError::Serialization(format!(
                "unsupported envelope version: {version:#04x}"
            )));
        }

        let mut id = None;
        let mut payload = None;
        let mut type_name = None;
        let mut receiver = None;
        let mut sender = None;
        let mut durable = false;
        let mut undeliverable = false;

        while buf.has_remaining() {
            if buf.remaining() < FIELD_HEADER_SIZE {
                return Err(ElasticError::Serialization("truncated field header".into()));
            }
            let tag = buf.get_u8();
            let len = buf.get_u32() as usize;
            if buf.remaining() < len {
                return Err(ElasticError::Serialization(format!(
                    "field {tag:#04x} declares {len} bytes, {} remain",
                    buf.remaining()
                )));
            }
            let (value, rest) = buf.split_at(len);
            buf = rest;

            match tag {
                TAG_ID => id = Some(Uuid::from_slice(value)?),
                TAG_PAYLOAD => payload = Some(Bytes::copy_from_slice(value)),
                TAG_PAYLOAD_TYPE => type_name = Some(std::str::from_utf8(value)?.to_string()),
                TAG_RECEIVER => receiver = Some(refs.create(std::str::from_utf8(value)?)?),
                TAG_SENDER => sender = Some(refs.create(std::str::from_utf8(value)?)?),
                TAG_DURABLE => durable = flag(tag, value)?,
                TAG_UNDELIVERABLE => undeliverable = flag(tag, value)?,
                unknown => trace!(tag = unknown, len, "skipping unknown envelope field"),
            }
        }

        let missing = |field: &str| ElasticError::Serialization(format!("envelope is missing {field}"));
        Ok(InternalMessage::from_parts(
            id.ok_or_else(|| missing("id"))?,
            sender,
            receiver.ok_or_else(|| missing("receiver"))?,
            payload.ok_or_else(|| missing("payload"))?,
            type_name.ok_or_else(|| missing("payload type"))?,
            durable,
            undeliverable,
        ))
    }
}

fn put_field(buf: &mut BytesMut, tag: u8, value: &[u8]) -> Result<(), ElasticError> {
    let len = field_len(tag, value.len())?;
    buf.put_u8(tag);
    buf.put_u32(len);
    buf.put_slice(value);
    Ok(())
}

fn field_len(tag: u8, len: usize) -> Result<u32, ElasticError> {
    u32::try_from(len).map_err(|_| {
        ElasticError::Serialization(format!("field {tag:#04x} is {len} bytes, over the u32 length limit"))
    })
}

fn flag(tag: u8, value: &[u8]) -> Result<bool, ElasticError> {
    match value {
        [0] => Ok(false),
        [1] => Ok(true),
        _ => Err(ElasticError::Serialization(format!("field {tag:#04x} is not a boolean"))),
    }
}
