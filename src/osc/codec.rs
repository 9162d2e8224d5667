//! OSC message encoding and decoding
//!
//! Thin layer over `rosc` that speaks the X-Air dialect: booleans travel as
//! integers, bundles are flattened, and a message may carry zero, one or
//! several arguments.

use rosc::{decoder, encoder, OscMessage, OscPacket, OscType};

use crate::error::Result;

/// Maximum datagram size the mixer emits
pub const MAX_DATAGRAM: usize = 1536;

/// Arguments of an outgoing message
#[derive(Debug, Clone, PartialEq)]
pub enum OscParams {
    /// No argument: a query for the current value
    None,
    One(OscType),
    Many(Vec<OscType>),
}

impl OscParams {
    pub fn into_args(self) -> Vec<OscType> {
        match self {
            OscParams::None => Vec::new(),
            OscParams::One(arg) => vec![arg],
            OscParams::Many(args) => args,
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, OscParams::None)
    }
}

impl From<f32> for OscParams {
    fn from(value: f32) -> Self {
        OscParams::One(OscType::Float(value))
    }
}

impl From<i32> for OscParams {
    fn from(value: i32) -> Self {
        OscParams::One(OscType::Int(value))
    }
}

impl From<bool> for OscParams {
    fn from(value: bool) -> Self {
        OscParams::One(OscType::Int(value as i32))
    }
}

impl From<&str> for OscParams {
    fn from(value: &str) -> Self {
        OscParams::One(OscType::String(value.to_string()))
    }
}

impl From<Vec<OscType>> for OscParams {
    fn from(values: Vec<OscType>) -> Self {
        OscParams::Many(values)
    }
}

/// Encode one message into a datagram
pub fn encode_message(address: &str, params: OscParams) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(OscMessage {
        addr: address.to_string(),
        args: params.into_args(),
    });
    Ok(encoder::encode(&packet)?)
}

/// Decode a datagram, flattening any bundle into its messages
pub fn decode_packet(data: &[u8]) -> Result<Vec<OscMessage>> {
    let (_rest, packet) = decoder::decode_udp(data)?;
    let mut messages = Vec::new();
    flatten(packet, &mut messages);
    Ok(messages)
}

fn flatten(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(msg) => out.push(msg),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, out);
            }
        }
    }
}

/// Read a numeric argument as a normalized level or flag
pub fn arg_as_f32(arg: &OscType) -> Option<f32> {
    match arg {
        OscType::Float(v) => Some(*v),
        OscType::Double(v) => Some(*v as f32),
        OscType::Int(v) => Some(*v as f32),
        OscType::Long(v) => Some(*v as f32),
        OscType::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        _ => None,
    }
}

pub fn arg_as_string(arg: &OscType) -> Option<&str> {
    match arg {
        OscType::String(s) => Some(s.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::{OscBundle, OscTime};

    #[test]
    fn test_query_has_no_arguments() {
        let data = encode_message("/xinfo", OscParams::None).unwrap();
        assert!(data.starts_with(b"/xinfo\0\0"));
        let msgs = decode_packet(&data).unwrap();
        assert_eq!(msgs[0].addr, "/xinfo");
        assert!(msgs[0].args.is_empty());
    }

    #[test]
    fn test_bool_is_sent_as_int() {
        let data = encode_message("/ch/01/mix/on", false.into()).unwrap();
        let msgs = decode_packet(&data).unwrap();
        assert_eq!(msgs[0].args, vec![OscType::Int(0)]);
    }

    #[test]
    fn test_multi_argument_command() {
        let params: OscParams = vec![OscType::Int(1), OscType::Float(0.5)].into();
        let data = encode_message("/config/mute", params).unwrap();
        let msgs = decode_packet(&data).unwrap();
        assert_eq!(msgs[0].addr, "/config/mute");
        assert_eq!(msgs[0].args.len(), 2);
    }

    #[test]
    fn test_bundle_is_flattened() {
        let packet = OscPacket::Bundle(OscBundle {
            timetag: OscTime::from((0, 1)),
            content: vec![
                OscPacket::Message(OscMessage {
                    addr: "/ch/01/mix/fader".to_string(),
                    args: vec![OscType::Float(0.1)],
                }),
                OscPacket::Message(OscMessage {
                    addr: "/ch/02/mix/fader".to_string(),
                    args: vec![OscType::Float(0.2)],
                }),
            ],
        });
        let data = encoder::encode(&packet).unwrap();
        let msgs = decode_packet(&data).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].addr, "/ch/02/mix/fader");
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(decode_packet(b"not osc").is_err());
    }

    #[test]
    fn test_arg_conversion() {
        assert_eq!(arg_as_f32(&OscType::Int(1)), Some(1.0));
        assert_eq!(arg_as_f32(&OscType::Float(0.25)), Some(0.25));
        assert_eq!(arg_as_f32(&OscType::String("x".into())), None);
    }
}
