//! OSC override control.
//!
//! Operators drive the crop from a control surface over UDP. Each datagram
//! is one OSC packet: a message, or a bundle of messages and nested
//! bundles. Recognized addresses become [`OverrideCommand`]s and are sent to
//! the pipeline task, which applies them between frames.

use std::net::SocketAddr;

use reframe_media::core::metrics;
use reframe_models::OverrideCommand;
use rosc::{OscMessage, OscPacket, OscType};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::{WorkerError, WorkerResult};

const MAX_DATAGRAM: usize = 8192;

/// Decode one datagram into the messages it carries, in order.
///
/// Nested bundles are flattened. Bundle timetags are ignored; every message
/// applies on arrival.
pub fn decode_datagram(data: &[u8]) -> WorkerResult<Vec<OscMessage>> {
    let (_, packet) =
        rosc::decoder::decode_udp(data).map_err(|e| WorkerError::osc(format!("{:?}", e)))?;
    let mut out = Vec::new();
    flatten(packet, &mut out);
    Ok(out)
}

fn flatten(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(message) => out.push(message),
        OscPacket::Bundle(bundle) => {
            for element in bundle.content {
                flatten(element, out);
            }
        }
    }
}

/// Numeric view of an argument. Strings are parsed, booleans map to 0/1.
pub fn arg_value(arg: &OscType) -> Option<f64> {
    match arg {
        OscType::Int(v) => Some(*v as f64),
        OscType::Float(v) => Some(*v as f64),
        OscType::Long(v) => Some(*v as f64),
        OscType::Double(v) => Some(*v),
        OscType::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        OscType::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Map a message to an override command. Uses the first argument.
pub fn command_from_message(message: &OscMessage) -> Option<OverrideCommand> {
    let value = message.args.first().and_then(arg_value);
    OverrideCommand::from_address(&message.addr, value)
}

/// UDP listener for override commands.
pub struct OscListener {
    socket: UdpSocket,
}

impl OscListener {
    pub async fn bind(addr: SocketAddr) -> WorkerResult<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!(addr = %socket.local_addr()?, "OSC control listening");
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> WorkerResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive until shutdown, or until the pipeline stops taking commands.
    ///
    /// Malformed packets are logged and skipped.
    pub async fn run(
        self,
        commands: mpsc::Sender<OverrideCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) -> WorkerResult<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("OSC listener stopping");
                        return Ok(());
                    }
                }
                received = self.socket.recv_from(&mut buf) => {
                    let (len, peer) = received?;
                    let messages = match decode_datagram(&buf[..len]) {
                        Ok(messages) => messages,
                        Err(e) => {
                            warn!(%peer, error = %e, "Ignoring OSC packet");
                            continue;
                        }
                    };
                    for message in messages {
                        let Some(command) = command_from_message(&message) else {
                            debug!(%peer, address = %message.addr, "Unrecognized OSC message");
                            continue;
                        };
                        metrics::record_override_command(command.parameter());
                        debug!(%peer, ?command, "Override command");
                        if commands.send(command).await.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::{OscBundle, OscTime};

    fn message(addr: &str, args: Vec<OscType>) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        })
    }

    fn encode(packet: &OscPacket) -> Vec<u8> {
        rosc::encoder::encode(packet).unwrap()
    }

    #[test]
    fn test_decode_float_message() {
        let data = encode(&message("/oscControl/slider1", vec![OscType::Float(0.25)]));
        let messages = decode_datagram(&data).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].addr, "/oscControl/slider1");
        assert_eq!(
            command_from_message(&messages[0]),
            Some(OverrideCommand::NormalizedX(0.25))
        );
    }

    #[test]
    fn test_argument_values() {
        assert_eq!(arg_value(&OscType::String(" 640 ".into())), Some(640.0));
        assert_eq!(arg_value(&OscType::Int(-3)), Some(-3.0));
        assert_eq!(arg_value(&OscType::Long(7)), Some(7.0));
        assert_eq!(arg_value(&OscType::Double(1.5)), Some(1.5));
        assert_eq!(arg_value(&OscType::Bool(true)), Some(1.0));
        assert_eq!(arg_value(&OscType::Nil), None);
        assert_eq!(arg_value(&OscType::String("left".into())), None);

        let data = encode(&message(
            "/reframe/x",
            vec![OscType::String("640".into()), OscType::Int(-3)],
        ));
        let messages = decode_datagram(&data).unwrap();
        assert_eq!(command_from_message(&messages[0]), Some(OverrideCommand::X(640.0)));
    }

    #[test]
    fn test_nested_bundles_are_flattened_in_order() {
        let inner = OscPacket::Bundle(OscBundle {
            timetag: OscTime {
                seconds: 0,
                fractional: 1,
            },
            content: vec![message("/reframe/clear", vec![])],
        });
        let outer = OscPacket::Bundle(OscBundle {
            timetag: OscTime {
                seconds: 0,
                fractional: 1,
            },
            content: vec![message("/reframe/width", vec![OscType::Float(800.0)]), inner],
        });

        let commands: Vec<_> = decode_datagram(&encode(&outer))
            .unwrap()
            .iter()
            .filter_map(command_from_message)
            .collect();
        assert_eq!(commands, vec![OverrideCommand::Width(800.0), OverrideCommand::Clear]);
    }

    #[test]
    fn test_malformed_datagrams() {
        assert!(decode_datagram(b"garbage").is_err());

        // Float argument cut short.
        let mut truncated = encode(&message("/reframe/x", vec![OscType::Float(1.0)]));
        truncated.truncate(truncated.len() - 2);
        assert!(decode_datagram(&truncated).is_err());

        // Bundle cut off inside its timetag.
        let mut bad_bundle = b"#bundle\0".to_vec();
        bad_bundle.extend_from_slice(&[0, 0, 0]);
        assert!(decode_datagram(&bad_bundle).is_err());
    }

    #[test]
    fn test_unknown_address_and_missing_value() {
        let data = encode(&message("/mixer/fader", vec![OscType::Float(0.5)]));
        let unknown = decode_datagram(&data).unwrap();
        assert_eq!(command_from_message(&unknown[0]), None);

        let data = encode(&message("/reframe/x", vec![]));
        let messages = decode_datagram(&data).unwrap();
        assert_eq!(command_from_message(&messages[0]), None);
    }

    #[tokio::test]
    async fn test_listener_forwards_commands() {
        let listener = OscListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(listener.run(tx, shutdown_rx));

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"garbage", addr).await.unwrap();
        let data = encode(&message("/oscControl/slider2", vec![OscType::Float(0.5)]));
        sender.send_to(&data, addr).await.unwrap();

        let command = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(command, Some(OverrideCommand::NormalizedWidth(0.5)));

        shutdown_tx.send(true).unwrap();
        task.await.unwrap().unwrap();
    }
}
