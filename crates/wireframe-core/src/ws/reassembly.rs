//! Fragment reassembly: concatenate a leading Text/Binary frame with zero
//! or more Continuation frames until `fin=true`, validating UTF-8 only
//! once the whole message is in hand.

use crate::error::{codes, WireError};
use crate::ws::frame::{Opcode, WsFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Binary,
}

#[derive(Debug, Clone)]
pub struct WsMessage {
    pub kind: MessageKind,
    pub payload: Vec<u8>,
}

enum State {
    Idle,
    Assembling { kind: MessageKind, payload: Vec<u8> },
}

/// Folds a stream of data frames (control frames are handled separately by
/// the caller and never passed here) into complete messages.
pub struct Reassembler {
    state: State,
    max_message_size: u64,
}

impl Reassembler {
    pub fn new(max_message_size: u64) -> Self {
        Self {
            state: State::Idle,
            max_message_size,
        }
    }

    /// Feed one non-control data frame. Returns `Some(message)` once a
    /// `fin=true` frame completes the sequence.
    pub fn feed(&mut self, frame: WsFrame) -> Result<Option<WsMessage>, WireError> {
        match (&mut self.state, frame.opcode) {
            (State::Idle, Opcode::Text) | (State::Idle, Opcode::Binary) => {
                let kind = if frame.opcode == Opcode::Text {
                    MessageKind::Text
                } else {
                    MessageKind::Binary
                };
                if frame.fin {
                    return self.finish(kind, frame.payload);
                }
                self.check_size(frame.payload.len() as u64)?;
                self.state = State::Assembling {
                    kind,
                    payload: frame.payload,
                };
                Ok(None)
            }
            (State::Idle, Opcode::Continuation) => Err(protocol_error(
                "continuation frame with no message in progress",
            )),
            (State::Idle, _) => Err(protocol_error("unexpected control opcode in reassembler")),
            (State::Assembling { .. }, Opcode::Continuation) => {
                let State::Assembling { kind, mut payload } =
                    std::mem::replace(&mut self.state, State::Idle)
                else {
                    unreachable!()
                };
                payload.extend_from_slice(&frame.payload);
                self.check_size(payload.len() as u64)?;
                if frame.fin {
                    self.finish(kind, payload)
                } else {
                    self.state = State::Assembling { kind, payload };
                    Ok(None)
                }
            }
            (State::Assembling { .. }, _) => Err(protocol_error(
                "new data frame while a message is still being reassembled",
            )),
        }
    }

    fn check_size(&self, len: u64) -> Result<(), WireError> {
        if len > self.max_message_size {
            return Err(WireError::new(
                codes::WS_MESSAGE_TOO_LARGE,
                "reassembled message exceeded configured max size",
            ));
        }
        Ok(())
    }

    fn finish(&mut self, kind: MessageKind, payload: Vec<u8>) -> Result<Option<WsMessage>, WireError> {
        self.check_size(payload.len() as u64)?;
        if kind == MessageKind::Text && std::str::from_utf8(&payload).is_err() {
            return Err(WireError::new(codes::INVALID_UTF8, "text message is not valid UTF-8"));
        }
        Ok(Some(WsMessage { kind, payload }))
    }
}

fn protocol_error(msg: &'static str) -> WireError {
    WireError::new(codes::WS_PROTOCOL_ERROR, msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(fin: bool, opcode: Opcode, payload: &[u8]) -> WsFrame {
        WsFrame { fin, opcode, payload: payload.to_vec() }
    }

    #[test]
    fn single_frame_message_completes_immediately() {
        let mut r = Reassembler::new(1024);
        let msg = r.feed(frame(true, Opcode::Text, b"hi")).unwrap().unwrap();
        assert_eq!(msg.payload, b"hi");
    }

    #[test]
    fn continuation_frames_concatenate() {
        let mut r = Reassembler::new(1024);
        assert!(r.feed(frame(false, Opcode::Text, b"Hel")).unwrap().is_none());
        assert!(r.feed(frame(false, Opcode::Continuation, b"lo")).unwrap().is_none());
        let msg = r.feed(frame(true, Opcode::Continuation, b"!")).unwrap().unwrap();
        assert_eq!(msg.payload, b"Hello!");
    }

    #[test]
    fn invalid_utf8_text_message_is_rejected() {
        let mut r = Reassembler::new(1024);
        let err = r.feed(frame(true, Opcode::Text, &[0xFF, 0xFE])).unwrap_err();
        assert_eq!(err.code(), codes::INVALID_UTF8);
    }

    #[test]
    fn new_data_frame_mid_assembly_is_protocol_error() {
        let mut r = Reassembler::new(1024);
        r.feed(frame(false, Opcode::Text, b"a")).unwrap();
        let err = r.feed(frame(true, Opcode::Binary, b"b")).unwrap_err();
        assert_eq!(err.code(), codes::WS_PROTOCOL_ERROR);
    }
}
