//! WebSocket engine: upgrade handshake, frame codec, fragment reassembly,
//! control frames, and heartbeat. Layered the same way the HTTP side is —
//! a pure codec/state-machine layer (`frame`, `reassembly`, `close`)
//! underneath the I/O-driving layer (`connection`).

pub mod close;
pub mod connection;
pub mod frame;
pub mod handshake;
pub mod heartbeat;
pub mod reassembly;

pub use close::CloseCode;
pub use connection::{Role, WsEvent, WsHandle, WsReader, WsWriter};
pub use frame::{Opcode, WsFrame, DEFAULT_MAX_FRAME_SIZE, DEFAULT_MAX_MESSAGE_SIZE};
pub use handshake::{
    build_upgrade_request, build_upgrade_response, derive_accept_key, generate_client_key,
    validate_upgrade_request, verify_accept_response,
};
pub use heartbeat::{HeartbeatAction, HeartbeatConfig, HeartbeatMonitor};
pub use reassembly::{MessageKind, Reassembler, WsMessage};
