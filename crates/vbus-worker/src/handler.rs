use std::sync::mpsc;

use vbus_frame::Packet;

/// Receives decoded packets on the worker thread.
///
/// `Some(packet)` is borrowed for the duration of the call only. `None` is
/// delivered exactly once, after the worker has stopped reading and released
/// the device: no packets follow it.
///
/// Any state shared with other threads is the handler's to synchronize.
pub trait PacketHandler: Send + 'static {
    fn handle(&mut self, packet: Option<&Packet>);
}

impl<F> PacketHandler for F
where
    F: FnMut(Option<&Packet>) + Send + 'static,
{
    fn handle(&mut self, packet: Option<&Packet>) {
        self(packet)
    }
}

/// Forwards owned packets to another thread.
///
/// The end-of-stream signal is the channel disconnecting: the sender is
/// dropped right after the sentinel call. Packets are dropped silently once
/// the receiver is gone.
impl PacketHandler for mpsc::Sender<Packet> {
    fn handle(&mut self, packet: Option<&Packet>) {
        if let Some(packet) = packet {
            let _ = self.send(packet.clone());
        }
    }
}
