use crate::communication::framing::{encode_frame, FrameDecoder, WireError};
use crate::communication::messages::{
    CommandMessage, CoordinationSignal, UpdateMessage, WireMessage,
};
use std::marker::PhantomData;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// Sending half of a framed byte channel. Sends never block.
#[derive(Debug)]
pub struct FrameSender<T> {
    tx: UnboundedSender<Vec<u8>>,
    _message: PhantomData<fn(T)>,
}

impl<T> Clone for FrameSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            _message: PhantomData,
        }
    }
}

impl<T: WireMessage> FrameSender<T> {
    pub fn send(&self, message: &T) -> Result<(), WireError> {
        let frame = encode_frame(message)?;
        self.send_raw(frame)
    }

    /// Forwards bytes as-is; the receiver validates them like any other frame.
    pub fn send_raw(&self, bytes: Vec<u8>) -> Result<(), WireError> {
        self.tx.send(bytes).map_err(|_| WireError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of a framed byte channel.
#[derive(Debug)]
pub struct FrameReceiver<T> {
    rx: UnboundedReceiver<Vec<u8>>,
    decoder: FrameDecoder<T>,
}

impl<T: WireMessage> FrameReceiver<T> {
    /// Non-blocking read. `Ok(None)` means no complete frame is available yet;
    /// `Err(Closed)` means every sender is gone and nothing is buffered.
    pub fn try_recv(&mut self) -> Result<Option<T>, WireError> {
        loop {
            if let Some(message) = self.decoder.next_message() {
                return Ok(Some(message));
            }
            match self.rx.try_recv() {
                Ok(chunk) => self.decoder.extend(&chunk),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(WireError::Closed),
            }
        }
    }

    /// Waits for the next valid message. `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            if let Some(message) = self.decoder.next_message() {
                return Some(message);
            }
            let chunk = self.rx.recv().await?;
            self.decoder.extend(&chunk);
        }
    }

    pub fn discarded(&self) -> u64 {
        self.decoder.discarded()
    }
}

pub fn frame_channel<T: WireMessage>() -> (FrameSender<T>, FrameReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        FrameSender {
            tx,
            _message: PhantomData,
        },
        FrameReceiver {
            rx,
            decoder: FrameDecoder::new(),
        },
    )
}

pub type UpdateTx = FrameSender<UpdateMessage>;
pub type UpdateRx = FrameReceiver<UpdateMessage>;
pub type CommandTx = FrameSender<CommandMessage>;
pub type CommandRx = FrameReceiver<CommandMessage>;
pub type CoordinationTx = FrameSender<CoordinationSignal>;
pub type CoordinationRx = FrameReceiver<CoordinationSignal>;

pub fn update_channel() -> (UpdateTx, UpdateRx) {
    frame_channel()
}

pub fn command_channel() -> (CommandTx, CommandRx) {
    frame_channel()
}

pub fn coordination_channel() -> (CoordinationTx, CoordinationRx) {
    frame_channel()
}
