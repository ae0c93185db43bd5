pub mod channels;
pub mod framing;
pub mod messages;
