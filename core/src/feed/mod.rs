pub mod connection;
pub mod line;

pub use connection::{ConnectionEvent, ConnectionMachine, ConnectionState};
pub use line::{decode_latin1, parse_line, RawSpot};
