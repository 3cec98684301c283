pub mod alert;
pub mod board;
pub mod bulletin;
pub mod spot;

pub use alert::{Alert, AlertKind};
pub use board::{BoardSnapshot, Observer, SpotBoard};
pub use bulletin::{Bulletin, BulletinStatus};
pub use spot::Spot;
