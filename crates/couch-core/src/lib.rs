pub mod errors;
pub mod ids;
pub mod persona;
pub mod phase;
pub mod roles;
pub mod turns;

pub use errors::GatewayError;
pub use persona::Persona;
pub use phase::Phase;
pub use roles::{DisplayRole, SpeakerTag, StoredRole};
pub use turns::Turn;
