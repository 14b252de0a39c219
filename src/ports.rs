pub mod clock;
pub mod messenger;
pub mod registrations;

pub use clock::Clock;
pub use messenger::MessageSender;
pub use registrations::{RegistrationStore, StoreError};
