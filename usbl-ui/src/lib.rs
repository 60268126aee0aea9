pub mod session;
pub mod transport;
pub mod ui;

pub use session::Session;
pub use transport::Transport;
