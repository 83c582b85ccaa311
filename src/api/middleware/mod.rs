mod connections;

pub use connections::ConnectionCounter;
