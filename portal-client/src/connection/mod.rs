mod server_connection;

pub use server_connection::*;
