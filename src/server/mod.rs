//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones y las encola para el pool de workers
//! 3. Cada worker lee, parsea y resuelve el request contra el document root
//! 4. Envía la respuesta y cierra la conexión

pub mod tcp;

// Re-exportar para facilitar el uso
pub use tcp::{ConnectionHandler, Server, ServerError, ShutdownHandle};
