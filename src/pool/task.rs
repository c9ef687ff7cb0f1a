//! Unidad de trabajo que viaja por la cola: una conexión aceptada y el
//! document root donde buscar los archivos.

use crate::files::DocumentRoot;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Conexión aceptada pendiente de atender
///
/// El acceptor la crea y la encola; el worker que la desencola es su único
/// dueño y la descarta al cerrar la conexión.
#[derive(Debug)]
pub struct Task {
    /// Socket del cliente
    pub stream: TcpStream,

    /// Document root compartido (solo lectura)
    pub doc_root: Arc<DocumentRoot>,

    /// Dirección del cliente, si se pudo obtener
    pub peer: Option<SocketAddr>,

    /// Momento del `accept`
    pub accepted_at: Instant,
}

impl Task {
    /// Crea una tarea a partir de un socket recién aceptado
    pub fn new(stream: TcpStream, doc_root: Arc<DocumentRoot>) -> Self {
        let peer = stream.peer_addr().ok();
        Self {
            stream,
            doc_root,
            peer,
            accepted_at: Instant::now(),
        }
    }

    /// Tiempo transcurrido desde que se aceptó la conexión
    pub fn elapsed(&self) -> Duration {
        self.accepted_at.elapsed()
    }

    /// Dirección del cliente como texto, para logs
    pub fn peer_label(&self) -> String {
        self.peer
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
