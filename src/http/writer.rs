//! # Escritura de Respuestas
//! src/http/writer.rs
//!
//! Serializa una [`Response`] sobre el socket. Los headers salen siempre
//! en el mismo orden:
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Server: static_server/0.1.0\r\n
//! Connection: close\r\n                        (solo si se pidió)
//! Last-Modified: Sun, 06 Nov 1994 08:49:37 GMT\r\n  (solo en 200)
//! Content-Length: 13\r\n
//! Content-Type: text/html\r\n
//! \r\n
//! ```
//!
//! Headers y body se escriben con `write_all`, que reintenta escrituras
//! parciales y falla con `WriteZero` si el transporte no acepta más bytes.

use super::Response;
use std::io::{self, Write};
use thiserror::Error;

/// Valor del header `Server`
pub const SERVER_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Errores al enviar una respuesta
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write response headers: {0}")]
    Headers(#[source] io::Error),

    #[error("failed to write response body: {0}")]
    Body(#[source] io::Error),
}

/// Arma el bloque de headers, terminado en la línea vacía
pub fn header_block(response: &Response) -> String {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status().as_u16(),
        response.status_text()
    );
    head.push_str(&format!("Server: {}\r\n", SERVER_NAME));

    if response.connection_close() {
        head.push_str("Connection: close\r\n");
    }
    if let Some(date) = response.last_modified() {
        head.push_str(&format!("Last-Modified: {}\r\n", date));
    }

    head.push_str(&format!("Content-Length: {}\r\n", response.content_length()));
    head.push_str(&format!("Content-Type: {}\r\n", response.content_type()));
    head.push_str("\r\n");
    head
}

/// Envía la respuesta completa y libera su body
///
/// Con `send_body == false` (requests HEAD) solo se envían los headers.
/// El caller cierra la conexión haya o no error.
///
/// # Ejemplo
/// ```
/// use static_server::http::{Response, StatusCode};
/// use static_server::http::writer::write_response;
///
/// let mut out = Vec::new();
/// write_response(&mut out, Response::error(StatusCode::NotFound), true).unwrap();
/// assert!(out.starts_with(b"HTTP/1.1 404 Not Found\r\n"));
/// ```
pub fn write_response<W: Write>(
    out: &mut W,
    response: Response,
    send_body: bool,
) -> Result<(), WriteError> {
    let head = header_block(&response);
    out.write_all(head.as_bytes()).map_err(WriteError::Headers)?;

    if send_body && response.content_length() > 0 {
        out.write_all(response.body()).map_err(WriteError::Body)?;
    }

    out.flush().map_err(WriteError::Body)
}
