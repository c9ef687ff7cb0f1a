//! # Lectura del Request desde el socket
//! src/http/reader.rs
//!
//! Lee el request completo (headers + body) antes de parsear:
//!
//! 1. Lee línea por línea hasta la línea vacía (`\r\n`)
//! 2. Busca `Content-Length` en los headers
//! 3. Lee exactamente esa cantidad de bytes de body
//!
//! Todo el request (headers + body) debe caber en `max_size` bytes.

use super::request::{find_content_length, ParseError};
use std::io::{self, BufRead, BufReader, Read};
use thiserror::Error;

/// Tamaño máximo por defecto de un request
pub const MAX_REQUEST_SIZE: usize = 8192;

/// Errores de lectura del request
#[derive(Debug, Error)]
pub enum ReadError {
    /// El cliente cerró sin enviar nada
    #[error("connection closed before any data was received")]
    ConnectionClosed,

    /// El cliente cerró antes de la línea vacía
    #[error("connection closed before the end of headers")]
    Incomplete,

    /// Headers + body superan el máximo
    #[error("request exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// `Content-Length` ilegible
    #[error("invalid Content-Length header")]
    InvalidContentLength(#[source] ParseError),

    /// Llegaron menos bytes de body que los declarados
    #[error("body shorter than Content-Length: expected {expected}, got {received}")]
    ShortBody { expected: usize, received: usize },

    /// Venció el timeout con el request a medio llegar
    #[error("timed out after receiving {received} bytes")]
    Timeout { received: usize },

    /// Error del socket (incluye el timeout de recepción)
    #[error("socket read failed: {0}")]
    Io(#[from] io::Error),
}

impl ReadError {
    /// `true` si el error es culpa del cliente y merece un 400
    ///
    /// Los errores de transporte (`Io`, `ConnectionClosed`) no reciben respuesta.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            ReadError::Incomplete
                | ReadError::TooLarge { .. }
                | ReadError::InvalidContentLength(_)
                | ReadError::ShortBody { .. }
                | ReadError::Timeout { .. }
        )
    }
}

/// Lee un request completo desde `stream`
///
/// # Ejemplo
///
/// ```
/// use static_server::http::reader::read_request;
///
/// let wire: &[u8] = b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 2\r\n\r\nok";
/// let raw = read_request(wire, 8192).unwrap();
/// assert!(raw.ends_with(b"\r\n\r\nok"));
/// ```
pub fn read_request<R: Read>(stream: R, max_size: usize) -> Result<Vec<u8>, ReadError> {
    let mut reader = BufReader::new(stream);
    let mut raw = Vec::with_capacity(max_size.min(MAX_REQUEST_SIZE));

    // 1. Headers, una línea a la vez
    loop {
        let start = raw.len();
        let budget = (max_size - raw.len()) as u64 + 1;
        let read = (&mut reader)
            .take(budget)
            .read_until(b'\n', &mut raw)
            .map_err(|e| partial_read_error(e, raw.len()))?;

        if read == 0 {
            return Err(if raw.is_empty() {
                ReadError::ConnectionClosed
            } else {
                ReadError::Incomplete
            });
        }

        if raw.len() > max_size {
            return Err(ReadError::TooLarge { limit: max_size });
        }

        if &raw[start..] == b"\r\n" {
            break;
        }
    }

    // 2. Content-Length
    let head = String::from_utf8_lossy(&raw);
    let content_length = find_content_length(&head)
        .map_err(ReadError::InvalidContentLength)?
        .unwrap_or(0);

    if content_length == 0 {
        return Ok(raw);
    }

    if content_length > max_size.saturating_sub(raw.len()) {
        return Err(ReadError::TooLarge { limit: max_size });
    }

    // 3. Body exacto
    let mut body = Vec::with_capacity(content_length);
    let received = (&mut reader)
        .take(content_length as u64)
        .read_to_end(&mut body)
        .map_err(|e| partial_read_error(e, raw.len() + body.len()))?;

    if received < content_length {
        return Err(ReadError::ShortBody {
            expected: content_length,
            received,
        });
    }

    raw.extend_from_slice(&body);
    Ok(raw)
}

/// Un timeout con bytes ya recibidos es un request incompleto (400);
/// sin bytes, o cualquier otro error, es de transporte
fn partial_read_error(e: io::Error, received: usize) -> ReadError {
    let timed_out = matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut);
    if timed_out && received > 0 {
        ReadError::Timeout { received }
    } else {
        ReadError::Io(e)
    }
}
