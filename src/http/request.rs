//! # Parsing de Requests HTTP/1.1
//! src/http/request.rs
//!
//! Convierte el bloque crudo (headers + body) que entrega el
//! [`reader`](super::reader) en un [`Request`] estructurado.
//!
//! ## Formato de un Request
//!
//! ```text
//! GET /index.html HTTP/1.1\r\n
//! Host: www.example.com\r\n
//! Content-Length: 11\r\n
//! \r\n
//! hello world
//! ```
//!
//! ## Límites de los campos
//!
//! Cada campo tiene un tamaño máximo. `method`, `version` y `Host` se
//! truncan al límite; una URI más larga que [`MAX_URI_LEN`] es un error,
//! porque truncarla serviría otro recurso. El body se recorta a
//! [`BODY_CAPACITY`] y se marca con [`Request::body_truncated`].

use thiserror::Error;
use tracing::warn;

/// Tamaño máximo del método (bytes)
pub const MAX_METHOD_LEN: usize = 16;

/// Tamaño máximo de la URI (bytes)
pub const MAX_URI_LEN: usize = 2048;

/// Tamaño máximo de la versión (bytes)
pub const MAX_VERSION_LEN: usize = 16;

/// Tamaño máximo del valor de `Host` (bytes)
pub const MAX_HOST_LEN: usize = 256;

/// Capacidad del buffer de body (4 KB)
pub const BODY_CAPACITY: usize = 4096;

/// Representa un request HTTP parseado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Método HTTP tal como llegó (ej: "GET")
    method: String,

    /// URI solicitada (ej: "/index.html")
    uri: String,

    /// Versión HTTP (ej: "HTTP/1.1")
    version: String,

    /// Valor del header `Host` (obligatorio)
    host: String,

    /// `Connection: close` presente
    connection_close: bool,

    /// Valor declarado en `Content-Length` (0 si no vino)
    content_length: usize,

    /// Body recortado a `BODY_CAPACITY`
    body: Vec<u8>,

    /// El `Content-Length` declarado superaba `BODY_CAPACITY`
    body_truncated: bool,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Request vacío
    #[error("Empty request")]
    EmptyRequest,

    /// Los headers no son UTF-8 válido
    #[error("Request headers are not valid UTF-8")]
    InvalidEncoding,

    /// Request line sin CRLF o con menos de tres tokens
    #[error("Invalid request line format")]
    InvalidRequestLine,

    /// URI más larga que el límite
    #[error("URI exceeds {max} bytes")]
    UriTooLong { max: usize },

    /// Header sin ':'
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// `Content-Length` que no es un entero no negativo
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// Falta el header `Host`
    #[error("Missing Host header")]
    MissingHost,
}

impl Request {
    /// Parsea un request desde el bloque crudo headers + body
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use static_server::http::Request;
    ///
    /// let raw = b"GET /index.html HTTP/1.1\r\nHost: www.example.com\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.uri(), "/index.html");
    /// assert_eq!(request.host(), "www.example.com");
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        if buffer.iter().all(u8::is_ascii_whitespace) {
            return Err(ParseError::EmptyRequest);
        }

        let (head, body) = split_head(buffer);
        let head = std::str::from_utf8(head).map_err(|_| ParseError::InvalidEncoding)?;

        // 1. Request line: debe terminar en CRLF
        let (request_line, header_block) = head
            .split_once("\r\n")
            .ok_or(ParseError::InvalidRequestLine)?;
        let (method, uri, version) = Self::parse_request_line(request_line)?;

        // 2. Headers reconocidos
        let mut host = None;
        let mut content_length = None;
        let mut connection_close = false;

        for line in header_block.split("\r\n") {
            if line.is_empty() {
                break;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;
            let name = name.trim();
            let value = value.trim_start_matches(|c: char| c == ' ' || c == '\t');

            if name.eq_ignore_ascii_case("Host") {
                host = Some(bounded("host", value, MAX_HOST_LEN));
            } else if name.eq_ignore_ascii_case("Content-Length") {
                content_length = merge_content_length(content_length, value)?;
            } else if name.eq_ignore_ascii_case("Connection") {
                connection_close = value
                    .split(',')
                    .any(|token| token.trim().eq_ignore_ascii_case("close"));
            }
        }

        let host = host.ok_or(ParseError::MissingHost)?;
        let content_length = content_length.unwrap_or(0);

        // 3. Body recortado a la capacidad del buffer
        let body_truncated = content_length > BODY_CAPACITY;
        if body_truncated {
            warn!(
                declared = content_length,
                capacity = BODY_CAPACITY,
                "request body exceeds buffer capacity, truncating"
            );
        }
        let take = content_length.min(BODY_CAPACITY).min(body.len());

        Ok(Request {
            method,
            uri,
            version,
            host,
            connection_close,
            content_length,
            body: body[..take].to_vec(),
            body_truncated,
        })
    }

    /// Parsea la request line
    ///
    /// Formato: `GET /path HTTP/1.1`. Tokens extra se ignoran.
    fn parse_request_line(line: &str) -> Result<(String, String, String), ParseError> {
        let mut parts = line.split(' ').filter(|part| !part.is_empty());

        let (Some(method), Some(uri), Some(version)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseError::InvalidRequestLine);
        };

        if uri.len() > MAX_URI_LEN {
            return Err(ParseError::UriTooLong { max: MAX_URI_LEN });
        }

        Ok((
            bounded("method", method, MAX_METHOD_LEN),
            uri.to_string(),
            bounded("version", version, MAX_VERSION_LEN),
        ))
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Indica si es un HEAD (headers sin body en la respuesta)
    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }

    /// Obtiene la URI
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Obtiene la versión HTTP
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Obtiene el valor del header `Host`
    pub fn host(&self) -> &str {
        &self.host
    }

    /// `true` si el cliente pidió `Connection: close`
    pub fn connection_close(&self) -> bool {
        self.connection_close
    }

    /// `Content-Length` declarado por el cliente
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    /// Obtiene el body (a lo sumo `BODY_CAPACITY` bytes)
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// `true` si el body declarado no cabía en el buffer
    pub fn body_truncated(&self) -> bool {
        self.body_truncated
    }
}

/// Busca `Content-Length` en un bloque de headers
///
/// Lo usa el reader para saber cuántos bytes de body leer antes de parsear.
/// Aplica la misma regla que [`Request::parse`] para headers repetidos.
pub(crate) fn find_content_length(head: &str) -> Result<Option<usize>, ParseError> {
    let mut found = None;
    for line in head.split("\r\n").skip(1) {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("Content-Length") {
                found = merge_content_length(found, value)?;
            }
        }
    }
    Ok(found)
}

/// `Content-Length` repetido solo se acepta si todos los valores coinciden
fn merge_content_length(current: Option<usize>, value: &str) -> Result<Option<usize>, ParseError> {
    let parsed = parse_content_length(value)?;
    match current {
        Some(previous) if previous != parsed => Err(ParseError::InvalidContentLength(format!(
            "conflicting values {} and {}",
            previous, parsed
        ))),
        _ => Ok(Some(parsed)),
    }
}

fn parse_content_length(value: &str) -> Result<usize, ParseError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ParseError::InvalidContentLength(value.trim().to_string()))
}

/// Separa el bloque en headers (incluyendo el último CRLF) y body
fn split_head(buffer: &[u8]) -> (&[u8], &[u8]) {
    match buffer.windows(4).position(|window| window == b"\r\n\r\n") {
        Some(pos) => (&buffer[..pos + 2], &buffer[pos + 4..]),
        None => (buffer, &[]),
    }
}

/// Copia acotada: trunca en un límite de carácter UTF-8
fn bounded(field: &'static str, value: &str, max: usize) -> String {
    if value.len() <= max {
        return value.to_string();
    }

    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    warn!(field, max, "request field truncated");
    value[..end].to_string()
}
