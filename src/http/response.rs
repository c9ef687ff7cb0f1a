//! # Respuestas HTTP
//!
//! Una [`Response`] es lo que produce el resolver de archivos y consume el
//! [`writer`](super::writer). El body es propiedad de la respuesta: el
//! writer la recibe por valor y el buffer se libera una sola vez, al
//! terminar de escribirla.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use static_server::http::{Response, StatusCode};
//!
//! let response = Response::file(b"<h1>hola</h1>".to_vec(), "text/html", None);
//! assert_eq!(response.status(), StatusCode::Ok);
//! assert_eq!(response.content_length(), 13);
//! ```

use super::StatusCode;

/// Content-Type de las páginas de error
const ERROR_CONTENT_TYPE: &str = "text/html";

/// Representa una respuesta HTTP completa
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Código de estado (200, 404, etc.)
    status: StatusCode,

    /// Valor del header Content-Type
    content_type: &'static str,

    /// Se envía `Connection: close`
    connection_close: bool,

    /// Fecha RFC 1123, solo para 200
    last_modified: Option<String>,

    /// Cuerpo de la respuesta
    body: Vec<u8>,
}

impl Response {
    /// Respuesta 200 con el contenido de un archivo
    pub fn file(body: Vec<u8>, content_type: &'static str, last_modified: Option<String>) -> Self {
        Self {
            status: StatusCode::Ok,
            content_type,
            connection_close: false,
            last_modified,
            body,
        }
    }

    /// Respuesta de error con una página HTML mínima
    ///
    /// # Ejemplo
    /// ```
    /// use static_server::http::{Response, StatusCode};
    ///
    /// let response = Response::error(StatusCode::NotFound);
    /// assert!(response.last_modified().is_none());
    /// assert!(String::from_utf8_lossy(response.body()).contains("404 Not Found"));
    /// ```
    pub fn error(status: StatusCode) -> Self {
        let body = format!(
            "<html><head><title>{status}</title></head><body><h1>{status}</h1></body></html>\n"
        );
        Self {
            status,
            content_type: ERROR_CONTENT_TYPE,
            connection_close: false,
            last_modified: None,
            body: body.into_bytes(),
        }
    }

    /// Marca (o no) la respuesta con `Connection: close`
    pub fn with_connection_close(mut self, close: bool) -> Self {
        self.connection_close = close;
        self
    }

    /// Obtiene el código de estado
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Texto de razón del status ("OK", "Not Found", ...)
    pub fn status_text(&self) -> &'static str {
        self.status.reason_phrase()
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Tamaño del body en bytes
    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    pub fn connection_close(&self) -> bool {
        self.connection_close
    }

    /// Fecha de última modificación (solo presente en 200)
    pub fn last_modified(&self) -> Option<&str> {
        if self.status.is_success() {
            self.last_modified.as_deref()
        } else {
            None
        }
    }

    /// Obtiene una referencia al body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consume la respuesta y entrega el body
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}
